//! A single inference session's view across the layers assigned to this
//! node (spec §4.4's `SessionPagedKVCache`).

use std::collections::HashMap;

use serde::Serialize;
use tracing::{error, warn};

use crate::error::KvCacheError;
use crate::layer::LayerStorage;
use crate::manager::PageManager;
use crate::tensor::KvTensor;

pub struct SessionKvCache {
    pub session_id: String,
    assigned_layer_indices: Vec<u32>,
    layer_caches: HashMap<u32, LayerStorage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionKvMetadata {
    pub session_id: String,
    pub total_tokens_on_node: usize,
    pub total_active_pages_on_node: usize,
}

impl SessionKvCache {
    pub fn new(session_id: impl Into<String>, assigned_layer_indices: Vec<u32>) -> Self {
        let layer_caches = assigned_layer_indices
            .iter()
            .map(|&idx| (idx, LayerStorage::new(idx)))
            .collect();
        Self {
            session_id: session_id.into(),
            assigned_layer_indices,
            layer_caches,
        }
    }

    pub fn store_kv_for_layer<T: Copy + Default>(
        &mut self,
        page_manager: &mut PageManager<T>,
        global_layer_idx: u32,
        key: &KvTensor<T>,
        value: &KvTensor<T>,
    ) -> Result<(), KvCacheError> {
        let Some(layer) = self.layer_caches.get_mut(&global_layer_idx) else {
            error!(session = %self.session_id, global_layer_idx, "store attempted for unmanaged layer");
            return Err(KvCacheError::UnmanagedLayer(global_layer_idx));
        };
        layer.store_kv_tokens(page_manager, key, value);
        Ok(())
    }

    /// Unlike `store_kv_for_layer`, an unmanaged layer here is not an
    /// error: the caller gets empty tensors back, matching how the
    /// original retrieval path degrades (spec §4.4).
    pub fn retrieve_kv_for_layer<T: Copy + Default>(
        &self,
        page_manager: &PageManager<T>,
        global_layer_idx: u32,
        length: Option<usize>,
    ) -> (KvTensor<T>, KvTensor<T>) {
        match self.layer_caches.get(&global_layer_idx) {
            Some(layer) => layer.retrieve_kv_tensors(page_manager, length),
            None => {
                warn!(session = %self.session_id, global_layer_idx, "retrieve attempted for unmanaged layer");
                (
                    KvTensor::empty(page_manager.batch_size(), page_manager.num_heads(), page_manager.head_dim()),
                    KvTensor::empty(page_manager.batch_size(), page_manager.num_heads(), page_manager.head_dim()),
                )
            }
        }
    }

    pub fn metadata(&self) -> SessionKvMetadata {
        let mut total_tokens = 0;
        let mut total_pages = 0;
        for idx in &self.assigned_layer_indices {
            if let Some(layer) = self.layer_caches.get(idx) {
                total_tokens += layer.total_tokens_stored();
                total_pages += layer.active_page_count();
            }
        }
        SessionKvMetadata {
            session_id: self.session_id.clone(),
            total_tokens_on_node: total_tokens,
            total_active_pages_on_node: total_pages,
        }
    }

    pub fn reset_for_new_prompt<T: Copy + Default>(&mut self, page_manager: &mut PageManager<T>) {
        for layer in self.layer_caches.values_mut() {
            layer.reset(page_manager);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(count: usize, value: f32) -> KvTensor<f32> {
        let mut t = KvTensor::zeros([1, 1, count, 1]);
        for slot in t.as_mut_slice() {
            *slot = value;
        }
        t
    }

    #[test]
    fn store_for_unmanaged_layer_is_an_error() {
        let mut pool = PageManager::<f32>::new(1, 4, 1, 1, 1);
        let mut session = SessionKvCache::new("s1", vec![0, 1]);
        let result = session.store_kv_for_layer(&mut pool, 5, &tokens(1, 1.0), &tokens(1, 1.0));
        assert!(matches!(result, Err(KvCacheError::UnmanagedLayer(5))));
    }

    #[test]
    fn retrieve_for_unmanaged_layer_degrades_to_empty_tensors() {
        let pool = PageManager::<f32>::new(1, 4, 1, 1, 1);
        let session = SessionKvCache::new("s1", vec![0]);
        let (key, _value) = session.retrieve_kv_for_layer(&pool, 9, None);
        assert_eq!(key.tokens(), 0);
    }

    #[test]
    fn metadata_reflects_stored_tokens_across_assigned_layers() {
        let mut pool = PageManager::<f32>::new(2, 4, 1, 1, 1);
        let mut session = SessionKvCache::new("s1", vec![0, 1]);
        session.store_kv_for_layer(&mut pool, 0, &tokens(3, 1.0), &tokens(3, 1.0)).unwrap();
        session.store_kv_for_layer(&mut pool, 1, &tokens(2, 1.0), &tokens(2, 1.0)).unwrap();
        let metadata = session.metadata();
        assert_eq!(metadata.total_tokens_on_node, 5);
    }

    #[test]
    fn reset_for_new_prompt_frees_every_managed_layer() {
        let mut pool = PageManager::<f32>::new(2, 4, 1, 1, 1);
        let mut session = SessionKvCache::new("s1", vec![0]);
        session.store_kv_for_layer(&mut pool, 0, &tokens(3, 1.0), &tokens(3, 1.0)).unwrap();
        session.reset_for_new_prompt(&mut pool);
        assert_eq!(session.metadata().total_tokens_on_node, 0);
        assert_eq!(pool.allocated_page_count(), 0);
    }
}
