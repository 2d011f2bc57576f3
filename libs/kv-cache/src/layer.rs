//! Per-layer token storage spanning however many pages it takes (spec
//! §4.4's `KVCacheLayerStorage`).

use tracing::{debug, warn};

use crate::manager::PageManager;
use crate::tensor::KvTensor;

pub struct LayerStorage {
    pub global_layer_idx: u32,
    active_page_ids: Vec<u64>,
    total_tokens_stored: usize,
}

impl LayerStorage {
    pub fn new(global_layer_idx: u32) -> Self {
        Self {
            global_layer_idx,
            active_page_ids: Vec::new(),
            total_tokens_stored: 0,
        }
    }

    pub fn total_tokens_stored(&self) -> usize {
        self.total_tokens_stored
    }

    pub fn active_page_count(&self) -> usize {
        self.active_page_ids.len()
    }

    pub fn reset<T: Copy + Default>(&mut self, page_manager: &mut PageManager<T>) {
        let freed = self.active_page_ids.len();
        for page_id in self.active_page_ids.drain(..) {
            page_manager.free_page(page_id);
        }
        self.total_tokens_stored = 0;
        debug!(layer = self.global_layer_idx, freed, "layer storage reset");
    }

    /// Appends tokens to the last active page if it has room, then
    /// allocates new pages until every token is written or the pool is
    /// exhausted.
    pub fn store_kv_tokens<T: Copy + Default>(
        &mut self,
        page_manager: &mut PageManager<T>,
        key: &KvTensor<T>,
        value: &KvTensor<T>,
    ) {
        let requested = key.tokens();
        if requested == 0 {
            return;
        }

        let mut remaining = requested;
        let mut offset = 0;

        if let Some(&last_id) = self.active_page_ids.last() {
            if let Some(page) = page_manager.page_mut(last_id) {
                if !page.is_full() {
                    let key_segment = key.slice_tokens_from(offset, remaining.min(page.remaining_capacity()));
                    let value_segment = value.slice_tokens_from(offset, remaining.min(page.remaining_capacity()));
                    let appended = page.append(&key_segment, &value_segment);
                    offset += appended;
                    remaining -= appended;
                }
            }
        }

        while remaining > 0 {
            let Some(page_id) = page_manager.allocate_page() else {
                warn!(layer = self.global_layer_idx, remaining, "page pool exhausted mid-store");
                break;
            };
            self.active_page_ids.push(page_id);
            let page = page_manager.page_mut(page_id).expect("just allocated");
            let to_write = remaining.min(page.capacity_tokens);
            let key_segment = key.slice_tokens_from(offset, to_write);
            let value_segment = value.slice_tokens_from(offset, to_write);
            let appended = page.append(&key_segment, &value_segment);
            offset += appended;
            remaining -= appended;
        }

        self.total_tokens_stored += requested - remaining;
    }

    /// Gathers up to `length` tokens (or all stored tokens, if `None`)
    /// across this layer's active pages, in page order.
    pub fn retrieve_kv_tensors<T: Copy + Default>(
        &self,
        page_manager: &PageManager<T>,
        length: Option<usize>,
    ) -> (KvTensor<T>, KvTensor<T>) {
        let effective_length = match length {
            None => self.total_tokens_stored,
            Some(0) => 0,
            Some(n) => n.min(self.total_tokens_stored),
        };

        if effective_length == 0 {
            return (
                KvTensor::empty(page_manager.batch_size(), page_manager.num_heads(), page_manager.head_dim()),
                KvTensor::empty(page_manager.batch_size(), page_manager.num_heads(), page_manager.head_dim()),
            );
        }

        let mut key_parts = Vec::new();
        let mut value_parts = Vec::new();
        let mut gathered = 0;

        for &page_id in &self.active_page_ids {
            if gathered >= effective_length {
                break;
            }
            let Some(page) = page_manager.page(page_id) else {
                continue;
            };
            if page.tokens_filled == 0 {
                continue;
            }
            let take = page.tokens_filled.min(effective_length - gathered);
            if take == 0 {
                continue;
            }
            key_parts.push(page.key_data.slice_tokens(take));
            value_parts.push(page.value_data.slice_tokens(take));
            gathered += take;
        }

        (KvTensor::concat_tokens(&key_parts), KvTensor::concat_tokens(&value_parts))
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
    fn store_then_retrieve_round_trips_across_page_boundaries() {
        let mut pool = PageManager::<f32>::new(1, 2, 1, 1, 1);
        let mut layer = LayerStorage::new(0);

        layer.store_kv_tokens(&mut pool, &tokens(3, 1.0), &tokens(3, 1.0));
        assert_eq!(layer.total_tokens_stored(), 3);
        assert_eq!(layer.active_page_count(), 2);

        let (key, _value) = layer.retrieve_kv_tensors(&pool, None);
        assert_eq!(key.tokens(), 3);
    }

    #[test]
    fn reset_returns_pages_to_the_pool() {
        let mut pool = PageManager::<f32>::new(1, 2, 1, 1, 1);
        let mut layer = LayerStorage::new(0);
        layer.store_kv_tokens(&mut pool, &tokens(4, 1.0), &tokens(4, 1.0));
        layer.reset(&mut pool);
        assert_eq!(layer.total_tokens_stored(), 0);
        assert_eq!(layer.active_page_count(), 0);
        assert_eq!(pool.free_page_count(), pool.allocated_page_count() + pool.free_page_count());
    }

    #[test]
    fn retrieve_partial_length_truncates_the_result() {
        let mut pool = PageManager::<f32>::new(1, 4, 1, 1, 1);
        let mut layer = LayerStorage::new(0);
        layer.store_kv_tokens(&mut pool, &tokens(4, 1.0), &tokens(4, 1.0));
        let (key, _value) = layer.retrieve_kv_tensors(&pool, Some(2));
        assert_eq!(key.tokens(), 2);
    }
}
