use crate::tensor::KvTensor;

/// A fixed-capacity block of token slots for one layer (spec §4.4's
/// `KVCachePage`).
#[derive(Debug)]
pub struct KvCachePage<T> {
    pub page_id: u64,
    pub capacity_tokens: usize,
    pub num_heads: usize,
    pub head_dim: usize,
    pub batch_size: usize,
    pub tokens_filled: usize,
    pub key_data: KvTensor<T>,
    pub value_data: KvTensor<T>,
}

impl<T: Copy + Default> KvCachePage<T> {
    pub fn new(page_id: u64, capacity_tokens: usize, num_heads: usize, head_dim: usize, batch_size: usize) -> Self {
        Self {
            page_id,
            capacity_tokens,
            num_heads,
            head_dim,
            batch_size,
            tokens_filled: 0,
            key_data: KvTensor::zeros([batch_size, num_heads, capacity_tokens, head_dim]),
            value_data: KvTensor::zeros([batch_size, num_heads, capacity_tokens, head_dim]),
        }
    }

    pub fn is_full(&self) -> bool {
        self.tokens_filled >= self.capacity_tokens
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity_tokens - self.tokens_filled
    }

    pub fn reset(&mut self) {
        self.tokens_filled = 0;
        self.key_data = KvTensor::zeros([self.batch_size, self.num_heads, self.capacity_tokens, self.head_dim]);
        self.value_data = KvTensor::zeros([self.batch_size, self.num_heads, self.capacity_tokens, self.head_dim]);
    }

    /// Appends as many tokens from `key_segment`/`value_segment` as this
    /// page has room for, returning the count actually appended.
    pub fn append(&mut self, key_segment: &KvTensor<T>, value_segment: &KvTensor<T>) -> usize {
        if self.is_full() {
            return 0;
        }
        let requested = key_segment.tokens();
        let can_fit = requested.min(self.remaining_capacity());
        if can_fit == 0 {
            return 0;
        }

        self.key_data.copy_token_range_from(self.tokens_filled, key_segment, 0, can_fit);
        self.value_data.copy_token_range_from(self.tokens_filled, value_segment, 0, can_fit);
        self.tokens_filled += can_fit;
        can_fit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_token(value: f32) -> KvTensor<f32> {
        let mut t = KvTensor::zeros([1, 1, 1, 1]);
        t.as_mut_slice()[0] = value;
        t
    }

    #[test]
    fn append_stops_at_capacity() {
        let mut page = KvCachePage::<f32>::new(0, 2, 1, 1, 1);
        assert_eq!(page.append(&single_token(1.0), &single_token(1.0)), 1);
        assert_eq!(page.append(&single_token(2.0), &single_token(2.0)), 1);
        assert!(page.is_full());
        assert_eq!(page.append(&single_token(3.0), &single_token(3.0)), 0);
    }

    #[test]
    fn reset_clears_fill_and_data() {
        let mut page = KvCachePage::<f32>::new(0, 2, 1, 1, 1);
        page.append(&single_token(5.0), &single_token(5.0));
        page.reset();
        assert_eq!(page.tokens_filled, 0);
        assert!(page.key_data.as_slice().iter().all(|&v| v == 0.0));
    }
}
