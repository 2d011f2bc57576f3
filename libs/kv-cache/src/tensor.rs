//! A minimal dense tensor: row-major storage plus a shape, with no
//! dependency on any ML runtime (spec §1, §8; spec's KV tensors are a
//! storage concern here, not a compute one).

#[derive(Debug, Clone, PartialEq)]
pub struct KvTensor<T> {
    pub shape: [usize; 4],
    data: Vec<T>,
}

impl<T: Copy + Default> KvTensor<T> {
    pub fn zeros(shape: [usize; 4]) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![T::default(); len],
        }
    }

    pub fn empty(batch: usize, heads: usize, head_dim: usize) -> Self {
        Self::zeros([batch, heads, 0, head_dim])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Token-dimension length (axis 2, the sequence axis).
    pub fn tokens(&self) -> usize {
        self.shape[2]
    }

    /// Fills `self[:, :, dst_offset..dst_offset+count, :]` from
    /// `source[:, :, src_offset..src_offset+count, :]`, both laid out in
    /// row-major `[batch, heads, tokens, head_dim]` order.
    pub fn copy_token_range_from(
        &mut self,
        dst_offset: usize,
        source: &KvTensor<T>,
        src_offset: usize,
        count: usize,
    ) {
        let [batch, heads, _dst_tokens, head_dim] = self.shape;
        let [_, _, src_tokens, _] = source.shape;
        debug_assert!(src_offset + count <= src_tokens);
        debug_assert!(dst_offset + count <= self.shape[2]);

        for b in 0..batch {
            for h in 0..heads {
                for t in 0..count {
                    for d in 0..head_dim {
                        let src_idx = source.index(b, h, src_offset + t, d);
                        let dst_idx = self.index(b, h, dst_offset + t, d);
                        self.data[dst_idx] = source.data[src_idx];
                    }
                }
            }
        }
    }

    /// Builds a new tensor containing only the first `count` tokens of
    /// `self` along the token axis.
    pub fn slice_tokens(&self, count: usize) -> KvTensor<T> {
        self.slice_tokens_from(0, count)
    }

    /// Builds a new tensor containing `count` tokens of `self` starting at
    /// `offset` along the token axis.
    pub fn slice_tokens_from(&self, offset: usize, count: usize) -> KvTensor<T> {
        let [batch, heads, tokens, head_dim] = self.shape;
        let count = count.min(tokens.saturating_sub(offset));
        let mut out = KvTensor::zeros([batch, heads, count, head_dim]);
        out.copy_token_range_from(0, self, offset, count);
        out
    }

    /// Concatenates several tensors along the token axis. Panics if any
    /// tensor's batch/heads/head_dim do not all agree; callers within this
    /// crate only ever concatenate pages from the same layer, which always
    /// share those dimensions.
    pub fn concat_tokens(parts: &[KvTensor<T>]) -> KvTensor<T> {
        let Some(first) = parts.first() else {
            return KvTensor::zeros([0, 0, 0, 0]);
        };
        let [batch, heads, _, head_dim] = first.shape;
        let total_tokens: usize = parts.iter().map(|p| p.shape[2]).sum();
        let mut out = KvTensor::zeros([batch, heads, total_tokens, head_dim]);
        let mut offset = 0;
        for part in parts {
            assert_eq!(part.shape[0], batch);
            assert_eq!(part.shape[1], heads);
            assert_eq!(part.shape[3], head_dim);
            let count = part.shape[2];
            out.copy_token_range_from(offset, part, 0, count);
            offset += count;
        }
        out
    }

    fn index(&self, b: usize, h: usize, t: usize, d: usize) -> usize {
        let [_, heads, tokens, head_dim] = self.shape;
        ((b * heads + h) * tokens + t) * head_dim + d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_tokens_preserves_order_across_parts() {
        let mut a = KvTensor::<f32>::zeros([1, 1, 2, 1]);
        a.as_mut_slice().copy_from_slice(&[1.0, 2.0]);
        let mut b = KvTensor::<f32>::zeros([1, 1, 1, 1]);
        b.as_mut_slice().copy_from_slice(&[3.0]);

        let joined = KvTensor::concat_tokens(&[a, b]);
        assert_eq!(joined.shape, [1, 1, 3, 1]);
        assert_eq!(joined.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn slice_tokens_truncates_to_the_requested_length() {
        let mut full = KvTensor::<i32>::zeros([1, 1, 4, 1]);
        full.as_mut_slice().copy_from_slice(&[10, 20, 30, 40]);
        let sliced = full.slice_tokens(2);
        assert_eq!(sliced.as_slice(), &[10, 20]);
    }
}
