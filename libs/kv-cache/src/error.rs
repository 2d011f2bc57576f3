use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvCacheError {
    #[error("layer {0} is not managed by this session")]
    UnmanagedLayer(u32),
    #[error("page pool exhausted: could not allocate a new page")]
    PoolExhausted,
}
