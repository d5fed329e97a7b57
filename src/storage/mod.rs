pub mod codec;
pub mod fs;
pub mod memory;

use thiserror::Error;

pub use codec::{decode_index, encode_index};
pub use fs::FsStore;
pub use memory::MemoryStore;

/// Store 原生错误。索引层拿到后原样透传（不重试、不吞掉）。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("store io error on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// 外部 `Store` 实现（对象存储 SDK 等）的错误。
    ///
    /// 内置的 `MemoryStore`/`FsStore` 不会产生它；索引层与其它变体一样原样透传。
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 外部 KV 存储能力：按 key 取/存字节。
///
/// ## 契约
/// - `get` 不存在时必须返回 `StoreError::NotFound`（而不是空字节）。
/// - 实现自行负责并发安全；索引层对同一个 store 可能并发 `get` 不同的 key。
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key)
    }
}

/// 二级索引在 store 中的位置：`{dataset_id}/indices/{column}.by-dataset-index.bin`
pub fn index_storage_key(dataset_id: &str, column: &str) -> String {
    format!("{dataset_id}/indices/{column}.by-dataset-index.bin")
}
