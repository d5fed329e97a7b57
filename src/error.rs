use thiserror::Error;

use crate::storage::StoreError;

/// 索引层统一错误。
///
/// 任何返回 Err 的加载都不会改动输入快照：调用方手里的旧快照保持可用。
#[derive(Debug, Error)]
pub enum IndexError {
    /// 读取了尚未物化的列（不会隐式触发加载）
    #[error("index for column `{0}` is not loaded")]
    NotLoaded(String),

    /// 列未注册
    #[error("no index registered for column `{0}`")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 持久化索引内容损坏（magic/version/长度/校验/列名不一致）
    #[error("corrupt index artifact `{key}`: {reason}")]
    Corrupt { key: String, reason: String },

    /// store 原生错误，原样透传，不重试
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub fn corrupt(key: &str, reason: impl Into<String>) -> Self {
        IndexError::Corrupt {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
