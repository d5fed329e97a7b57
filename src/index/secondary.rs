use std::sync::Arc;

use crate::core::{IndexValue, PartitionId};
use crate::error::{IndexError, Result};
use crate::index::ValueMap;
use crate::storage::{decode_index, encode_index, index_storage_key, Store};

/// 二级索引：任意列的 value -> 分区，独立于分区单独持久化。
///
/// `values == None` 即 Unloaded；Loaded 但为空是 `Some(empty)`，两者不同。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondaryIndex {
    column: String,
    values: Option<Arc<ValueMap>>,
}

impl SecondaryIndex {
    /// 未加载：只知道列名，内容需要显式 `load`。
    pub fn unloaded(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            values: None,
        }
    }

    /// 已加载：直接给出内存中的映射（写入路径 / 测试用）。
    pub fn loaded(column: impl Into<String>, values: ValueMap) -> Self {
        Self {
            column: column.into(),
            values: Some(Arc::new(values)),
        }
    }

    /// `{value: [partition, ...]}` 形式的便捷构造。
    pub fn from_mapping<V, P, I>(column: impl Into<String>, mapping: I) -> Self
    where
        V: Into<IndexValue>,
        P: Into<PartitionId>,
        I: IntoIterator<Item = (V, Vec<P>)>,
    {
        let mut values = ValueMap::new();
        for (value, parts) in mapping {
            let value = value.into();
            for p in parts {
                values.insert(value.clone(), p.into());
            }
        }
        Self::loaded(column, values)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn values(&self) -> Option<&ValueMap> {
        self.values.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.values.is_some()
    }

    pub fn storage_key(&self, dataset_id: &str) -> String {
        index_storage_key(dataset_id, &self.column)
    }

    /// 从 store 读取并解码，返回一个新的 Loaded 索引；`self` 不变。
    ///
    /// store 错误原样透传；内容损坏返回 `Corrupt`。
    pub fn load<S: Store + ?Sized>(&self, store: &S, dataset_id: &str) -> Result<Self> {
        let key = self.storage_key(dataset_id);
        let data = store.get(&key)?;
        let values = decode_index(&key, &self.column, &data).map_err(|e| {
            tracing::warn!("Rejecting index artifact {}: {}", key, e);
            e
        })?;
        tracing::info!(
            "Loaded index `{}`: {} values, {} postings",
            self.column,
            values.len(),
            values.postings()
        );
        Ok(Self::loaded(self.column.clone(), values))
    }

    /// 持久化到 store，返回写入的 key。
    pub fn store<S: Store + ?Sized>(&self, store: &S, dataset_id: &str) -> Result<String> {
        let values = self
            .values()
            .ok_or_else(|| IndexError::NotLoaded(self.column.clone()))?;
        let key = self.storage_key(dataset_id);
        let bytes = encode_index(&self.column, values)?;
        store.put(&key, &bytes)?;
        tracing::info!("Stored index `{}` -> {} ({} bytes)", self.column, key, bytes.len());
        Ok(key)
    }
}
