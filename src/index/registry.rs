use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::core::PartitionId;
use crate::error::{IndexError, Result};
use crate::index::{ColumnIndex, IndexLayer, LoadState, PartitionKeyIndex, SecondaryIndex};
use crate::query::{indices_as_table, IndexTable};
use crate::storage::Store;

/// 一个数据集的索引快照（不可变值）。
///
/// - 分区键列在 `load_partition_indices` 之前只登记在 `partition_keys` 里，没有索引条目，
///   即 Unloaded。
/// - 所有 load 操作都返回新快照，`self` 不变；持有旧快照的调用方看不到别人的加载。
/// - 列顺序：`columns()` 先二级索引列（列名降序），再分区键列（`partition_keys` 顺序），
///   与注册先后无关。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetIndexSnapshot {
    dataset_id: Arc<str>,
    partition_keys: Vec<String>,
    indices: BTreeMap<String, ColumnIndex>,
    partitions: Arc<BTreeSet<PartitionId>>,
}

impl DatasetIndexSnapshot {
    /// 分区集合已知时创建；此时没有任何列是 Loaded。
    pub fn new<P: Into<PartitionId>>(
        dataset_id: impl AsRef<str>,
        partition_keys: impl IntoIterator<Item = impl Into<String>>,
        partitions: impl IntoIterator<Item = P>,
    ) -> Self {
        Self {
            dataset_id: Arc::from(dataset_id.as_ref()),
            partition_keys: partition_keys.into_iter().map(Into::into).collect(),
            indices: BTreeMap::new(),
            partitions: Arc::new(partitions.into_iter().map(Into::into).collect()),
        }
    }

    /// 登记（或替换）一列索引，返回新快照。
    pub fn with_index(mut self, index: impl Into<ColumnIndex>) -> Self {
        let index = index.into();
        self.indices.insert(index.column().to_string(), index);
        self
    }

    /// 登记一个尚未加载的二级索引列。
    pub fn with_secondary_column(self, column: impl Into<String>) -> Self {
        self.with_index(SecondaryIndex::unloaded(column))
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn partition_keys(&self) -> &[String] {
        &self.partition_keys
    }

    pub fn partitions(&self) -> &BTreeSet<PartitionId> {
        &self.partitions
    }

    /// 所有已注册列：二级索引列按列名降序，随后是分区键列（按 `partition_keys` 顺序）。
    ///
    /// 同名时按分区键处理，只出现一次。
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .indices
            .keys()
            .rev()
            .map(String::as_str)
            .filter(|c| !self.is_partition_key(c))
            .collect();
        for key in &self.partition_keys {
            if !out.contains(&key.as_str()) {
                out.push(key);
            }
        }
        out
    }

    pub fn is_registered(&self, column: &str) -> bool {
        self.indices.contains_key(column) || self.is_partition_key(column)
    }

    pub fn is_partition_key(&self, column: &str) -> bool {
        self.partition_keys.iter().any(|k| k == column)
    }

    /// 未注册返回 None。
    pub fn load_state(&self, column: &str) -> Option<LoadState> {
        match self.indices.get(column) {
            Some(index) => Some(index.load_state()),
            None if self.is_partition_key(column) => Some(LoadState::Unloaded),
            None => None,
        }
    }

    pub fn index(&self, column: &str) -> Option<&ColumnIndex> {
        self.indices.get(column)
    }

    pub fn loaded_columns(&self) -> Vec<&str> {
        self.indices
            .iter()
            .filter(|(_, i)| i.load_state() == LoadState::Loaded)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// 按当前已知分区重新推导所有分区键索引。幂等。
    pub fn load_partition_indices(&self) -> Self {
        let mut next = self.clone();
        for key in &self.partition_keys {
            let index = PartitionKeyIndex::from_partitions(key, self.partitions.iter());
            next.indices.insert(key.clone(), index.into());
        }
        tracing::debug!(
            "Derived {} partition-key indices from {} partitions",
            self.partition_keys.len(),
            self.partitions.len()
        );
        next
    }

    /// 显式物化一列，返回新快照；失败时 `self` 不受影响。
    ///
    /// 分区键列直接从标识推导（无 I/O）；二级索引列从 store 读取（已加载的会重新读取）。
    pub fn load_index<S: Store + ?Sized>(&self, column: &str, store: &S) -> Result<Self> {
        let index = self.materialize(column, store)?;
        Ok(self.clone().with_index(index))
    }

    /// 加载分区键索引与全部二级索引。任何一列失败都整体失败。
    pub fn load_all_indices<S: Store + ?Sized>(&self, store: &S) -> Result<Self> {
        let indices = self.materialize_all(store)?;
        Ok(indices.into_iter().fold(self.clone(), |ds, index| ds.with_index(index)))
    }

    /// 物化所有已注册列（分区键在前），不修改 `self`。
    pub(crate) fn materialize_all<S: Store + ?Sized>(&self, store: &S) -> Result<Vec<ColumnIndex>> {
        let mut out: Vec<ColumnIndex> = self
            .partition_keys
            .iter()
            .map(|key| PartitionKeyIndex::from_partitions(key, self.partitions.iter()).into())
            .collect();
        for (column, index) in &self.indices {
            if matches!(index, ColumnIndex::Secondary(_)) && !self.is_partition_key(column) {
                out.push(self.materialize(column, store)?);
            }
        }
        tracing::debug!("Materialized {} columns of dataset `{}`", out.len(), self.dataset_id);
        Ok(out)
    }

    /// 读出一列的 Loaded 索引，但不生成新快照（DatasetHandle 在 rcu 之外做 I/O 用）。
    pub(crate) fn materialize<S: Store + ?Sized>(
        &self,
        column: &str,
        store: &S,
    ) -> Result<ColumnIndex> {
        if self.is_partition_key(column) {
            return Ok(PartitionKeyIndex::from_partitions(column, self.partitions.iter()).into());
        }
        match self.indices.get(column) {
            Some(ColumnIndex::Secondary(index)) => {
                Ok(index.load(store, &self.dataset_id)?.into())
            }
            // 非分区键却是 PartitionKey 变体：只可能来自 with_index，内容已在内存里
            Some(index @ ColumnIndex::PartitionKey(_)) => Ok(index.clone()),
            None => Err(IndexError::NotFound(column.to_string())),
        }
    }

    /// 把已加载的列拼成一张反规范化表；`None` 表示全部已注册列（顺序见 [`Self::columns`]）。
    ///
    /// 任何请求列未加载都返回 NotLoaded，不会隐式加载。
    pub fn indices_as_table(&self, columns: Option<&[&str]>) -> Result<IndexTable> {
        indices_as_table(self, columns)
    }
}
