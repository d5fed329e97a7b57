pub mod handle;
pub mod partition_key;
pub mod registry;
pub mod secondary;
pub mod value_map;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::{IndexValue, PartitionId};
use crate::error::{IndexError, Result};

pub use handle::DatasetHandle;
pub use partition_key::PartitionKeyIndex;
pub use registry::DatasetIndexSnapshot;
pub use secondary::SecondaryIndex;
pub use value_map::ValueMap;

/// 每列一个加载状态。Unloaded 与 "Loaded 但为空" 是两回事。
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Loaded,
}

/// 索引能力抽象：join 引擎只通过这里读内容。
///
/// ## 契约（重要）
/// - `values_to_partitions` 在 Unloaded 时返回 None，绝不隐式触发加载。
/// - 返回的映射迭代顺序只取决于内容（BTreeMap），不取决于插入顺序。
pub trait IndexLayer: Send + Sync {
    fn column(&self) -> &str;
    fn values_to_partitions(&self) -> Option<&ValueMap>;

    fn load_state(&self) -> LoadState {
        match self.values_to_partitions() {
            Some(_) => LoadState::Loaded,
            None => LoadState::Unloaded,
        }
    }
}

impl IndexLayer for PartitionKeyIndex {
    fn column(&self) -> &str {
        PartitionKeyIndex::column(self)
    }

    fn values_to_partitions(&self) -> Option<&ValueMap> {
        Some(self.values())
    }
}

impl IndexLayer for SecondaryIndex {
    fn column(&self) -> &str {
        SecondaryIndex::column(self)
    }

    fn values_to_partitions(&self) -> Option<&ValueMap> {
        self.values()
    }
}

/// 注册表里的一列：分区键索引 | 二级索引。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnIndex {
    PartitionKey(PartitionKeyIndex),
    Secondary(SecondaryIndex),
}

impl IndexLayer for ColumnIndex {
    fn column(&self) -> &str {
        match self {
            ColumnIndex::PartitionKey(i) => IndexLayer::column(i),
            ColumnIndex::Secondary(i) => IndexLayer::column(i),
        }
    }

    fn values_to_partitions(&self) -> Option<&ValueMap> {
        match self {
            ColumnIndex::PartitionKey(i) => i.values_to_partitions(),
            ColumnIndex::Secondary(i) => i.values_to_partitions(),
        }
    }
}

impl ColumnIndex {
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnIndex::PartitionKey(_) => "partition_key",
            ColumnIndex::Secondary(_) => "secondary",
        }
    }

    /// 读取内容；未加载时返回 NotLoaded。
    pub fn loaded_values(&self) -> Result<&ValueMap> {
        self.values_to_partitions()
            .ok_or_else(|| IndexError::NotLoaded(self.column().to_string()))
    }

    /// 某个 value 对应的分区（升序）；value 不存在时为空。
    pub fn query(&self, value: &IndexValue) -> Result<Vec<PartitionId>> {
        Ok(self
            .loaded_values()?
            .get(value)
            .map(|parts| parts.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn observed_values(&self) -> Result<Vec<IndexValue>> {
        Ok(self.loaded_values()?.values().cloned().collect())
    }

    /// 同列同类索引合并（分区集合逐 value 取并集），用于分批写入时的增量增长。
    pub fn merge(&self, other: &ColumnIndex) -> Result<ColumnIndex> {
        if self.column() != other.column() {
            return Err(IndexError::InvalidArgument(format!(
                "cannot merge index `{}` with index `{}`",
                self.column(),
                other.column()
            )));
        }
        let merged = self.loaded_values()?.merge(other.loaded_values()?);
        let column = self.column().to_string();
        match (self, other) {
            (ColumnIndex::PartitionKey(_), ColumnIndex::PartitionKey(_)) => Ok(
                ColumnIndex::PartitionKey(PartitionKeyIndex::from_values(column, merged)),
            ),
            (ColumnIndex::Secondary(_), ColumnIndex::Secondary(_)) => {
                Ok(ColumnIndex::Secondary(SecondaryIndex::loaded(column, merged)))
            }
            _ => Err(IndexError::InvalidArgument(format!(
                "cannot merge {} index with {} index for column `{}`",
                self.kind(),
                other.kind(),
                column
            ))),
        }
    }

    /// 去掉给定分区后的新索引；清空的 value 被删除。
    pub fn remove_partitions(&self, removed: &BTreeSet<PartitionId>) -> Result<ColumnIndex> {
        let values = self.loaded_values()?.remove_partitions(removed);
        let column = self.column().to_string();
        Ok(match self {
            ColumnIndex::PartitionKey(_) => {
                ColumnIndex::PartitionKey(PartitionKeyIndex::from_values(column, values))
            }
            ColumnIndex::Secondary(_) => {
                ColumnIndex::Secondary(SecondaryIndex::loaded(column, values))
            }
        })
    }
}

impl From<PartitionKeyIndex> for ColumnIndex {
    fn from(i: PartitionKeyIndex) -> Self {
        ColumnIndex::PartitionKey(i)
    }
}

impl From<SecondaryIndex> for ColumnIndex {
    fn from(i: SecondaryIndex) -> Self {
        ColumnIndex::Secondary(i)
    }
}
