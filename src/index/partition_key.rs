use std::sync::Arc;

use crate::core::{IndexValue, PartitionId};
use crate::index::ValueMap;

/// 分区键索引：取值直接从分区标识的 `k=v` 段解码，不依赖外部存储。
///
/// 构造即 Loaded。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionKeyIndex {
    column: String,
    values: Arc<ValueMap>,
}

impl PartitionKeyIndex {
    /// 对每个分区解码 `column=...` 段并插入 (value, partition)。
    ///
    /// 不带该段的分区对本列没有贡献；同一标识里重复出现的键各自贡献一个 value。
    pub fn from_partitions<'a>(
        column: &str,
        partitions: impl IntoIterator<Item = &'a PartitionId>,
    ) -> Self {
        let values: ValueMap = partitions
            .into_iter()
            .flat_map(|p| {
                p.values_for(column)
                    .map(move |raw| (IndexValue::infer(raw), p.clone()))
            })
            .collect();
        Self {
            column: column.to_string(),
            values: Arc::new(values),
        }
    }

    pub(crate) fn from_values(column: String, values: ValueMap) -> Self {
        Self {
            column,
            values: Arc::new(values),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }
}
