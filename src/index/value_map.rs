use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::{IndexValue, PartitionId};

/// value -> 有序分区集合（多对多）。
///
/// 不变量：
/// - 每个 value 的分区集合非空且去重（BTreeSet 保证去重，空集合在写入路径上剔除）
/// - 迭代顺序只取决于内容，与插入顺序无关
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMap(BTreeMap<IndexValue, BTreeSet<PartitionId>>);

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: IndexValue, partition: PartitionId) {
        self.0.entry(value).or_default().insert(partition);
    }

    /// 不同 value 的个数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 所有 (value, partition) 对的总数
    pub fn postings(&self) -> usize {
        self.0.values().map(|s| s.len()).sum()
    }

    pub fn get(&self, value: &IndexValue) -> Option<&BTreeSet<PartitionId>> {
        self.0.get(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndexValue, &BTreeSet<PartitionId>)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &IndexValue> {
        self.0.keys()
    }

    /// 出现过的所有分区（升序）
    pub fn partitions(&self) -> BTreeSet<&PartitionId> {
        self.0.values().flatten().collect()
    }

    /// 分区集合逐 value 取并集。
    pub fn merge(&self, other: &ValueMap) -> ValueMap {
        let mut out = self.clone();
        for (value, parts) in &other.0 {
            out.0
                .entry(value.clone())
                .or_default()
                .extend(parts.iter().cloned());
        }
        out
    }

    /// 去掉给定分区；分区集合被清空的 value 一并删除。
    pub fn remove_partitions(&self, removed: &BTreeSet<PartitionId>) -> ValueMap {
        let inner = self
            .0
            .iter()
            .filter_map(|(value, parts)| {
                let kept: BTreeSet<PartitionId> = parts.difference(removed).cloned().collect();
                (!kept.is_empty()).then(|| (value.clone(), kept))
            })
            .collect();
        ValueMap(inner)
    }

    /// 倒排：partition -> [value]。
    ///
    /// value 按升序遍历，所以每个分区的 value 列表天然升序且不重复。
    pub fn invert(&self) -> BTreeMap<&PartitionId, Vec<&IndexValue>> {
        let mut out: BTreeMap<&PartitionId, Vec<&IndexValue>> = BTreeMap::new();
        for (value, parts) in &self.0 {
            for p in parts {
                out.entry(p).or_default().push(value);
            }
        }
        out
    }

    /// 按升序导出，供持久化编码使用。
    pub fn to_entries(&self) -> Vec<(IndexValue, Vec<PartitionId>)> {
        self.0
            .iter()
            .map(|(v, parts)| (v.clone(), parts.iter().cloned().collect()))
            .collect()
    }

    /// `to_entries` 的逆过程；重复 value 合并，空分区列表丢弃。
    pub fn from_entries(entries: Vec<(IndexValue, Vec<PartitionId>)>) -> Self {
        let mut out = ValueMap::new();
        for (value, parts) in entries {
            for p in parts {
                out.insert(value.clone(), p);
            }
        }
        out
    }
}

impl FromIterator<(IndexValue, PartitionId)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (IndexValue, PartitionId)>>(iter: I) -> Self {
        let mut out = ValueMap::new();
        for (value, partition) in iter {
            out.insert(value, partition);
        }
        out
    }
}
