use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 分区标识：不透明、按字节序可比较的字符串。
///
/// 形如 `P=1/Q=a/cluster_1`：`k=v` 段编码分区键，其余段（物理标签）只用于区分
/// 共享同一组分区键取值的多个物理分区。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 按 `/` 切出的所有 `k=v` 段（第一个 `=` 分割，k 非空）。
    pub fn key_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.split('/').filter_map(|seg| {
            let (k, v) = seg.split_once('=')?;
            (!k.is_empty()).then_some((k, v))
        })
    }

    /// 某个分区键在标识里出现的所有原始取值。
    pub fn values_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.key_values()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PartitionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartitionId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for PartitionId {
    fn from(v: String) -> Self {
        Self(v)
    }
}
