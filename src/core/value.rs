use serde::{Deserialize, Serialize};
use std::fmt;

/// 索引列的一个取值（标量）。
///
/// 全序：先按变体（Bool < Int < Str），再按自然序。
/// join 输出的确定性依赖这个顺序，不要调整变体的声明顺序。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl IndexValue {
    /// 从分区标识里的文本段推断类型：规范十进制 i64 -> Int，true/false -> Bool，其余 Str。
    ///
    /// "01"、"+1" 不是规范写法，保持 Str，避免解码后再编码时丢信息。
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return IndexValue::Bool(true),
            "false" => return IndexValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = raw.parse::<i64>() {
            if v.to_string() == raw {
                return IndexValue::Int(v);
            }
        }
        IndexValue::Str(raw.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            IndexValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// JSON 输出用的无标签形式（bincode 无法反序列化 untagged，所以不在 serde 层做）。
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            IndexValue::Bool(b) => serde_json::Value::Bool(*b),
            IndexValue::Int(v) => serde_json::Value::from(*v),
            IndexValue::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Bool(b) => write!(f, "{b}"),
            IndexValue::Int(v) => write!(f, "{v}"),
            IndexValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for IndexValue {
    fn from(v: bool) -> Self {
        IndexValue::Bool(v)
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Int(v)
    }
}

impl From<i32> for IndexValue {
    fn from(v: i32) -> Self {
        IndexValue::Int(v as i64)
    }
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Str(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Str(v)
    }
}
