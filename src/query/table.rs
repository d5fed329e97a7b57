use std::fmt;
use std::io::Write;

use crate::core::{IndexValue, PartitionId};

/// join 输出的一行：分区标识 + 每个请求列一个值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRow {
    pub partition: PartitionId,
    pub values: Vec<IndexValue>,
}

/// 反规范化索引表（行式）。
///
/// 行标签是分区标识，不唯一：一个分区展开出 N 个组合就有 N 行同标签。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexTable {
    columns: Vec<String>,
    rows: Vec<IndexRow>,
}

impl IndexTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<IndexRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 行标签（按行顺序）
    pub fn partition_labels(&self) -> Vec<&PartitionId> {
        self.rows.iter().map(|r| &r.partition).collect()
    }

    /// 列式读取某一列。
    pub fn column(&self, name: &str) -> Option<Vec<&IndexValue>> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r.values[pos]).collect())
    }

    /// `{"columns": [...], "partition": [...], "data": [[...], ...]}`，data 按列给出。
    pub fn to_json(&self) -> serde_json::Value {
        let data: Vec<serde_json::Value> = (0..self.columns.len())
            .map(|i| {
                serde_json::Value::Array(self.rows.iter().map(|r| r.values[i].to_json()).collect())
            })
            .collect();
        serde_json::json!({
            "columns": self.columns,
            "partition": self.rows.iter().map(|r| r.partition.as_str()).collect::<Vec<_>>(),
            "data": data,
        })
    }

    /// TSV：首行 `partition\t<col>...`
    pub fn write_tsv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        write!(w, "partition")?;
        for c in &self.columns {
            write!(w, "\t{c}")?;
        }
        writeln!(w)?;
        for row in &self.rows {
            write!(w, "{}", row.partition)?;
            for v in &row.values {
                write!(w, "\t{v}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexTable {
        IndexTable::new(
            vec!["L".into(), "P".into()],
            vec![
                IndexRow {
                    partition: "P=1/cluster_1".into(),
                    values: vec![IndexValue::Int(1), IndexValue::Int(1)],
                },
                IndexRow {
                    partition: "P=2/cluster_2".into(),
                    values: vec![IndexValue::Int(2), IndexValue::Str("b".into())],
                },
            ],
        )
    }

    #[test]
    fn tsv_rendering() {
        assert_eq!(
            sample().to_string(),
            "partition\tL\tP\nP=1/cluster_1\t1\t1\nP=2/cluster_2\t2\tb\n"
        );
    }

    #[test]
    fn json_is_column_oriented() {
        let v = sample().to_json();
        assert_eq!(v["columns"], serde_json::json!(["L", "P"]));
        assert_eq!(v["partition"], serde_json::json!(["P=1/cluster_1", "P=2/cluster_2"]));
        assert_eq!(v["data"][1], serde_json::json!([1, "b"]));
    }

    #[test]
    fn column_accessor() {
        let t = sample();
        assert_eq!(t.column("L").unwrap(), vec![&IndexValue::Int(1), &IndexValue::Int(2)]);
        assert!(t.column("X").is_none());
    }
}
