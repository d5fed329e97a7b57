use std::fmt;

use serde::Serialize;

use crate::index::{DatasetIndexSnapshot, IndexLayer, LoadState};

/// 快照统计（按列）
#[derive(Clone, Debug, Serialize)]
pub struct IndexReport {
    pub dataset_id: String,
    /// 已知分区数
    pub partition_count: usize,
    pub columns: Vec<ColumnStats>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ColumnStats {
    pub column: String,
    /// partition_key | secondary
    pub kind: &'static str,
    pub state: LoadState,
    /// 不同 value 数（未加载为 None）
    pub distinct_values: Option<usize>,
    /// (value, partition) 对总数（未加载为 None）
    pub postings: Option<usize>,
}

impl IndexReport {
    pub fn from_snapshot(snapshot: &DatasetIndexSnapshot) -> Self {
        let columns = snapshot
            .columns()
            .into_iter()
            .map(|column| match snapshot.index(column) {
                Some(index) => {
                    let values = index.values_to_partitions();
                    ColumnStats {
                        column: column.to_string(),
                        kind: index.kind(),
                        state: index.load_state(),
                        distinct_values: values.map(|v| v.len()),
                        postings: values.map(|v| v.postings()),
                    }
                }
                // 分区键列尚未推导
                None => ColumnStats {
                    column: column.to_string(),
                    kind: "partition_key",
                    state: LoadState::Unloaded,
                    distinct_values: None,
                    postings: None,
                },
            })
            .collect();

        Self {
            dataset_id: snapshot.dataset_id().to_string(),
            partition_count: snapshot.partitions().len(),
            columns,
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.state == LoadState::Loaded)
            .count()
    }
}

fn opt(v: Option<usize>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           ds-index Index Report                  ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Dataset:    {:>36} ║", self.dataset_id)?;
        writeln!(f, "║ Partitions: {:>36} ║", self.partition_count)?;
        writeln!(
            f,
            "║ Loaded:     {:>36} ║",
            format!("{}/{}", self.loaded_count(), self.columns.len())
        )?;
        for c in &self.columns {
            writeln!(f, "╠──────────────────────────────────────────────────╣")?;
            writeln!(f, "║ {:<48} ║", format!("{} ({})", c.column, c.kind))?;
            let state = match c.state {
                LoadState::Loaded => "loaded",
                LoadState::Unloaded => "unloaded",
            };
            writeln!(f, "║   state:    {:>36} ║", state)?;
            writeln!(f, "║   values:   {:>36} ║", opt(c.distinct_values))?;
            writeln!(f, "║   postings: {:>36} ║", opt(c.postings))?;
        }
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
