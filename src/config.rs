use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::index::DatasetIndexSnapshot;

/// 数据集清单（TOML）：分区目录与索引列的来源。
///
/// ```toml
/// dataset_id = "uuid"
/// partition_keys = ["P"]
/// partitions = ["P=1/cluster_1", "P=2/cluster_2"]
/// indices = ["L"]
///
/// [store]
/// root = "/var/lib/ds-index"
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetManifest {
    pub dataset_id: String,
    #[serde(default)]
    pub partition_keys: Vec<String>,
    pub partitions: Vec<String>,
    /// 二级索引列（持久化在 store 中）
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub root: Option<PathBuf>,
}

impl DatasetManifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse manifest {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let manifest: DatasetManifest = toml::from_str(raw)?;
        if manifest.dataset_id.is_empty() {
            anyhow::bail!("dataset_id must not be empty");
        }
        Ok(manifest)
    }

    /// 初始快照：分区集合已知，二级索引列登记为 Unloaded。
    pub fn to_snapshot(&self) -> DatasetIndexSnapshot {
        self.indices.iter().fold(
            DatasetIndexSnapshot::new(
                &self.dataset_id,
                self.partition_keys.iter().cloned(),
                self.partitions.iter().cloned(),
            ),
            |ds, column| ds.with_secondary_column(column.clone()),
        )
    }

    /// store 目录优先级：命令行 > 清单 > `<data_dir>/ds-index`
    pub fn resolve_store_root(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.store.root.clone())
            .unwrap_or_else(default_store_root)
    }
}

pub fn default_store_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ds-index")
}
