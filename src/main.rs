use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ds_index::config::DatasetManifest;
use ds_index::index::{DatasetHandle, SecondaryIndex, ValueMap};
use ds_index::query::QueryServer;
use ds_index::stats::IndexReport;
use ds_index::{FsStore, IndexValue, PartitionId};

#[derive(Parser)]
#[command(name = "ds-index", version, about = "Partition-index join engine")]
struct Cli {
    /// 数据集清单（TOML）
    #[arg(long, short = 'm', global = true, default_value = "dataset.toml")]
    manifest: PathBuf,

    /// store 根目录（覆盖清单中的 [store].root）
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 加载索引并打印反规范化表
    Table {
        /// 逗号分隔的列；缺省为全部已注册列
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        #[arg(long, value_enum, default_value_t = Format::Tsv)]
        format: Format,
    },
    /// 从 JSON `{value: [partition, ...]}` 写入一列二级索引
    PutIndex {
        #[arg(long)]
        column: String,
        #[arg(long)]
        input: PathBuf,
        /// 按分区键同样的规则推断 value 类型（默认全部按字符串）
        #[arg(long)]
        infer_types: bool,
    },
    /// 打印索引统计
    Stats,
    /// HTTP 查询服务
    Serve {
        #[arg(long, default_value_t = 6060)]
        port: u16,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum Format {
    Tsv,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let manifest = DatasetManifest::load(&cli.manifest)?;
    let store = FsStore::new(manifest.resolve_store_root(cli.store.clone()));
    info!(
        "Dataset {}: {} partitions, store at {}",
        manifest.dataset_id,
        manifest.partitions.len(),
        store.root().display()
    );

    match cli.command {
        Command::Table { columns, format } => {
            let ds = manifest.to_snapshot().load_partition_indices();
            let wanted: Vec<String> = match &columns {
                Some(cols) => cols.clone(),
                None => ds.columns().into_iter().map(str::to_string).collect(),
            };
            // 只物化需要的二级索引列
            let secondary: Vec<String> = wanted
                .into_iter()
                .filter(|c| !ds.is_partition_key(c))
                .collect();
            let mut ds = ds;
            for column in &secondary {
                ds = ds
                    .load_index(column, &store)
                    .with_context(|| format!("load index `{column}`"))?;
            }

            let requested: Option<Vec<&str>> = columns
                .as_ref()
                .map(|cols| cols.iter().map(String::as_str).collect());
            let table = ds.indices_as_table(requested.as_deref())?;
            match format {
                Format::Tsv => table.write_tsv(std::io::stdout().lock())?,
                Format::Json => println!("{}", serde_json::to_string_pretty(&table.to_json())?),
            }
        }
        Command::PutIndex {
            column,
            input,
            infer_types,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("read {}", input.display()))?;
            let mapping: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
                .with_context(|| format!("parse {}", input.display()))?;

            let known = manifest.to_snapshot();
            let mut values = ValueMap::new();
            for (raw_value, parts) in mapping {
                let value = if infer_types {
                    IndexValue::infer(&raw_value)
                } else {
                    IndexValue::Str(raw_value)
                };
                for p in parts {
                    let p = PartitionId::from(p);
                    if !known.partitions().contains(&p) {
                        tracing::warn!("Partition {} is not listed in the manifest", p);
                    }
                    values.insert(value.clone(), p);
                }
            }

            let key = SecondaryIndex::loaded(column, values).store(&store, &manifest.dataset_id)?;
            println!("{key}");
        }
        Command::Stats => {
            let ds = manifest.to_snapshot().load_all_indices(&store)?;
            print!("{}", IndexReport::from_snapshot(&ds));
        }
        Command::Serve { port } => {
            let handle = Arc::new(DatasetHandle::new(manifest.to_snapshot()));
            handle.load_all_indices(&store)?;

            let server = QueryServer::new(handle);
            tokio::select! {
                res = server.run(port) => res?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
            }
        }
    }

    Ok(())
}
