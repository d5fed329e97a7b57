#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod core;
pub mod error;
pub mod index;
pub mod query;
pub mod stats;
pub mod storage;

pub use crate::core::{IndexValue, PartitionId};
pub use error::{IndexError, Result};
pub use index::{
    ColumnIndex, DatasetHandle, DatasetIndexSnapshot, IndexLayer, LoadState, PartitionKeyIndex,
    SecondaryIndex, ValueMap,
};
pub use query::{IndexRow, IndexTable};
pub use storage::{FsStore, MemoryStore, Store, StoreError};
