use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::Result;
use crate::index::DatasetIndexSnapshot;
use crate::query::IndexTable;
use crate::storage::Store;

/// 长驻服务用的"当前快照"发布点。
///
/// 读：无锁拿到当前快照的 Arc，之后的 load 不影响已拿到的快照。
/// 写：I/O 在 rcu 之外只做一次；rcu 只把已物化的列装进最新快照，
/// 并发加载不同列时互不覆盖。
pub struct DatasetHandle {
    current: ArcSwap<DatasetIndexSnapshot>,
}

impl DatasetHandle {
    pub fn new(snapshot: DatasetIndexSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn snapshot(&self) -> Arc<DatasetIndexSnapshot> {
        self.current.load_full()
    }

    pub fn load_partition_indices(&self) -> Arc<DatasetIndexSnapshot> {
        self.current
            .rcu(|cur| Arc::new(cur.load_partition_indices()));
        self.snapshot()
    }

    pub fn load_index<S: Store + ?Sized>(
        &self,
        column: &str,
        store: &S,
    ) -> Result<Arc<DatasetIndexSnapshot>> {
        let index = self.current.load().materialize(column, store)?;
        self.current
            .rcu(|cur| Arc::new(cur.as_ref().clone().with_index(index.clone())));
        tracing::info!("Published snapshot with column `{}` loaded", column);
        Ok(self.snapshot())
    }

    pub fn load_all_indices<S: Store + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Arc<DatasetIndexSnapshot>> {
        let indices = self.current.load().materialize_all(store)?;
        self.current.rcu(|cur| {
            Arc::new(
                indices
                    .iter()
                    .cloned()
                    .fold(cur.as_ref().clone(), |ds, index| ds.with_index(index)),
            )
        });
        tracing::info!("Published snapshot with {} columns loaded", indices.len());
        Ok(self.snapshot())
    }

    pub fn indices_as_table(&self, columns: Option<&[&str]>) -> Result<IndexTable> {
        self.current.load().indices_as_table(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{LoadState, SecondaryIndex};
    use crate::storage::MemoryStore;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for col in ["A", "B", "C", "D"] {
            SecondaryIndex::from_mapping(col, vec![(1, vec!["k=1/p"])])
                .store(&store, "ds")
                .unwrap();
        }
        store
    }

    fn base() -> DatasetIndexSnapshot {
        ["A", "B", "C", "D"].into_iter().fold(
            DatasetIndexSnapshot::new("ds", ["k"], ["k=1/p"]),
            |ds, c| ds.with_secondary_column(c),
        )
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let store = store();
        let handle = DatasetHandle::new(base());
        let before = handle.snapshot();

        handle.load_index("A", &store).unwrap();
        assert_eq!(before.load_state("A"), Some(LoadState::Unloaded));
        assert_eq!(handle.snapshot().load_state("A"), Some(LoadState::Loaded));
    }

    #[test]
    fn concurrent_loads_are_not_lost() {
        let store = Arc::new(store());
        let handle = Arc::new(DatasetHandle::new(base()));

        let threads: Vec<_> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|col| {
                let handle = handle.clone();
                let store = store.clone();
                std::thread::spawn(move || {
                    handle.load_index(col, &store).unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        handle.load_partition_indices();
        let t = handle.indices_as_table(None).unwrap();
        assert_eq!(t.columns().len(), 5);
        assert_eq!(t.len(), 1);
    }

    /// 读取时顺带发布一个新快照，模拟 load_all 做 I/O 期间的并发写入。
    struct PublishingStore<'a> {
        inner: MemoryStore,
        handle: &'a DatasetHandle,
    }

    impl Store for PublishingStore<'_> {
        fn get(&self, key: &str) -> std::result::Result<Vec<u8>, crate::storage::StoreError> {
            let late = SecondaryIndex::from_mapping("late", vec![(7, vec!["k=1/p"])]);
            self.handle
                .current
                .rcu(|cur| Arc::new(cur.as_ref().clone().with_index(late.clone())));
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> std::result::Result<(), crate::storage::StoreError> {
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> std::result::Result<(), crate::storage::StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn load_all_keeps_columns_published_during_io() {
        let handle = DatasetHandle::new(base());
        let store = PublishingStore {
            inner: store(),
            handle: &handle,
        };

        let snap = handle.load_all_indices(&store).unwrap();
        assert_eq!(snap.load_state("late"), Some(LoadState::Loaded));
        for col in ["k", "A", "B", "C", "D"] {
            assert_eq!(snap.load_state(col), Some(LoadState::Loaded));
        }
    }

    #[test]
    fn load_all_then_load_index_publishes_latest_content() {
        let store = store();
        let handle = DatasetHandle::new(base());
        handle.load_all_indices(&store).unwrap();

        SecondaryIndex::from_mapping("A", vec![(2, vec!["k=1/p"])])
            .store(&store, "ds")
            .unwrap();
        handle.load_index("A", &store).unwrap();

        let t = handle.indices_as_table(Some(&["A"][..])).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0].values, vec![crate::core::IndexValue::Int(2)]);
    }

    #[test]
    fn failed_load_keeps_current_snapshot() {
        let store = MemoryStore::new();
        let handle = DatasetHandle::new(base());
        let before = handle.snapshot();
        assert!(handle.load_index("A", &store).is_err());
        assert!(handle.load_all_indices(&store).is_err());
        assert_eq!(*handle.snapshot(), *before);
    }
}
