use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::core::{IndexValue, PartitionId};
use crate::error::{IndexError, Result};
use crate::index::{DatasetIndexSnapshot, IndexLayer};
use crate::query::table::{IndexRow, IndexTable};

/// 多路 inner join：在共享分区标识上把若干已加载列拼成一张反规范化表。
///
/// 1) 每列倒排 value -> [partition] 为 partition -> [value]
/// 2) 只保留在所有请求列中都出现的分区（inner join）
/// 3) 分区按字典序升序处理
/// 4) 每个分区内各列 value 升序去重，按请求列顺序做笛卡尔积（第一列变化最慢）
/// 5) 按分区顺序拼接
///
/// 笛卡尔积不设上限：多列同时多值时行数是各列取值个数之积，由调用方负责。
pub fn indices_as_table(
    snapshot: &DatasetIndexSnapshot,
    columns: Option<&[&str]>,
) -> Result<IndexTable> {
    let columns: Vec<&str> = match columns {
        Some(cols) => cols.to_vec(),
        None => snapshot.columns(),
    };
    if columns.is_empty() {
        return Err(IndexError::InvalidArgument(
            "at least one column is required".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(**c)) {
        return Err(IndexError::InvalidArgument(format!(
            "column `{dup}` requested more than once"
        )));
    }

    // 先整体校验，任何一列不可读都不做计算
    let mut maps = Vec::with_capacity(columns.len());
    for column in &columns {
        if !snapshot.is_registered(column) {
            return Err(IndexError::NotFound(column.to_string()));
        }
        let values = snapshot
            .index(column)
            .and_then(|i| i.values_to_partitions())
            .ok_or_else(|| IndexError::NotLoaded(column.to_string()))?;
        maps.push(values);
    }

    let inverted: Vec<BTreeMap<&PartitionId, Vec<&IndexValue>>> =
        maps.iter().map(|m| m.invert()).collect();

    let Some((first, rest)) = inverted.split_first() else {
        return Err(IndexError::InvalidArgument(
            "at least one column is required".to_string(),
        ));
    };
    let joined: Vec<(&PartitionId, Vec<&[&IndexValue]>)> = first
        .iter()
        .filter_map(|(partition, values)| {
            let mut per_column: Vec<&[&IndexValue]> = Vec::with_capacity(inverted.len());
            per_column.push(values.as_slice());
            for other in rest {
                per_column.push(other.get(partition)?.as_slice());
            }
            Some((*partition, per_column))
        })
        .collect();

    // 并行展开；indexed collect 保持分区顺序，输出与串行一致
    let rows: Vec<IndexRow> = joined
        .par_iter()
        .map(|(partition, per_column)| expand(partition, per_column))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    tracing::debug!(
        "indices_as_table: {} columns, {} partitions joined, {} rows",
        columns.len(),
        joined.len(),
        rows.len()
    );

    Ok(IndexTable::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// 单个分区的笛卡尔积：最后一列变化最快。
fn expand(partition: &PartitionId, per_column: &[&[&IndexValue]]) -> Vec<IndexRow> {
    let total: usize = per_column.iter().map(|v| v.len()).product();
    let mut rows = Vec::with_capacity(total);
    if total == 0 {
        return rows;
    }

    let mut cursor = vec![0usize; per_column.len()];
    loop {
        rows.push(IndexRow {
            partition: partition.clone(),
            values: cursor
                .iter()
                .zip(per_column)
                .map(|(&i, vals)| vals[i].clone())
                .collect(),
        });

        let mut pos = per_column.len();
        loop {
            if pos == 0 {
                return rows;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < per_column[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SecondaryIndex;
    use crate::storage::MemoryStore;

    fn dataset_with_index() -> DatasetIndexSnapshot {
        DatasetIndexSnapshot::new("uuid", ["P"], ["P=1/cluster_1", "P=2/cluster_2"])
            .with_secondary_column("L")
    }

    fn store_with_l() -> MemoryStore {
        let store = MemoryStore::new();
        SecondaryIndex::from_mapping(
            "L",
            vec![(1, vec!["P=1/cluster_1"]), (2, vec!["P=2/cluster_2"])],
        )
        .store(&store, "uuid")
        .unwrap();
        store
    }

    fn ints(vals: Vec<&IndexValue>) -> Vec<i64> {
        vals.into_iter().map(|v| v.as_int().unwrap()).collect()
    }

    fn labels(t: &IndexTable) -> Vec<&str> {
        t.partition_labels().into_iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn raise_index_not_loaded() {
        let ds = dataset_with_index();
        let err = ds.indices_as_table(Some(&["P"][..])).unwrap_err();
        assert!(matches!(err, IndexError::NotLoaded(c) if c == "P"));
        assert!(matches!(ds.indices_as_table(None), Err(IndexError::NotLoaded(_))));
    }

    #[test]
    fn partition_keys_only() {
        let ds = dataset_with_index().load_partition_indices();
        let keys: Vec<&str> = ds.partition_keys().iter().map(String::as_str).collect();
        let t = ds.indices_as_table(Some(keys.as_slice())).unwrap();

        assert_eq!(t.columns(), &["P".to_string()]);
        assert_eq!(ints(t.column("P").unwrap()), vec![1, 2]);
        assert_eq!(labels(&t), vec!["P=1/cluster_1", "P=2/cluster_2"]);
    }

    #[test]
    fn partition_and_secondary_columns() {
        let store = store_with_l();
        let ds = dataset_with_index()
            .load_partition_indices()
            .load_index("L", &store)
            .unwrap();

        let t = ds.indices_as_table(None).unwrap();
        assert_eq!(t.columns(), &["L".to_string(), "P".to_string()]);
        assert_eq!(ints(t.column("L").unwrap()), vec![1, 2]);
        assert_eq!(ints(t.column("P").unwrap()), vec![1, 2]);
        assert_eq!(labels(&t), vec!["P=1/cluster_1", "P=2/cluster_2"]);
    }

    #[test]
    fn duplicates_expand_to_cartesian_product() {
        let ds = DatasetIndexSnapshot::new("some_uuid", Vec::<String>::new(), ["part1", "part2"])
            .with_index(SecondaryIndex::from_mapping(
                "l_external_code",
                vec![("1", vec!["part1", "part2"]), ("2", vec!["part1", "part2"])],
            ))
            .with_index(SecondaryIndex::from_mapping(
                "p_external_code",
                vec![("1", vec!["part1"]), ("2", vec!["part2"])],
            ));

        let t = ds
            .indices_as_table(Some(&["p_external_code", "l_external_code"][..]))
            .unwrap();
        assert_eq!(labels(&t), vec!["part1", "part1", "part2", "part2"]);
        let p: Vec<String> = t.column("p_external_code").unwrap().iter().map(|v| v.to_string()).collect();
        let l: Vec<String> = t.column("l_external_code").unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(p, vec!["1", "1", "2", "2"]);
        assert_eq!(l, vec!["1", "2", "1", "2"]);

        // 默认列顺序：二级索引列名降序，结果与显式指定 [p, l] 相同
        let all = ds.indices_as_table(None).unwrap();
        assert_eq!(
            all.columns(),
            &["p_external_code".to_string(), "l_external_code".to_string()]
        );
        assert_eq!(all, t);
        assert_eq!(all.rows()[1].values, vec![IndexValue::from("1"), IndexValue::from("2")]);
    }

    #[test]
    fn inner_join_drops_partitions_missing_from_a_column() {
        let ds = DatasetIndexSnapshot::new("ds", Vec::<String>::new(), ["a", "b", "c"])
            .with_index(SecondaryIndex::from_mapping("x", vec![(1, vec!["a", "b", "c"])]))
            .with_index(SecondaryIndex::from_mapping("y", vec![(5, vec!["c", "a"])]));

        let t = ds.indices_as_table(None).unwrap();
        assert_eq!(labels(&t), vec!["a", "c"]);
    }

    #[test]
    fn row_count_is_product_of_multiplicities() {
        let ds = DatasetIndexSnapshot::new("ds", Vec::<String>::new(), ["p"])
            .with_index(SecondaryIndex::from_mapping("a", vec![(1, vec!["p"]), (2, vec!["p"])]))
            .with_index(SecondaryIndex::from_mapping(
                "b",
                vec![(1, vec!["p"]), (2, vec!["p"]), (3, vec!["p"])],
            ));
        let t = ds.indices_as_table(None).unwrap();
        assert_eq!(t.len(), 6);
        assert_eq!(t.columns(), &["b".to_string(), "a".to_string()]);
        let firsts: Vec<i64> = t.rows().iter().map(|r| r.values[0].as_int().unwrap()).collect();
        assert_eq!(firsts, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn rejects_bad_column_requests() {
        let ds = dataset_with_index().load_partition_indices();
        assert!(matches!(
            ds.indices_as_table(Some(&[] as &[&str])),
            Err(IndexError::InvalidArgument(_))
        ));
        assert!(matches!(
            ds.indices_as_table(Some(&["P", "P"][..])),
            Err(IndexError::InvalidArgument(_))
        ));
        assert!(matches!(
            ds.indices_as_table(Some(&["nope"][..])),
            Err(IndexError::NotFound(c)) if c == "nope"
        ));
    }

    #[test]
    fn loaded_but_empty_column_yields_empty_table() {
        let ds = DatasetIndexSnapshot::new("ds", ["P"], ["P=1/a"])
            .load_partition_indices()
            .with_index(SecondaryIndex::loaded("e", Default::default()));
        let t = ds.indices_as_table(None).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns().len(), 2);
    }

    #[test]
    fn load_partition_indices_twice_gives_equal_table() {
        let base = dataset_with_index();
        let a = base.load_partition_indices();
        let b = a.load_partition_indices();
        assert_eq!(
            a.indices_as_table(Some(&["P"][..])).unwrap(),
            b.indices_as_table(Some(&["P"][..])).unwrap()
        );
    }

    #[test]
    fn output_is_independent_of_insertion_order() {
        let fwd = SecondaryIndex::from_mapping("c", vec![(2, vec!["b", "a"]), (1, vec!["a"])]);
        let rev = SecondaryIndex::from_mapping("c", vec![(1, vec!["a"]), (2, vec!["a", "b"])]);
        let t1 = DatasetIndexSnapshot::new("ds", Vec::<String>::new(), ["a", "b"])
            .with_index(fwd)
            .indices_as_table(None)
            .unwrap();
        let t2 = DatasetIndexSnapshot::new("ds", Vec::<String>::new(), ["b", "a"])
            .with_index(rev)
            .indices_as_table(None)
            .unwrap();
        assert_eq!(t1, t2);
        assert_eq!(t1.to_string(), "partition\tc\na\t1\na\t2\nb\t2\n");
    }

    #[test]
    fn concurrent_readers_share_a_snapshot() {
        let ds = std::sync::Arc::new(dataset_with_index().load_partition_indices());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ds = ds.clone();
                std::thread::spawn(move || ds.indices_as_table(Some(&["P"][..])).unwrap())
            })
            .collect();
        let tables: Vec<IndexTable> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tables.windows(2).all(|w| w[0] == w[1]));
    }
}
