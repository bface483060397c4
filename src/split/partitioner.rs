//! Row-count and column-value partitioning.
//!
//! Both operations are pure: they read the dataset and allocate new chunks.
//! Every source row lands in exactly one chunk.

use std::collections::HashMap;

use tracing::debug;

use super::file_name::{group_chunk_name, row_chunk_name};
use super::Chunk;
use crate::dataset::Dataset;
use crate::error::AppError;

/// Splits a dataset into contiguous chunks of at most `rows_per_chunk` rows.
///
/// Produces `ceil(len / rows_per_chunk)` chunks named
/// `{name_prefix}_rows_{i}.csv`; only the last one may be short. An empty
/// dataset yields no chunks.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` if `rows_per_chunk` is zero or a chunk
/// name would be too long.
pub fn split_by_row_count(
    dataset: &Dataset,
    rows_per_chunk: u64,
    name_prefix: &str,
) -> Result<Vec<Chunk>, AppError> {
    if rows_per_chunk == 0 {
        return Err(AppError::InvalidArgument(
            "Rows per file must be at least 1".to_string(),
        ));
    }

    let size = usize::try_from(rows_per_chunk).unwrap_or(usize::MAX);
    let total = dataset.len();
    let chunk_count = total.div_ceil(size);

    let chunks = (0..chunk_count)
        .map(|i| {
            let start = i * size;
            let end = start.saturating_add(size).min(total);
            Ok(Chunk::new(
                row_chunk_name(name_prefix, i)?,
                dataset.slice(start..end),
            ))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    debug!(
        total_rows = total,
        rows_per_chunk,
        chunk_count = chunks.len(),
        "Split by row count"
    );

    Ok(chunks)
}

/// Splits a dataset into one chunk per distinct value of `column`.
///
/// Chunks come out in first-seen order of their value and keep the source
/// row order inside. Missing values form a single group named with
/// `(null)`. Chunk names are `{name_prefix}_{value}.csv` with both parts
/// escaped.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` if `column` is not a column of the
/// dataset or a chunk name would be too long. No chunks are returned on
/// error.
pub fn split_by_column_value(
    dataset: &Dataset,
    column: &str,
    name_prefix: &str,
) -> Result<Vec<Chunk>, AppError> {
    let index = dataset.column_index(column).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "Column '{}' is not in the file. Available columns: {}",
            column,
            dataset.column_names().join(", ")
        ))
    })?;

    let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<Option<String>, usize> = HashMap::new();

    for (position, row) in dataset.rows().iter().enumerate() {
        let key = row[index].group_key();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(position);
    }

    let chunks = groups
        .iter()
        .map(|(key, positions)| {
            Ok(Chunk::new(
                group_chunk_name(name_prefix, key.as_deref())?,
                dataset.take(positions),
            ))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    debug!(
        total_rows = dataset.len(),
        column,
        chunk_count = chunks.len(),
        "Split by column value"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::text_dataset;
    use crate::dataset::{load_csv, Value};

    fn numbered(n: usize) -> Dataset {
        let mut csv = String::from("id,name\n");
        for i in 0..n {
            csv.push_str(&format!("{},name{}\n", i, i));
        }
        load_csv(csv.as_bytes()).unwrap()
    }

    fn regions() -> Dataset {
        text_dataset(
            &["id", "region"],
            &[
                &["1", "A"],
                &["2", "B"],
                &["3", "A"],
                &["4", "C"],
                &["5", "B"],
            ],
        )
    }

    #[test]
    fn test_five_rows_by_two() {
        let chunks = split_by_row_count(&numbered(5), 2, "output").unwrap();

        let names: Vec<&str> = chunks.iter().map(|c| c.file_name()).collect();
        assert_eq!(
            names,
            vec!["output_rows_0.csv", "output_rows_1.csv", "output_rows_2.csv"]
        );
        let sizes: Vec<usize> = chunks.iter().map(|c| c.row_count()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_row_chunks_concatenate_back_to_source() {
        let source = numbered(23);
        for rows_per_chunk in [1u64, 2, 3, 7, 22, 23, 24, 1000] {
            let chunks = split_by_row_count(&source, rows_per_chunk, "p").unwrap();

            let rebuilt: Vec<_> = chunks
                .iter()
                .flat_map(|c| c.data().rows().to_vec())
                .collect();
            assert_eq!(rebuilt, source.rows(), "r = {}", rows_per_chunk);

            let (last, full) = chunks.split_last().unwrap();
            assert!(full
                .iter()
                .all(|c| c.row_count() as u64 == rows_per_chunk));
            assert!(last.row_count() as u64 <= rows_per_chunk);
            assert!(chunks.iter().all(|c| c.data().columns() == source.columns()));
        }
    }

    #[test]
    fn test_empty_dataset_yields_no_chunks() {
        let chunks = split_by_row_count(&numbered(0), 10, "output").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_zero_rows_per_chunk_is_invalid() {
        let err = split_by_row_count(&numbered(3), 0, "output").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_region_groups_in_first_seen_order() {
        let chunks = split_by_column_value(&regions(), "region", "output").unwrap();

        let summary: Vec<(&str, usize)> = chunks
            .iter()
            .map(|c| (c.file_name(), c.row_count()))
            .collect();
        assert_eq!(
            summary,
            vec![("output_A.csv", 2), ("output_B.csv", 2), ("output_C.csv", 1)]
        );

        let a_ids: Vec<&Value> = chunks[0].data().rows().iter().map(|r| &r[0]).collect();
        assert_eq!(
            a_ids,
            vec![&Value::Text("1".into()), &Value::Text("3".into())]
        );
    }

    #[test]
    fn test_groups_partition_the_source() {
        let source = regions();
        let chunks = split_by_column_value(&source, "region", "output").unwrap();

        let total: usize = chunks.iter().map(|c| c.row_count()).sum();
        assert_eq!(total, source.len());

        for chunk in &chunks {
            let first = &chunk.data().rows()[0][1];
            assert!(chunk.data().rows().iter().all(|r| &r[1] == first));
        }

        for row in source.rows() {
            let holders = chunks
                .iter()
                .filter(|c| c.data().rows().contains(row))
                .count();
            assert_eq!(holders, 1);
        }
    }

    #[test]
    fn test_missing_values_form_one_null_group() {
        let ds = text_dataset(
            &["id", "channel"],
            &[&["1", "email"], &["2", ""], &["3", "NA"], &["4", "email"]],
        );
        let chunks = split_by_column_value(&ds, "channel", "leads").unwrap();

        let summary: Vec<(&str, usize)> = chunks
            .iter()
            .map(|c| (c.file_name(), c.row_count()))
            .collect();
        assert_eq!(
            summary,
            vec![("leads_email.csv", 2), ("leads_(null).csv", 2)]
        );
    }

    #[test]
    fn test_unsafe_group_values_are_escaped() {
        let ds = text_dataset(&["path"], &[&["../../etc"], &["a/b"]]);
        let chunks = split_by_column_value(&ds, "path", "out").unwrap();

        assert_eq!(chunks[0].file_name(), "out_..%2F..%2Fetc.csv");
        assert_eq!(chunks[1].file_name(), "out_a%2Fb.csv");
        assert!(chunks.iter().all(|c| !c.file_name().contains('/')));
    }

    #[test]
    fn test_typed_group_values_render_in_names() {
        let ds = load_csv(b"id,tier\n1,1\n2,2\n3,1\n").unwrap();
        let chunks = split_by_column_value(&ds, "tier", "out").unwrap();
        let names: Vec<&str> = chunks.iter().map(|c| c.file_name()).collect();
        assert_eq!(names, vec!["out_1.csv", "out_2.csv"]);
    }

    #[test]
    fn test_signed_zero_floats_group_together() {
        let ds = load_csv(b"id,delta\n1,0.0\n2,-0.0\n3,1.5\n").unwrap();
        let chunks = split_by_column_value(&ds, "delta", "out").unwrap();

        let summary: Vec<(&str, usize)> = chunks
            .iter()
            .map(|c| (c.file_name(), c.row_count()))
            .collect();
        assert_eq!(summary, vec![("out_0.0.csv", 2), ("out_1.5.csv", 1)]);
    }

    #[test]
    fn test_unknown_column_is_invalid() {
        let err = split_by_column_value(&regions(), "country", "output").unwrap_err();
        match err {
            AppError::InvalidArgument(msg) => {
                assert!(msg.contains("country"));
                assert!(msg.contains("region"));
            }
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_overlong_group_name_fails_whole_split() {
        let long = "x".repeat(300);
        let ds = text_dataset(&["k"], &[&["short"], &[long.as_str()]]);
        assert!(split_by_column_value(&ds, "k", "out").is_err());
    }

    // ── Properties ──────────────────────────────────────────────────────────

    mod properties {
        use super::*;
        use crate::dataset::{Column, ColumnType, Record};
        use proptest::prelude::*;
        use std::collections::HashSet;

        /// Group cells drawn from a small alphabet so values repeat; `None` is a null.
        fn group_cells() -> impl Strategy<Value = Vec<Option<String>>> {
            prop::collection::vec(
                prop_oneof![
                    4 => "[a-d]".prop_map(Some),
                    1 => Just(None),
                ],
                0..60,
            )
        }

        /// `id` is the row position, so every row is distinguishable.
        fn dataset_of(groups: &[Option<String>]) -> Dataset {
            let columns = vec![
                Column::new("id", ColumnType::Integer),
                Column::new("group", ColumnType::Text),
            ];
            let rows = groups
                .iter()
                .enumerate()
                .map(|(i, g)| {
                    vec![
                        Value::Integer(i as i64),
                        g.clone().map(Value::Text).unwrap_or(Value::Null),
                    ]
                })
                .collect();
            Dataset::new(columns, rows).unwrap()
        }

        fn ids(chunk: &Chunk) -> Vec<Value> {
            chunk.data().rows().iter().map(|r| r[0].clone()).collect()
        }

        proptest! {
            #[test]
            fn row_chunks_rebuild_the_source_in_order(
                groups in group_cells(),
                rows_per_chunk in 1u64..80,
            ) {
                let source = dataset_of(&groups);
                let chunks = split_by_row_count(&source, rows_per_chunk, "p").unwrap();

                let expected_chunks = source.len().div_ceil(rows_per_chunk as usize);
                prop_assert_eq!(chunks.len(), expected_chunks);

                let rebuilt: Vec<Record> = chunks
                    .iter()
                    .flat_map(|c| c.data().rows().to_vec())
                    .collect();
                prop_assert_eq!(rebuilt.as_slice(), source.rows());

                if let Some((last, full)) = chunks.split_last() {
                    for chunk in full {
                        prop_assert_eq!(chunk.row_count() as u64, rows_per_chunk);
                    }
                    prop_assert!(last.row_count() >= 1);
                    prop_assert!(last.row_count() as u64 <= rows_per_chunk);
                }
            }

            #[test]
            fn group_chunks_partition_the_source(groups in group_cells()) {
                let source = dataset_of(&groups);
                let chunks = split_by_column_value(&source, "group", "p").unwrap();

                let mut seen_keys = HashSet::new();
                let mut all_ids = Vec::new();
                for chunk in &chunks {
                    prop_assert!(chunk.row_count() >= 1);

                    let keys: HashSet<Option<String>> =
                        chunk.data().rows().iter().map(|r| r[1].group_key()).collect();
                    prop_assert_eq!(keys.len(), 1);
                    let key = keys.into_iter().next().unwrap();
                    prop_assert!(seen_keys.insert(key));

                    let chunk_ids = ids(chunk);
                    let mut sorted = chunk_ids.clone();
                    sorted.sort_by_key(|v| match v {
                        Value::Integer(i) => *i,
                        _ => i64::MAX,
                    });
                    prop_assert_eq!(&chunk_ids, &sorted);
                    all_ids.extend(chunk_ids);
                }

                prop_assert_eq!(all_ids.len(), source.len());
                let distinct: HashSet<String> = all_ids.iter().map(Value::render).collect();
                prop_assert_eq!(distinct.len(), source.len());

                let distinct_groups: HashSet<Option<String>> =
                    source.rows().iter().map(|r| r[1].group_key()).collect();
                prop_assert_eq!(chunks.len(), distinct_groups.len());
            }
        }
    }
}
