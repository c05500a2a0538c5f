//! Property and behavior tests for the in-memory vector index.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use ragdesk_core::{InMemoryVectorIndex, Metadata, RagError, VectorIndex};

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-3 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate records with unique ids.
fn arb_records(dim: usize) -> impl Strategy<Value = Vec<(String, Vec<f32>)>> {
    proptest::collection::vec(("[a-z]{3,8}", arb_normalized_embedding(dim)), 1..20).prop_map(
        |records| {
            let mut seen = HashSet::new();
            records.into_iter().filter(|(id, _)| seen.insert(id.clone())).collect()
        },
    )
}

fn split(
    records: &[(String, Vec<f32>)],
) -> (Vec<String>, Vec<String>, Vec<Vec<f32>>, Vec<Metadata>) {
    let ids = records.iter().map(|(id, _)| id.clone()).collect();
    let contents = records.iter().map(|(id, _)| format!("content of {id}")).collect();
    let embeddings = records.iter().map(|(_, e)| e.clone()).collect();
    let metadatas = records.iter().map(|_| Metadata::new()).collect();
    (ids, contents, embeddings, metadatas)
}

/// *For any* set of stored records and query, results are ordered by ascending
/// cosine distance, bounded by `top_k`, and every distance lies in `[0, 2]`.
mod prop_query_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_top_k(
            records in arb_records(DIM),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..12,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new("test", DIM);
                let (ids, contents, embeddings, metadatas) = split(&records);
                index.upsert_batch(ids, contents, embeddings, metadatas).await.unwrap();
                index.query(&query, top_k).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(records.len()));
            for hit in &results {
                prop_assert!((0.0..=2.0).contains(&hit.distance));
            }
            for window in results.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }
        }

        #[test]
        fn stored_embedding_is_its_own_nearest_neighbor(
            records in arb_records(DIM),
            pick in any::<prop::sample::Index>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (target, embedding) = records[pick.index(records.len())].clone();
            let top = rt.block_on(async {
                let index = InMemoryVectorIndex::new("test", DIM);
                let (ids, contents, embeddings, metadatas) = split(&records);
                index.upsert_batch(ids, contents, embeddings, metadatas).await.unwrap();
                index.query(&embedding, 1).await.unwrap()
            });

            prop_assert_eq!(top.len(), 1);
            prop_assert!(top[0].distance < 1e-4);
            // Another record may point in exactly the same direction; it then
            // wins only by being inserted earlier.
            if top[0].id != target {
                let winner = records.iter().position(|(id, _)| *id == top[0].id).unwrap();
                let target_pos = records.iter().position(|(id, _)| *id == target).unwrap();
                prop_assert!(winner < target_pos);
            }
        }

        #[test]
        fn batch_of_new_ids_grows_count_and_reset_empties(
            records in arb_records(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (after_first, after_batch, after_reset) = rt.block_on(async {
                let index = InMemoryVectorIndex::new("test", DIM);
                index
                    .upsert("seed-id-0".into(), "seed".into(), vec![1.0 / (DIM as f32).sqrt(); DIM], Metadata::new())
                    .await
                    .unwrap();
                let after_first = index.count().await.unwrap();
                let (ids, contents, embeddings, metadatas) = split(&records);
                index.upsert_batch(ids, contents, embeddings, metadatas).await.unwrap();
                let after_batch = index.count().await.unwrap();
                index.reset().await.unwrap();
                (after_first, after_batch, index.count().await.unwrap())
            });

            prop_assert_eq!(after_batch, after_first + records.len());
            prop_assert_eq!(after_reset, 0);
        }
    }
}

#[tokio::test]
async fn upsert_replaces_existing_id() {
    let index = InMemoryVectorIndex::new("docs", 2);
    index.upsert("a".into(), "old".into(), vec![1.0, 0.0], Metadata::new()).await.unwrap();
    let mut metadata = Metadata::new();
    metadata.insert("version".into(), serde_json::json!(2));
    index.upsert("a".into(), "new".into(), vec![0.0, 1.0], metadata.clone()).await.unwrap();

    assert_eq!(index.count().await.unwrap(), 1);
    let stored = index.get("a").await.unwrap().unwrap();
    assert_eq!(stored.content, "new");
    assert_eq!(stored.metadata, metadata);
    let hits = index.query(&[0.0, 1.0], 1).await.unwrap();
    assert_eq!(hits[0].id, "a");
    assert!(hits[0].distance < 1e-6);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let index = InMemoryVectorIndex::new("docs", 2);
    index
        .upsert_batch(
            vec!["a".into(), "b".into()],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![Metadata::new(), Metadata::new()],
        )
        .await
        .unwrap();

    assert!(index.delete("a").await.unwrap());
    let once = index.get_all().await.unwrap();
    assert!(!index.delete("a").await.unwrap());
    let twice = index.get_all().await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(index.count().await.unwrap(), 1);
    assert!(!index.delete("never-existed").await.unwrap());
}

#[tokio::test]
async fn length_mismatch_leaves_index_unchanged() {
    let index = InMemoryVectorIndex::new("docs", 2);
    index.upsert("keep".into(), "kept".into(), vec![1.0, 0.0], Metadata::new()).await.unwrap();

    let err = index
        .upsert_batch(
            vec!["x".into(), "y".into(), "z".into()],
            vec!["X".into(), "Y".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![Metadata::new(), Metadata::new(), Metadata::new()],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RagError::LengthMismatch { ids: 3, contents: 2, embeddings: 3, metadatas: 3 }
    ));
    assert_eq!(index.count().await.unwrap(), 1);
    let ids: Vec<_> = index.get_all().await.unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, ["keep"]);
}

#[tokio::test]
async fn query_with_wrong_dimension_is_rejected() {
    let index = InMemoryVectorIndex::new("docs", 3);
    let err = index.query(&[1.0, 0.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
}

#[tokio::test]
async fn get_all_follows_insertion_order() {
    let index = InMemoryVectorIndex::new("docs", 2);
    for id in ["c", "a", "b"] {
        index.upsert(id.into(), id.to_uppercase(), vec![1.0, 0.0], Metadata::new()).await.unwrap();
    }
    let ids: Vec<_> = index.get_all().await.unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, ["c", "a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_a_partial_batch() {
    const BATCH: usize = 50;
    let index = Arc::new(InMemoryVectorIndex::new("docs", 2));

    let writer = {
        let index = Arc::clone(&index);
        tokio::spawn(async move {
            for round in 0..20 {
                let ids = (0..BATCH).map(|i| format!("r{round}-{i}")).collect();
                let contents = (0..BATCH).map(|i| format!("doc {i}")).collect();
                let embeddings = (0..BATCH).map(|_| vec![1.0, 0.0]).collect();
                let metadatas = (0..BATCH).map(|_| Metadata::new()).collect();
                index.upsert_batch(ids, contents, embeddings, metadatas).await.unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let count = index.count().await.unwrap();
                    assert_eq!(count % BATCH, 0, "observed partial batch: {count}");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(index.count().await.unwrap(), 20 * BATCH);
}
