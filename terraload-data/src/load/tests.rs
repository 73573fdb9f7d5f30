//! Pipeline-level tests for `load_entities`.

use super::*;
use crate::sink::WriteOp;
use crate::sink::test_support::RecordingSink;
use crate::source::{RawInfo, RawNode, RawRelation, RawWay};
use rstest::{fixture, rstest};
use terraload_core::{ElementKind, IdentityKey};

fn node(id: i64, version: i32) -> RawRecord {
    RawRecord::Node(RawNode {
        id,
        info: RawInfo {
            version,
            ..RawInfo::default()
        },
        tags: vec![("name".into(), format!("node {id}"))],
        lat: 51.5,
        lon: -0.1,
    })
}

fn way(id: i64) -> RawRecord {
    RawRecord::Way(RawWay {
        id,
        info: RawInfo::default(),
        tags: Vec::new(),
        refs: vec![1, 2],
    })
}

fn hidden_relation(id: i64) -> RawRecord {
    RawRecord::Relation(RawRelation {
        id,
        info: RawInfo {
            visible: false,
            ..RawInfo::default()
        },
        tags: Vec::new(),
        members: Vec::new(),
    })
}

fn ok_records(records: Vec<RawRecord>) -> Vec<Result<RawRecord, SourceError>> {
    records.into_iter().map(Ok).collect()
}

#[fixture]
fn sink() -> Arc<RecordingSink> {
    Arc::new(RecordingSink::default())
}

#[rstest]
#[tokio::test]
async fn loads_selected_layers_as_inserts(sink: Arc<RecordingSink>) {
    let config = LoadConfig {
        block_size: 2,
        layers: LayerSet::none()
            .with(ElementKind::Point)
            .with(ElementKind::Path),
        ..LoadConfig::default()
    };
    let records = ok_records(vec![node(1, 1), way(2), hidden_relation(3)]);

    let summary = load_entities(records, sink.clone(), &config)
        .await
        .expect("load succeeds");

    let operations = sink.operations();
    assert_eq!(operations.len(), 2);
    assert!(operations.iter().all(|op| matches!(op, WriteOp::Insert(_))));
    let mut keys: Vec<_> = operations.iter().map(WriteOp::key).collect();
    keys.sort_by_key(|key| key.id);
    assert_eq!(
        keys,
        vec![
            IdentityKey::new(1, ElementKind::Point),
            IdentityKey::new(2, ElementKind::Path),
        ]
    );
    assert!(sink.calls() <= 2);
    assert_eq!(summary.dispatch.seen, 3);
    assert_eq!(summary.dispatch.skipped_layer, 1);
    assert_eq!(summary.dispatch.skipped_hidden, 0, "layer filter runs first");
    assert_eq!(summary.dispatch.relations, 0);
    assert_eq!(summary.written(), 2);
}

#[rstest]
#[case(1, 1)]
#[case(3, 4)]
#[case(8, 7)]
#[tokio::test]
async fn batches_never_exceed_the_block_size(
    sink: Arc<RecordingSink>,
    #[case] concurrency: usize,
    #[case] block_size: usize,
) {
    let config = LoadConfig {
        block_size,
        concurrency,
        ..LoadConfig::default()
    };
    let records = ok_records((1..=50).map(|id| node(id, 1)).collect());

    let summary = load_entities(records, sink.clone(), &config)
        .await
        .expect("load succeeds");

    assert!(sink.batches().iter().all(|batch| batch.len() <= block_size));
    assert_eq!(sink.operations().len(), 50);
    assert_eq!(summary.operations(), summary.dispatch.dispatched());
    assert_eq!(summary.workers.len(), concurrency);
}

#[rstest]
#[tokio::test]
async fn incremental_mode_keeps_per_key_order(sink: Arc<RecordingSink>) {
    let config = LoadConfig {
        mode: LoadMode::Incremental,
        block_size: 1,
        concurrency: 4,
        ..LoadConfig::default()
    };
    let records = ok_records(vec![node(5, 1), way(6), node(5, 2), node(5, 3)]);

    load_entities(records, sink.clone(), &config)
        .await
        .expect("load succeeds");

    let versions: Vec<_> = sink
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            WriteOp::UpsertByKey { key, document } if key.id == 5 => Some(document.key.version),
            _ => None,
        })
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[rstest]
#[tokio::test]
async fn hidden_records_are_not_written(sink: Arc<RecordingSink>) {
    let mut hidden = node(2, 1);
    if let RawRecord::Node(raw) = &mut hidden {
        raw.info.visible = false;
    }
    let records = ok_records(vec![node(1, 1), hidden]);

    let summary = load_entities(records, sink.clone(), &LoadConfig::default())
        .await
        .expect("load succeeds");

    assert_eq!(summary.dispatch.skipped_hidden, 1);
    assert_eq!(sink.operations().len(), 1);
}

#[rstest]
#[tokio::test]
async fn source_failure_still_flushes_buffered_entities(sink: Arc<RecordingSink>) {
    let records = vec![
        Ok(node(1, 1)),
        Ok(node(2, 1)),
        Err(SourceError::Other {
            message: "unexpected end of blob".into(),
        }),
        Ok(node(3, 1)),
    ];

    let outcome = load_entities(records, sink.clone(), &LoadConfig::default()).await;

    assert!(matches!(outcome, Err(LoadError::Source(_))));
    let mut ids: Vec<_> = sink.operations().iter().map(|op| op.key().id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[rstest]
#[tokio::test]
async fn sink_failure_fails_the_load() {
    let sink = Arc::new(RecordingSink::failing_on_call(0));
    let config = LoadConfig {
        block_size: 2,
        concurrency: 1,
        ..LoadConfig::default()
    };
    let records = ok_records((1..=20).map(|id| node(id, 1)).collect());

    let outcome = load_entities(records, sink.clone(), &config).await;

    assert!(
        matches!(outcome, Err(LoadError::Sink { worker: 0, .. })),
        "expected sink failure, got {outcome:?}"
    );
    assert_eq!(sink.calls(), 1);
}

#[rstest]
#[case(LoadConfig { block_size: 0, ..LoadConfig::default() }, LoadConfigError::ZeroBlockSize)]
#[case(LoadConfig { concurrency: 0, ..LoadConfig::default() }, LoadConfigError::ZeroConcurrency)]
#[case(LoadConfig { layers: LayerSet::none(), ..LoadConfig::default() }, LoadConfigError::NoLayers)]
#[case(
    LoadConfig { queue_capacity: Some(0), ..LoadConfig::default() },
    LoadConfigError::ZeroQueueCapacity
)]
#[case(
    LoadConfig { block_size: usize::MAX, concurrency: 1, ..LoadConfig::default() },
    LoadConfigError::QueueCapacityTooLarge { capacity: usize::MAX, max: MAX_QUEUE_CAPACITY }
)]
#[case(
    LoadConfig { queue_capacity: Some(MAX_QUEUE_CAPACITY + 1), ..LoadConfig::default() },
    LoadConfigError::QueueCapacityTooLarge {
        capacity: MAX_QUEUE_CAPACITY + 1,
        max: MAX_QUEUE_CAPACITY,
    }
)]
#[tokio::test]
async fn rejects_unusable_configuration(
    sink: Arc<RecordingSink>,
    #[case] config: LoadConfig,
    #[case] expected: LoadConfigError,
) {
    let outcome = load_entities(ok_records(vec![node(1, 1)]), sink.clone(), &config).await;
    assert!(matches!(outcome, Err(LoadError::Config(found)) if found == expected));
    assert_eq!(sink.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn huge_block_size_with_a_bounded_queue_flushes_once(sink: Arc<RecordingSink>) {
    let config = LoadConfig {
        block_size: 1 << 58,
        concurrency: 2,
        queue_capacity: Some(8),
        ..LoadConfig::default()
    };
    let records = ok_records((1..=30).map(|id| node(id, 1)).collect());

    let summary = load_entities(records, sink.clone(), &config)
        .await
        .expect("load succeeds");

    assert_eq!(summary.operations(), 30);
    let loaded_workers = summary.workers.iter().filter(|w| w.operations > 0).count();
    assert_eq!(sink.calls(), loaded_workers, "one terminal flush per loaded worker");
}

#[rstest]
fn queue_capacity_defaults_to_block_size() {
    let config = LoadConfig {
        block_size: 250,
        ..LoadConfig::default()
    };
    assert_eq!(config.queue_capacity(), 250);
    let explicit = LoadConfig {
        queue_capacity: Some(8),
        ..config
    };
    assert_eq!(explicit.queue_capacity(), 8);
}
