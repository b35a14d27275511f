//! End-to-end behaviour of the batching engine against the in-memory sink

#![allow(clippy::unwrap_used, clippy::expect_used)]

use adn_common::types::record_from_pairs;
use adn_common::Record;
use adn_ingest::batch::{
    AssignmentMode, BatchProcessor, DrainOutcome, LaneExit, Lifecycle, ProcessorConfig,
    ProcessorError,
};
use adn_ingest::sink::MemorySink;
use std::sync::Arc;
use std::time::Duration;

fn record(i: usize) -> Record {
    record_from_pairs([("POS", i.to_string())])
}

fn pos(record: &Record) -> usize {
    record["POS"].as_str().unwrap().parse().unwrap()
}

fn config(batch_size: usize, workers: usize) -> ProcessorConfig {
    ProcessorConfig::new("vcf_index")
        .with_batch_size(batch_size)
        .with_num_workers(workers)
        .with_poll_interval(Duration::from_millis(5))
        .with_monitor_interval(Duration::from_millis(5))
}

async fn feed(processor: &BatchProcessor, n: usize) {
    for i in 0..n {
        processor.add_record(record(i), i + 1 == n).await.unwrap();
    }
}

#[tokio::test]
async fn test_seven_records_in_batches_of_three() {
    let sink = Arc::new(MemorySink::new());
    let processor = BatchProcessor::new(config(3, 2), sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 7).await;
    let report = processor.stop().await.unwrap();

    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(report.sealed_batches, 3);
    assert_eq!(report.flushed_batches, 3);
    assert_eq!(report.remaining_batches, 0);
    assert_eq!(processor.remaining_batches().await, 0);

    let mut sizes: Vec<usize> = sink.batches().iter().map(|b| b.records.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 3, 3]);
    assert_eq!(sink.record_count(), 7);
}

#[tokio::test]
async fn test_failure_on_third_flush_aborts_run() {
    let sink = Arc::new(MemorySink::new().failing_on_call(3));
    let processor = BatchProcessor::new(config(2, 2), sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 5).await;
    let err = processor.stop().await.unwrap_err();

    let (report, source) = match err {
        ProcessorError::Aborted { report, source } => (report, source),
        other => panic!("expected an aborted run, got {other:?}"),
    };

    assert_eq!(report.outcome, DrainOutcome::Failed);
    assert_eq!(report.sealed_batches, 3);
    assert_eq!(report.flushed_batches, 2);
    assert_eq!(report.remaining_batches, 1);
    assert_eq!(
        report.flushed_records + report.remaining_records,
        5,
        "every record is either sent or reported lost"
    );
    assert_eq!(source.collection, "vcf_index");
    assert_eq!(sink.write_count(), 2);
    assert_eq!(processor.lifecycle().await, Lifecycle::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_shorter_than_flush_time_leaves_remaining() {
    let sink = Arc::new(MemorySink::new().with_latency(Duration::from_millis(100)));
    let config = config(1, 1).with_timeout(Duration::from_millis(250));
    let processor = BatchProcessor::new(config, sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 10).await;
    let report = processor.stop().await.unwrap();

    assert_eq!(report.outcome, DrainOutcome::TimedOut);
    assert!(report.remaining_batches > 0);
    assert!(report.flushed_batches < 10);
    assert_eq!(report.flushed_batches + report.remaining_batches, 10);
    assert!(report.elapsed >= Duration::from_millis(250));
    assert_eq!(report.lanes[0].exit, LaneExit::TimedOut);
    assert!(report.abandoned_batches > 0);
    assert!(report.abandoned_batches <= report.remaining_batches);
    assert_eq!(
        report.lanes.iter().map(|l| l.abandoned_batches).sum::<u64>(),
        report.abandoned_batches
    );
    assert_eq!(processor.lifecycle().await, Lifecycle::TimedOut);
}

#[tokio::test]
async fn test_failure_stops_other_lanes_and_reports_lost_batches() {
    let sink = Arc::new(
        MemorySink::new()
            .with_latency(Duration::from_millis(5))
            .failing_on_call(3),
    );
    let processor = BatchProcessor::new(config(2, 3), sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 40).await;
    let report = match processor.stop().await.unwrap_err() {
        ProcessorError::Aborted { report, .. } => report,
        other => panic!("expected an aborted run, got {other:?}"),
    };

    assert_eq!(report.outcome, DrainOutcome::Failed);
    assert_eq!(report.sealed_batches, 20);
    assert_eq!(
        report.flushed_batches + report.remaining_batches,
        report.sealed_batches
    );
    assert_eq!(report.flushed_records + report.remaining_records, 40);
    assert!(report.remaining_batches > 0);

    // The failing lane returns the error; the other two report themselves
    assert_eq!(report.lanes.len(), 2);
    assert!(report.lanes.iter().all(|l| l.exit == LaneExit::Aborted));
    assert!(report.abandoned_batches > 0);
    assert!(report.abandoned_batches <= report.remaining_batches);
    assert_eq!(
        report.lanes.iter().map(|l| l.abandoned_batches).sum::<u64>(),
        report.abandoned_batches
    );
    assert!(report.lanes.iter().map(|l| l.flushed_batches).sum::<u64>() <= report.flushed_batches);
    assert_eq!(sink.write_count() as u64, report.flushed_batches);
}

#[tokio::test]
async fn test_sink_sees_exactly_the_submitted_records() {
    let sink = Arc::new(MemorySink::new().with_latency(Duration::from_millis(1)));
    let processor = BatchProcessor::new(config(7, 3), sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 100).await;
    let report = processor.stop().await.unwrap();
    assert!(report.is_complete());

    let mut seen: Vec<usize> = sink.records().iter().map(pos).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..100).collect::<Vec<_>>());

    // Within a batch records keep their submission order and are contiguous
    for batch in sink.batches() {
        let positions: Vec<usize> = batch.records.iter().map(pos).collect();
        assert!(positions.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(positions.len() == 7 || positions[0] == 98);
    }
}

#[tokio::test]
async fn test_run_returns_after_last_record() {
    let sink = Arc::new(MemorySink::new());
    let processor = Arc::new(BatchProcessor::new(config(4, 2), sink.clone()).unwrap());

    let producer = {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move { feed(&processor, 18).await })
    };

    let report = processor.run().await.unwrap();
    producer.await.unwrap();

    assert_eq!(report.records_received, 18);
    assert_eq!(report.flushed_records, 18);
    assert_eq!(sink.write_count(), 5);
}

#[tokio::test]
async fn test_one_shot_assignment_drains_with_fresh_lanes() {
    let sink = Arc::new(MemorySink::new());
    let config = config(2, 2).with_assignment(AssignmentMode::OneShot);
    let processor = BatchProcessor::new(config, sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 9).await;

    // Nothing reaches the sink until the drain pass hands the batches out
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sink.write_count(), 0);

    let report = processor.stop().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.flushed_batches, 5);
    assert_eq!(sink.record_count(), 9);
    // The first lane generation is retired by the drain pass
    assert_eq!(report.lanes.len(), 4);
    assert!(report.lanes.iter().all(|l| l.exit == LaneExit::Drained));
}

#[tokio::test]
async fn test_all_lanes_finish_after_stop() {
    let sink = Arc::new(MemorySink::new());
    let processor = BatchProcessor::new(config(5, 4), sink.clone()).unwrap();

    processor.start().await.unwrap();
    feed(&processor, 23).await;
    let report = processor.stop().await.unwrap();

    assert_eq!(report.lanes.len(), 4);
    assert!(report.lanes.iter().map(|l| l.flushed_batches).sum::<u64>() <= report.flushed_batches);
    assert_eq!(processor.remaining_batches().await, 0);
    assert!(processor.lifecycle().await.is_terminal());
}

#[tokio::test]
async fn test_batch_counts_for_various_sizes() {
    for (n, batch_size) in [(1, 1), (10, 3), (12, 4), (5, 10)] {
        let sink = Arc::new(MemorySink::new());
        let processor = BatchProcessor::new(config(batch_size, 2), sink.clone()).unwrap();

        processor.start().await.unwrap();
        feed(&processor, n).await;
        let report = processor.stop().await.unwrap();

        assert_eq!(report.sealed_batches as usize, n.div_ceil(batch_size));
        let full = sink
            .batches()
            .iter()
            .filter(|b| b.records.len() == batch_size)
            .count();
        assert_eq!(full, n / batch_size, "n={n} batch_size={batch_size}");
    }
}
