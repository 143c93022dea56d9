//! Integration test: scripted page → harvest loop → CSV file.
//!
//! Drives the full loop against in-memory fakes with tokio's paused clock, so
//! every stability wait and extraction timeout resolves instantly.

use std::time::Duration;

use review_harvest::stability::StabilityOutcome;
use review_harvest::testing::{review_for, ScriptedExtractor, ScriptedPage};
use review_harvest::{
    CsvFileSink, DedupStrategy, HarvestConfig, HarvestError, HarvestPhase, Harvester,
};

fn ids(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn config() -> HarvestConfig {
    HarvestConfig::builder()
        .wait_timeout(Duration::from_secs(10))
        .poll_interval(Duration::from_millis(500))
        .max_scroll_attempts(5)
        .max_consecutive_empty(3)
        .concurrency(5)
        .build()
}

#[tokio::test(start_paused = true)]
async fn failed_item_is_skipped_and_rest_reach_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.csv");

    let page = ScriptedPage::new(ids(12)).with_scroll_targets([12]);
    let extractor = ScriptedExtractor::new().failing([11]);
    let harvester = Harvester::new(page, extractor, config());

    let report = harvester
        .run(&CsvFileSink::new(&path, 2000))
        .await
        .unwrap();

    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    assert_eq!(report.reviews.len(), 11);
    assert!(!report.reviews.contains(&review_for(11)));
    // One productive cycle, then the failing item alone three times.
    assert_eq!(report.cycles.len(), 4);
    assert!(report.cycles[1..].iter().all(|c| c.tail_len == 1 && c.failed == 1));

    let csv = std::fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 12);
    assert!(csv.starts_with("\"Дата публикации\""));
}

#[tokio::test(start_paused = true)]
async fn committed_count_tracks_collected_reviews() {
    let page = ScriptedPage::new(ids(40))
        .with_initial_visible(8)
        .with_scroll_targets([16, 25, 40])
        .with_render_step(3);
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester.harvest().await;

    let mut running = 0;
    for cycle in &report.cycles {
        running += cycle.new_reviews;
        assert_eq!(cycle.committed, running);
    }
    assert_eq!(report.session.committed, report.reviews.len());
    assert_eq!(report.reviews.len(), 40);

    let expected: Vec<_> = (0..40).map(review_for).collect();
    assert_eq!(report.reviews, expected);
}

#[tokio::test(start_paused = true)]
async fn endless_growth_stops_at_attempt_limit() {
    let page = ScriptedPage::new(ids(100))
        .with_scroll_targets((1..=10).map(|step| step * 10));
    let config = HarvestConfig::builder().max_scroll_attempts(3).build();
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config);

    let report = harvester.harvest().await;

    assert_eq!(report.session.phase, HarvestPhase::Aborted);
    assert_eq!(report.session.attempts, 3);
    assert_eq!(report.reviews.len(), 30);
    assert_eq!(harvester.source().scroll_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn static_list_is_exhausted_after_empty_cycles() {
    let page = ScriptedPage::new(ids(5)).with_initial_visible(5);
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester.harvest().await;

    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    assert_eq!(report.session.attempts, 4);
    assert_eq!(report.reviews.len(), 5);
    assert!(report.cycles[0].stability.is_settled());
    assert!(report.cycles[1..]
        .iter()
        .all(|c| c.stability == StabilityOutcome::NoGrowth && c.new_reviews == 0));
}

#[tokio::test(start_paused = true)]
async fn end_of_list_hint_settles_harvest() {
    let page = ScriptedPage::new(ids(20))
        .with_initial_visible(10)
        .with_scroll_targets([20])
        .with_render_step(5)
        .with_end_of_list();
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester.harvest().await;

    assert_eq!(report.session.phase, HarvestPhase::Settled);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].stability, StabilityOutcome::Settled { count: 20 });
    assert_eq!(report.reviews.len(), 20);
}

#[tokio::test(start_paused = true)]
async fn failed_handle_read_counts_as_empty_cycle() {
    let page = ScriptedPage::new(ids(3))
        .with_initial_visible(3)
        .with_failing_reads(1);
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester.harvest().await;

    assert_eq!(report.cycles[0].tail_len, 0);
    assert_eq!(report.cycles[0].new_reviews, 0);
    assert_eq!(report.cycles[0].committed, 0);
    // The next cycle reads the full list and picks up every item.
    assert_eq!(report.cycles[1].new_reviews, 3);
    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    assert_eq!(report.reviews, ids(3).into_iter().map(review_for).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn failing_scrolls_exhaust_without_new_reviews() {
    let page = ScriptedPage::new(ids(10))
        .with_initial_visible(4)
        .with_scroll_targets([10])
        .with_failing_scrolls();
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester.harvest().await;

    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    assert_eq!(report.reviews.len(), 4);
    assert_eq!(harvester.source().scroll_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn positional_window_repeats_item_after_middle_failure() {
    let page = ScriptedPage::new(ids(5)).with_initial_visible(5);
    let extractor = ScriptedExtractor::new().flaky([2]);
    let config = HarvestConfig::builder().max_scroll_attempts(10).build();
    let harvester = Harvester::new(page, extractor, config);

    let report = harvester.harvest().await;

    let repeats = report
        .reviews
        .iter()
        .filter(|r| **r == review_for(4))
        .count();
    assert_eq!(repeats, 2);
    assert!(!report.reviews.contains(&review_for(2)));
    assert_eq!(report.reviews.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn content_key_dedup_filters_repeated_item() {
    let page = ScriptedPage::new(ids(5)).with_initial_visible(5);
    let extractor = ScriptedExtractor::new().flaky([2]);
    let config = HarvestConfig::builder()
        .max_scroll_attempts(10)
        .dedup(DedupStrategy::ContentKey)
        .build();
    let harvester = Harvester::new(page, extractor, config);

    let report = harvester.harvest().await;

    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    let expected: Vec<_> = [0, 1, 3, 4].into_iter().map(review_for).collect();
    assert_eq!(report.reviews, expected);
    assert_eq!(report.cycles[1].duplicates, 1);
    assert_eq!(report.cycles[1].new_reviews, 0);
}

#[tokio::test(start_paused = true)]
async fn unwritable_output_reports_lost_reviews() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened as a file.
    let sink = CsvFileSink::new(dir.path(), 2000);

    let page = ScriptedPage::new(ids(3)).with_initial_visible(3);
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let err = harvester.run(&sink).await.unwrap_err();
    match err {
        HarvestError::SinkWrite { lost, path, .. } => {
            assert_eq!(lost, 3);
            assert_eq!(path.as_path(), dir.path());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn empty_harvest_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.csv");

    let page = ScriptedPage::new(ids(0));
    let harvester = Harvester::new(page, ScriptedExtractor::new(), config());

    let report = harvester
        .run(&CsvFileSink::new(&path, 2000))
        .await
        .unwrap();

    assert!(report.reviews.is_empty());
    assert_eq!(report.session.phase, HarvestPhase::Exhausted);
    assert!(!path.exists());
}
