//! Integration tests for the validation pipeline
//!
//! Drives the real queue, requeue scheduler, credential pool, cache and
//! worker together, with the external lookup and the review sink mocked.
//!
//! Run with: cargo test --test validation_pipeline_test

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use soso::search::SearchHit;
use soso::validation::{
    spawn_requeue_scheduler, spawn_validation_worker, Credential, CredentialPool, HandleLookup, LookupOutcome,
    ReviewSink, ValidationCache, ValidationJob, ValidationQueue, ValidationWorker, WorkerConfig,
};

/// Lookup double that replays a script of outcomes and records every call.
struct ScriptedLookup {
    outcomes: Mutex<VecDeque<LookupOutcome>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLookup {
    fn new(outcomes: Vec<LookupOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandleLookup for ScriptedLookup {
    async fn lookup(&self, credential: &Credential, handle: &str) -> LookupOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((credential.token().to_string(), handle.to_string()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(LookupOutcome::Found)
    }
}

/// Review sink double that records the flagged hits.
#[derive(Default)]
struct RecordingSink {
    notified: Mutex<Vec<SearchHit>>,
}

impl RecordingSink {
    fn notified_handles(&self) -> Vec<String> {
        self.notified
            .lock()
            .unwrap()
            .iter()
            .filter_map(|h| h.handle().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ReviewSink for RecordingSink {
    async fn notify(&self, hit: &SearchHit) {
        self.notified.lock().unwrap().push(hit.clone());
    }
}

fn hit(username: &str) -> SearchHit {
    SearchHit {
        id: Some(serde_json::json!(format!("doc-{}", username))),
        username: Some(username.to_string()),
        title: Some(format!("Title of {}", username)),
        ..Default::default()
    }
}

fn fast_config() -> WorkerConfig {
    WorkerConfig {
        lookup_interval: Duration::from_millis(5),
        requeue_delay: Duration::from_millis(5),
        credential_cooldown: Duration::from_millis(250),
        max_attempts: 3,
    }
}

struct Pipeline {
    pool: Arc<CredentialPool>,
    cache: Arc<ValidationCache>,
    queue: ValidationQueue,
    lookup: Arc<ScriptedLookup>,
    sink: Arc<RecordingSink>,
}

fn start_pipeline(tokens: &[&str], outcomes: Vec<LookupOutcome>) -> Pipeline {
    let pool = Arc::new(CredentialPool::new(tokens.iter().map(|t| t.to_string()).collect()));
    let cache = Arc::new(ValidationCache::new(Duration::from_secs(60)));
    let (queue, job_rx) = ValidationQueue::with_capacity(Arc::clone(&cache), 16);
    let requeue_tx = spawn_requeue_scheduler(queue.sender());

    let lookup = ScriptedLookup::new(outcomes);
    let sink = Arc::new(RecordingSink::default());

    let worker = ValidationWorker::new(
        Arc::clone(&pool),
        Arc::clone(&cache),
        Arc::clone(&lookup) as Arc<dyn HandleLookup>,
        Arc::clone(&sink) as Arc<dyn ReviewSink>,
        job_rx,
        requeue_tx,
        fast_config(),
    );
    spawn_validation_worker(worker);

    Pipeline {
        pool,
        cache,
        queue,
        lookup,
        sink,
    }
}

/// Polls `cond` until it holds or the deadline passes.
async fn wait_for(cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn valid_handle_is_cached_after_one_lookup() {
    let p = start_pipeline(&["tok-a"], vec![LookupOutcome::Found]);

    p.queue.enqueue(ValidationJob::new(hit("alive_chat")));

    let cache = Arc::clone(&p.cache);
    wait_for(move || cache.is_fresh("alive_chat")).await;

    assert!(p.cache.lookup("alive_chat").unwrap().is_valid);
    assert_eq!(p.lookup.calls().len(), 1);
    assert!(p.sink.notified_handles().is_empty());
}

#[tokio::test]
async fn fresh_cache_entry_short_circuits_the_lookup() {
    let p = start_pipeline(&["tok-a"], vec![]);
    p.cache.store("cached_chat", true);

    p.queue.enqueue_hits(&[hit("cached_chat")]);
    sleep(Duration::from_millis(100)).await;

    // No external call was made for the cached handle.
    assert!(p.lookup.calls().is_empty());
}

#[tokio::test]
async fn stale_cache_entry_is_revalidated() {
    let pool = Arc::new(CredentialPool::new(vec!["tok-a".to_string()]));
    // TTL short enough to go stale between store and processing.
    let cache = Arc::new(ValidationCache::new(Duration::from_millis(10)));
    let (queue, job_rx) = ValidationQueue::with_capacity(Arc::clone(&cache), 16);
    let requeue_tx = spawn_requeue_scheduler(queue.sender());
    let lookup = ScriptedLookup::new(vec![LookupOutcome::Found]);
    let sink = Arc::new(RecordingSink::default());
    let worker = ValidationWorker::new(
        pool,
        Arc::clone(&cache),
        Arc::clone(&lookup) as Arc<dyn HandleLookup>,
        sink as Arc<dyn ReviewSink>,
        job_rx,
        requeue_tx,
        fast_config(),
    );
    spawn_validation_worker(worker);

    cache.store("old_chat", false);
    sleep(Duration::from_millis(30)).await;
    assert!(!cache.is_fresh("old_chat"));

    queue.enqueue_hits(&[hit("old_chat")]);
    let lookup_probe = Arc::clone(&lookup);
    wait_for(move || !lookup_probe.calls().is_empty()).await;

    assert_eq!(lookup.calls().len(), 1);
}

#[tokio::test]
async fn dead_handle_is_flagged_for_review() {
    let p = start_pipeline(&["tok-a"], vec![LookupOutcome::NotFound]);

    p.queue.enqueue(ValidationJob::new(hit("dead_chat")));

    let sink = Arc::clone(&p.sink);
    wait_for(move || !sink.notified_handles().is_empty()).await;

    assert_eq!(p.sink.notified_handles(), vec!["dead_chat".to_string()]);
    let entry = p.cache.lookup("dead_chat").unwrap();
    assert!(!entry.is_valid);
}

#[tokio::test]
async fn handle_with_path_suffix_is_normalized_before_lookup() {
    let p = start_pipeline(&["tok-a"], vec![LookupOutcome::Found]);

    p.queue.enqueue(ValidationJob::new(hit("CCTAV1/16077")));

    let lookup_probe = Arc::clone(&p.lookup);
    wait_for(move || !lookup_probe.calls().is_empty()).await;

    assert_eq!(p.lookup.calls()[0].1, "CCTAV1");
    assert!(p.cache.is_fresh("CCTAV1"));
}

#[tokio::test]
async fn rate_limit_suspends_credential_and_requeues_once() {
    let p = start_pipeline(&["tok-a", "tok-b"], vec![LookupOutcome::RateLimited, LookupOutcome::Found]);

    p.queue.enqueue(ValidationJob::new(hit("busy_chat")));

    let cache = Arc::clone(&p.cache);
    wait_for(move || cache.is_fresh("busy_chat")).await;

    // Exactly one requeue: two lookups total, second with the other credential.
    let calls = p.lookup.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "tok-a");
    assert_eq!(calls[1].0, "tok-b");

    // tok-a is suspended for the cooldown window, so the pool keeps handing
    // out tok-b.
    assert_eq!(p.pool.next().unwrap().token(), "tok-b");
    assert_eq!(p.pool.next().unwrap().token(), "tok-b");
}

#[tokio::test]
async fn unauthorized_revokes_credential_and_retries_immediately() {
    let p = start_pipeline(&["bad-tok", "good-tok"], vec![LookupOutcome::Unauthorized, LookupOutcome::Found]);

    p.queue.enqueue(ValidationJob::new(hit("somewhere")));

    let cache = Arc::clone(&p.cache);
    wait_for(move || cache.is_fresh("somewhere")).await;

    let calls = p.lookup.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "bad-tok");
    assert_eq!(calls[1].0, "good-tok");

    // The bad credential is gone for good.
    for _ in 0..5 {
        assert_eq!(p.pool.next().unwrap().token(), "good-tok");
    }
}

#[tokio::test]
async fn attempt_cap_converts_to_terminal_drop() {
    // Every lookup rate-limits; with max_attempts = 3 the job makes exactly
    // three attempts before it is dropped instead of looping forever.
    let p = start_pipeline(
        &["t1", "t2", "t3", "t4"],
        vec![
            LookupOutcome::RateLimited,
            LookupOutcome::RateLimited,
            LookupOutcome::RateLimited,
            LookupOutcome::RateLimited,
        ],
    );

    p.queue.enqueue(ValidationJob::new(hit("hopeless")));
    sleep(Duration::from_millis(500)).await;

    assert_eq!(p.lookup.calls().len(), 3);
    assert!(p.cache.lookup("hopeless").is_none());
}

#[tokio::test]
async fn other_errors_drop_without_retry() {
    let p = start_pipeline(&["tok-a"], vec![LookupOutcome::Other("boom".to_string())]);

    p.queue.enqueue(ValidationJob::new(hit("flaky")));
    sleep(Duration::from_millis(200)).await;

    assert_eq!(p.lookup.calls().len(), 1);
    assert!(p.cache.lookup("flaky").is_none());
    assert!(p.sink.notified_handles().is_empty());
}

#[tokio::test]
async fn empty_pool_drops_the_job_silently() {
    let p = start_pipeline(&[], vec![]);

    p.queue.enqueue(ValidationJob::new(hit("anychat")));
    sleep(Duration::from_millis(100)).await;

    assert!(p.lookup.calls().is_empty());
    assert!(p.cache.lookup("anychat").is_none());
}

#[tokio::test]
async fn hits_without_handles_are_never_queued() {
    let p = start_pipeline(&["tok-a"], vec![]);

    p.queue.enqueue_hits(&[SearchHit::default()]);
    sleep(Duration::from_millis(100)).await;

    assert!(p.lookup.calls().is_empty());
}
