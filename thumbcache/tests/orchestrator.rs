//! End-to-end get-or-render behaviour against the in-memory backend.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thumbcache::backend::{Backend, BackendError, BackendStats, MemoryBackend};
use thumbcache::codec::{RecordKind, ThumbRecord};
use thumbcache::loader::{LoaderError, SourceLoader};
use thumbcache::orchestrator::{OrchestratorConfig, OrchestratorError, RenderMode, ThumbOrchestrator};
use thumbcache::placeholder::Placeholders;
use thumbcache::pool::PoolConfig;
use thumbcache::render::{RenderEngine, RenderLimits};
use thumbcache::request::RenderRequest;
use thumbcache::status::ServiceStatus;
use tokio::sync::{Notify, Semaphore};

/// Serves a fixed body or status, counting fetches. When gated, every load
/// blocks until the gate is opened.
#[derive(Clone)]
struct CountingLoader {
    response: Result<Vec<u8>, u16>,
    fetches: Arc<AtomicUsize>,
    started: Arc<Notify>,
    gate: Option<Arc<Semaphore>>,
}

impl CountingLoader {
    fn ok(body: Vec<u8>) -> Self {
        Self {
            response: Ok(body),
            fetches: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
            gate: None,
        }
    }

    fn status(code: u16) -> Self {
        Self {
            response: Err(code),
            ..Self::ok(Vec::new())
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SourceLoader for CountingLoader {
    async fn load(&self, identifier: &str) -> Result<Vec<u8>, LoaderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(LoaderError::Status {
                identifier: identifier.to_string(),
                status: *status,
            }),
        }
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// A backend that is always down.
struct DownBackend;

impl Backend for DownBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    async fn add_if_absent(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    fn stats(&self) -> BackendStats {
        BackendStats::default()
    }

    fn name(&self) -> &str {
        "down"
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn config(mode: RenderMode) -> OrchestratorConfig {
    OrchestratorConfig {
        mode,
        ..OrchestratorConfig::default()
    }
}

fn orchestrator<B: Backend>(
    loader: &CountingLoader,
    backend: Arc<B>,
    config: OrchestratorConfig,
) -> ThumbOrchestrator<CountingLoader, B> {
    ThumbOrchestrator::new(
        RenderEngine::new(loader.clone(), RenderLimits::default()),
        backend,
        Placeholders::new().unwrap(),
        Arc::new(ServiceStatus::new()),
        config,
    )
}

fn memory() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(16 * 1024 * 1024))
}

/// Polls until the stored record is no longer pending.
async fn wait_for_kind<L: SourceLoader, B: Backend>(
    orch: &ThumbOrchestrator<L, B>,
    path: &str,
    kind: RecordKind,
) -> ThumbRecord {
    for _ in 0..200 {
        let record = orch.get(path).await.unwrap();
        if record.kind == kind {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never became {:?}", path, kind);
}

const CAT: &str = "fit-in/100x100/example.com/cat.png";

#[tokio::test]
async fn test_wide_png_fits_box() {
    let loader = CountingLoader::ok(png(200, 100));
    let orch = orchestrator(&loader, memory(), config(RenderMode::Inline));

    let record = orch.get(CAT).await.unwrap();

    assert_eq!(record.kind, RecordKind::Rendered);
    assert_eq!((record.width, record.height), (100, 50));
    assert_eq!(record.mime, "image/png");
    let decoded = image::load_from_memory(&record.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 50));

    // Served from the backend afterwards
    let again = orch.get(CAT).await.unwrap();
    assert_eq!(again, record);
    assert_eq!(loader.fetches(), 1);
    assert_eq!(orch.status().snapshot().thumbs_generated, 1);
}

#[tokio::test]
async fn test_queued_second_request_sees_pending() {
    let loader = CountingLoader::ok(png(200, 100)).gated();
    let orch = orchestrator(&loader, memory(), config(RenderMode::Queued));

    let first = orch.get(CAT).await.unwrap();
    assert_eq!(first.kind, RecordKind::Pending);
    loader.started.notified().await;

    let second = orch.get(CAT).await.unwrap();
    assert_eq!(second.kind, RecordKind::Pending);

    loader.open();
    let done = wait_for_kind(&orch, CAT, RecordKind::Rendered).await;
    assert_eq!((done.width, done.height), (100, 50));
    assert_eq!(loader.fetches(), 1);

    orch.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queued_requests_fetch_once() {
    let loader = CountingLoader::ok(png(64, 64)).gated();
    let orch = Arc::new(orchestrator(&loader, memory(), config(RenderMode::Queued)));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.get(CAT).await })
        })
        .collect();
    for task in tasks {
        let record = task.await.unwrap().unwrap();
        assert_eq!(record.kind, RecordKind::Pending);
    }

    loader.started.notified().await;
    loader.open();
    wait_for_kind(&orch, CAT, RecordKind::Rendered).await;

    assert_eq!(loader.fetches(), 1);
    let status = orch.status().snapshot();
    assert_eq!(status.thumbs_generated, 1);
    assert_eq!(status.claims_abandoned, 0);
    orch.shutdown().await;
}

#[tokio::test]
async fn test_job_queued_past_claim_ttl_is_dropped() {
    let loader = CountingLoader::ok(png(32, 32)).gated();
    let config = OrchestratorConfig {
        claim_ttl: Some(Duration::from_millis(50)),
        pool: PoolConfig {
            workers: 1,
            queue_capacity: 4,
        },
        ..config(RenderMode::Queued)
    };
    let orch = orchestrator(&loader, memory(), config);

    // The only worker is busy, so the first CAT job waits in the queue
    // until its claim has expired.
    orch.get("fit-in/10x10/example.com/slow.png").await.unwrap();
    loader.started.notified().await;
    assert_eq!(orch.get(CAT).await.unwrap().kind, RecordKind::Pending);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(orch.get(CAT).await.unwrap().kind, RecordKind::Pending);

    loader.open();
    wait_for_kind(&orch, CAT, RecordKind::Rendered).await;

    // slow.png once, CAT once
    assert_eq!(loader.fetches(), 2);
    let status = orch.status().snapshot();
    assert_eq!(status.claims_expired, 1);
    assert_eq!(status.thumbs_generated, 2);
    orch.shutdown().await;
}

#[tokio::test]
async fn test_inline_claim_is_shared_across_processes() {
    let backend = memory();
    let loader = CountingLoader::ok(png(200, 100)).gated();
    let leader = Arc::new(orchestrator(&loader, Arc::clone(&backend), config(RenderMode::Inline)));
    let other = orchestrator(&loader, backend, config(RenderMode::Inline));

    let task = {
        let leader = Arc::clone(&leader);
        tokio::spawn(async move { leader.get(CAT).await })
    };
    loader.started.notified().await;

    // The other instance loses the claim and serves the placeholder.
    let pending = other.get(CAT).await.unwrap();
    assert_eq!(pending.kind, RecordKind::Pending);

    loader.open();
    let rendered = task.await.unwrap().unwrap();
    assert_eq!(rendered.kind, RecordKind::Rendered);
    assert_eq!(other.get(CAT).await.unwrap(), rendered);
    assert_eq!(loader.fetches(), 1);
}

#[tokio::test]
async fn test_failed_render_is_cached() {
    let loader = CountingLoader::status(500);
    let orch = orchestrator(&loader, memory(), config(RenderMode::Inline));

    let first = orch.get(CAT).await.unwrap();
    assert_eq!(first.kind, RecordKind::Failed);
    assert_eq!(first.mime, "image/png");

    let second = orch.get(CAT).await.unwrap();
    assert_eq!(second.kind, RecordKind::Failed);
    assert_eq!(loader.fetches(), 1);

    let status = orch.status().snapshot();
    assert_eq!(status.thumbs_failed, 1);
    assert_eq!(status.thumbs_generated, 0);
}

#[tokio::test]
async fn test_failed_ttl_allows_retry() {
    let loader = CountingLoader::status(503);
    let config = OrchestratorConfig {
        failed_ttl: Some(Duration::from_millis(50)),
        ..config(RenderMode::Inline)
    };
    let orch = orchestrator(&loader, memory(), config);

    assert_eq!(orch.get(CAT).await.unwrap().kind, RecordKind::Failed);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(orch.get(CAT).await.unwrap().kind, RecordKind::Failed);

    assert_eq!(loader.fetches(), 2);
}

#[tokio::test]
async fn test_concurrent_inline_requests_fetch_once() {
    let loader = CountingLoader::ok(png(64, 64)).gated();
    let orch = Arc::new(orchestrator(&loader, memory(), config(RenderMode::Inline)));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.get(CAT).await })
        })
        .collect();

    loader.started.notified().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    loader.open();

    for task in tasks {
        let record = task.await.unwrap().unwrap();
        assert!(matches!(record.kind, RecordKind::Rendered | RecordKind::Pending));
    }

    assert_eq!(loader.fetches(), 1);
    assert_eq!(orch.status().snapshot().thumbs_generated, 1);
    assert_eq!(orch.get(CAT).await.unwrap().kind, RecordKind::Rendered);
}

#[tokio::test]
async fn test_full_queue_abandons_claim() {
    let backend = memory();
    let loader = CountingLoader::ok(png(32, 32)).gated();
    let config = OrchestratorConfig {
        pool: PoolConfig {
            workers: 1,
            queue_capacity: 1,
        },
        ..config(RenderMode::Queued)
    };
    let orch = orchestrator(&loader, Arc::clone(&backend), config);

    // First job occupies the only worker, second fills the queue.
    orch.get("fit-in/10x10/a.png").await.unwrap();
    loader.started.notified().await;
    orch.get("fit-in/10x10/b.png").await.unwrap();

    let third = orch.get("fit-in/10x10/c.png").await.unwrap();
    assert_eq!(third.kind, RecordKind::Pending);
    assert_eq!(orch.status().snapshot().claims_abandoned, 1);

    let key = RenderRequest::parse("fit-in/10x10/c.png", RenderLimits::default().size_limits())
        .unwrap()
        .cache_key()
        .to_string();
    assert_eq!(backend.get(&key).await.unwrap(), None);

    loader.open();
    wait_for_kind(&orch, "fit-in/10x10/b.png", RecordKind::Rendered).await;
    orch.shutdown().await;
}

#[tokio::test]
async fn test_corrupt_record_is_a_miss() {
    let backend = memory();
    let loader = CountingLoader::ok(png(200, 100));
    let orch = orchestrator(&loader, Arc::clone(&backend), config(RenderMode::Inline));

    let key = RenderRequest::parse(CAT, RenderLimits::default().size_limits())
        .unwrap()
        .cache_key()
        .to_string();
    backend.put(&key, vec![0], None).await.unwrap();

    let record = orch.get(CAT).await.unwrap();
    assert_eq!(record.kind, RecordKind::Rendered);
    assert_eq!(orch.status().snapshot().corrupt_records, 1);
    assert_eq!(loader.fetches(), 1);
}

#[tokio::test]
async fn test_backend_outage_fails_request() {
    let loader = CountingLoader::ok(png(8, 8));
    let orch = orchestrator(&loader, Arc::new(DownBackend), config(RenderMode::Inline));

    let err = orch.get(CAT).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::BackendUnavailable(_)));
    assert_eq!(loader.fetches(), 0);
}

#[tokio::test]
async fn test_client_errors_never_touch_backend() {
    let backend = memory();
    let loader = CountingLoader::ok(png(8, 8));
    let orch = orchestrator(&loader, Arc::clone(&backend), config(RenderMode::Inline));

    let err = orch.get("fit-in/100x100").await.unwrap_err();
    assert!(err.is_client_error());
    let err = orch.get("crop/10x10/example.com/cat.png").await.unwrap_err();
    assert!(err.is_client_error());

    assert_eq!(backend.stats().gets, 0);
    assert_eq!(orch.status().snapshot().requests_received, 2);
}

#[tokio::test]
async fn test_clamped_sizes_share_one_render() {
    let loader = CountingLoader::ok(png(1024, 1024));
    let orch = orchestrator(&loader, memory(), config(RenderMode::Inline));

    let a = orch.get("fit-in/0x99999/example.com/cat.png").await.unwrap();
    let b = orch.get("fit-in/wxh/example.com/cat.png").await.unwrap();

    assert_eq!((a.width, a.height), (512, 512));
    assert_eq!(a, b);
    assert_eq!(loader.fetches(), 1);
}
