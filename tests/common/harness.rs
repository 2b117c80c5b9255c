//! Shared test harness: a scripted log backend plus a download manager
//! wired to it, with helpers to drive request/response cycles to
//! quiescence inside a current-thread tokio runtime.

use async_trait::async_trait;
use chunkview::fetch::{FetchError, FetchResponse, LogChunkPayload, LogFetcher};
use chunkview::manager::{ChunkedLogDownloadManager, DownloadError};
use chunkview::{DownloadConfig, LineRange, LogType, RenderWindow};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A backend serving a synthetic log of `num_lines` stdout lines reading
/// "line N". Records every requested range and can be switched into a
/// failing or never-completing mode.
pub struct ScriptedFetcher {
    pub num_lines: u64,
    requests: Mutex<Vec<LineRange>>,
    fail: AtomicBool,
    hang: AtomicBool,
}

impl ScriptedFetcher {
    pub fn new(num_lines: u64) -> Self {
        Self {
            num_lines,
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            hang: AtomicBool::new(false),
        }
    }

    /// Ranges requested so far, in order.
    pub fn requests(&self) -> Vec<LineRange> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// When hanging, fetches never complete (they still record the request).
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogFetcher for ScriptedFetcher {
    async fn fetch(&self, offset: u64, limit: u64) -> Result<FetchResponse, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push(LineRange::new(offset, offset + limit));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Transport(anyhow::anyhow!(
                "scripted backend failure"
            )));
        }
        let end = (offset + limit).min(self.num_lines);
        let content: String = (offset..end).map(|i| format!("oline {i}\n")).collect();
        Ok(FetchResponse {
            logchunks: vec![LogChunkPayload { content }],
        })
    }
}

/// Log to stderr when RUST_LOG is set; repeated calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct LogViewHarness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub manager: ChunkedLogDownloadManager,
}

impl LogViewHarness {
    pub fn new(num_lines: u64) -> Self {
        Self::with_config(num_lines, DownloadConfig::default())
    }

    pub fn with_config(num_lines: u64, config: DownloadConfig) -> Self {
        init_tracing();
        let fetcher = Arc::new(ScriptedFetcher::new(num_lines));
        let mut manager = ChunkedLogDownloadManager::new(
            Arc::clone(&fetcher) as Arc<dyn LogFetcher>,
            LogType::Stream,
            config,
            tokio::runtime::Handle::current(),
            Box::new(|| {}),
        );
        manager.set_log_num_lines(num_lines);
        Self { fetcher, manager }
    }

    pub fn window(visible_start: usize, visible_stop: usize) -> RenderWindow {
        RenderWindow {
            overscan_start: visible_start.saturating_sub(2),
            overscan_stop: visible_stop + 2,
            visible_start,
            visible_stop,
        }
    }

    /// Let spawned fetch tasks run, then apply their completions.
    pub async fn settle(&mut self) -> Result<bool, DownloadError> {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        self.manager.poll_fetch_messages()
    }

    /// Repeat request/settle for one viewport until the manager stops
    /// issuing requests. Returns the ranges issued, in order.
    pub async fn drive(&mut self, visible: (usize, usize)) -> Vec<LineRange> {
        let window = Self::window(visible.0, visible.1);
        let mut issued = Vec::new();
        // Each iteration downloads at most one chunk; cap generously.
        for _ in 0..64 {
            match self.manager.request_rows(&window) {
                Some(range) => issued.push(range),
                None => break,
            }
            self.settle().await.expect("scripted fetch failed");
        }
        issued
    }
}
