//! The data-fetch collaborator contract and the bridge that carries fetch
//! completions back into the synchronous manager.
//!
//! The manager itself is synchronous: all chunk mutation happens on the
//! host's thread. Fetches run as tokio tasks; their results cross back
//! over a std mpsc channel which the host drains between renders. Each
//! request carries an id, so a completion that raced with a cancellation
//! still "runs" (the message is received) but is recognized as stale and
//! applied as a no-op.

use crate::range::LineRange;
use async_trait::async_trait;
use std::sync::mpsc;

/// One chunk payload in a fetch response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LogChunkPayload {
    pub content: String,
}

/// Response to a `fetch(offset, limit)` call: newline-separated log text,
/// possibly split across several payload entries.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FetchResponse {
    pub logchunks: Vec<LogChunkPayload>,
}

impl FetchResponse {
    /// Concatenate the payload entries into one body.
    pub fn into_content(self) -> String {
        match self.logchunks.len() {
            0 => String::new(),
            1 => self.logchunks.into_iter().next().map(|c| c.content).unwrap_or_default(),
            _ => self.logchunks.into_iter().map(|c| c.content).collect(),
        }
    }
}

/// Fetch failure taxonomy.
#[derive(Debug)]
pub enum FetchError {
    /// The request was cancelled; absorbed silently, never surfaced.
    Cancelled,
    /// Anything else: surfaced to the caller, no internal retry.
    Transport(anyhow::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Cancelled => write!(f, "fetch cancelled"),
            FetchError::Transport(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Cancelled => None,
            FetchError::Transport(e) => Some(e.as_ref()),
        }
    }
}

/// The externally supplied data source for log lines.
///
/// `offset` is the absolute index of the first requested line, `limit` the
/// number of lines. Implementations must tolerate being dropped mid-flight
/// (the manager aborts superseded requests).
#[async_trait]
pub trait LogFetcher: Send + Sync {
    async fn fetch(&self, offset: u64, limit: u64) -> Result<FetchResponse, FetchError>;
}

/// A completed (or failed) fetch, tagged with the request it answers.
#[derive(Debug)]
pub struct FetchMessage {
    pub request_id: u64,
    pub range: LineRange,
    pub result: Result<FetchResponse, FetchError>,
}

/// Channel pair carrying [`FetchMessage`]s from fetch tasks to the
/// synchronous manager.
///
/// Unbounded is fine here: at most one request is in flight per manager,
/// so the queue depth is bounded by the number of managers.
pub struct FetchBridge {
    sender: mpsc::Sender<FetchMessage>,
    receiver: mpsc::Receiver<FetchMessage>,
}

impl FetchBridge {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// A cloneable sender for a fetch task.
    pub fn sender(&self) -> mpsc::Sender<FetchMessage> {
        self.sender.clone()
    }

    /// Drain pending completions without blocking.
    pub fn try_recv_all(&self) -> Vec<FetchMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

impl Default for FetchBridge {
    fn default() -> Self {
        Self::new()
    }
}
