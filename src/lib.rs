//! Virtualized log viewing: a windowed list engine and a chunked log
//! download manager.
//!
//! The two halves share line-range arithmetic but are otherwise
//! independent. [`window::WindowedListEngine`] maps a scroll position to
//! the item range worth rendering, compressing very long lists into a
//! movable sub-window so scroll coordinates stay within what layout
//! engines handle reliably. [`manager::ChunkedLogDownloadManager`]
//! downloads log lines in bounded chunks around the viewport, caches
//! parsed and styled lines, and serves per-line render queries.
//!
//! All state mutation is synchronous on the host thread. Fetches run as
//! tokio tasks and report back over a channel drained between renders, so
//! nothing here needs locks.

pub mod chunk;
pub mod config;
pub mod download;
pub mod fetch;
pub mod line;
pub mod manager;
pub mod range;
pub mod scroll_space;
pub mod search;
pub mod style;
pub mod window;

pub use config::{ConfigError, DownloadConfig, WindowConfig};
pub use fetch::{FetchError, FetchResponse, LogChunkPayload, LogFetcher};
pub use line::{LineType, LogType};
pub use manager::{ChunkedLogDownloadManager, DownloadError, LineContent, RenderedLine};
pub use range::LineRange;
pub use window::{Alignment, RenderWindow, ScrollDirection, WindowedListEngine};
