//! The chunked log download manager.
//!
//! Owns the set of downloaded chunks for one log, decides what to fetch as
//! the viewport moves, merges and evicts chunks to bound memory, and
//! answers "what is at line N" queries for the renderer. All state lives
//! on the host thread; fetches run as tokio tasks and report back through
//! a [`FetchBridge`](crate::fetch::FetchBridge), which the host drains via
//! [`ChunkedLogDownloadManager::poll_fetch_messages`].

use crate::chunk::Chunk;
use crate::config::DownloadConfig;
use crate::download::{select_chunk_download_range, should_keep_pending_request};
use crate::fetch::{FetchBridge, FetchError, FetchMessage, LogFetcher};
use crate::line::{LineType, LogType};
use crate::range::LineRange;
use crate::search::LogSearch;
use crate::style::{parse_ansi_line, StyleSpan, StyledLine};
use crate::window::RenderWindow;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Errors surfaced by the download manager.
#[derive(Debug)]
pub enum DownloadError {
    /// The backend returned a chunk that does not touch the existing
    /// downloaded span. Fatal: downloading is permanently disabled for
    /// this manager instance.
    NonContiguousChunk {
        chunk: LineRange,
        neighbor: LineRange,
    },
    /// A fetch failed for a non-cancellation reason. Not retried; the
    /// next viewport change re-evaluates naturally.
    Fetch(FetchError),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::NonContiguousChunk { chunk, neighbor } => write!(
                f,
                "received log chunk {chunk} not contiguous with downloaded chunk {neighbor}"
            ),
            DownloadError::Fetch(e) => write!(f, "log download failed: {e}"),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::NonContiguousChunk { .. } => None,
            DownloadError::Fetch(e) => Some(e),
        }
    }
}

/// A line ready for display: tag and escape bytes stripped, styling as
/// spans over the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub line_type: LineType,
    pub text: String,
    pub spans: Vec<StyleSpan>,
}

/// Answer to a line render query.
#[derive(Debug, Clone, PartialEq)]
pub enum LineContent {
    /// The line exists but is not downloaded yet; the host shows its
    /// placeholder.
    Pending,
    Loaded(Rc<RenderedLine>),
}

struct PendingRequest {
    request_id: u64,
    range: LineRange,
    join: tokio::task::JoinHandle<()>,
}

/// Callback invoked after downloaded content changes.
pub type StateChangeCallback = Box<dyn FnMut()>;

/// Download, cache and render state for a single log.
pub struct ChunkedLogDownloadManager {
    fetcher: Arc<dyn LogFetcher>,
    log_type: LogType,
    config: DownloadConfig,
    runtime: tokio::runtime::Handle,
    bridge: FetchBridge,
    on_state_change: StateChangeCallback,

    num_lines: u64,
    /// Sorted by first line, pairwise non-overlapping, contiguous.
    chunks: Vec<Chunk>,
    /// One entry per chunk at all times; None until styling is requested.
    chunk_styles: Vec<Option<Rc<Vec<StyledLine>>>>,
    render_cache: HashMap<u64, Rc<RenderedLine>>,
    search: LogSearch,

    visible: LineRange,
    rendered: LineRange,
    selection_active: bool,
    downloads_disabled: bool,
    request_seq: u64,
    pending: Option<PendingRequest>,
}

impl ChunkedLogDownloadManager {
    pub fn new(
        fetcher: Arc<dyn LogFetcher>,
        log_type: LogType,
        config: DownloadConfig,
        runtime: tokio::runtime::Handle,
        on_state_change: StateChangeCallback,
    ) -> Self {
        Self {
            fetcher,
            log_type,
            config,
            runtime,
            bridge: FetchBridge::new(),
            on_state_change,
            num_lines: 0,
            chunks: Vec::new(),
            chunk_styles: Vec::new(),
            render_cache: HashMap::new(),
            search: LogSearch::new(),
            visible: LineRange::empty(),
            rendered: LineRange::empty(),
            selection_active: false,
            downloads_disabled: false,
            request_seq: 0,
            pending: None,
        }
    }

    pub fn num_lines(&self) -> u64 {
        self.num_lines
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The span covered by downloaded chunks. Chunks are contiguous, so a
    /// single range describes them.
    pub fn downloaded_span(&self) -> LineRange {
        match (self.chunks.first(), self.chunks.last()) {
            (Some(first), Some(last)) => LineRange::new(first.first_line(), last.last_line()),
            _ => LineRange::empty(),
        }
    }

    pub fn is_download_disabled(&self) -> bool {
        self.downloads_disabled
    }

    pub fn pending_request_range(&self) -> Option<LineRange> {
        self.pending.as_ref().map(|p| p.range)
    }

    pub fn search(&self) -> &LogSearch {
        &self.search
    }

    /// Update the total line count (live logs grow while being viewed).
    /// A pure length change does not invalidate downloaded content or
    /// search results.
    pub fn set_log_num_lines(&mut self, num_lines: u64) {
        self.num_lines = num_lines;
    }

    fn log_bounds(&self) -> LineRange {
        LineRange::new(0, self.num_lines)
    }

    /// React to a render-range change: evict far-away chunks, keep or
    /// cancel the in-flight request, and issue at most one new fetch.
    /// Returns the issued range, if any.
    pub fn request_rows(&mut self, window: &RenderWindow) -> Option<LineRange> {
        self.visible = LineRange::new(window.visible_start as u64, window.visible_stop as u64)
            .clamp_to(self.log_bounds());
        if self.downloads_disabled || self.num_lines == 0 {
            return None;
        }

        self.cleanup_downloaded_lines();

        let downloaded = self.downloaded_span();
        if let Some(pending) = &self.pending {
            if should_keep_pending_request(downloaded, pending.range, self.visible) {
                return None;
            }
            tracing::debug!(
                range = %pending.range,
                visible = %self.visible,
                "cancelling stale log request"
            );
            pending.join.abort();
            self.pending = None;
        }

        let bounds = self.log_bounds();
        let initiate = self
            .visible
            .expand(self.config.download_initiate_overscan_row_count, bounds);
        if downloaded.contains_range(initiate) {
            return None;
        }

        let desired = self
            .visible
            .expand(self.config.download_overscan_row_count, bounds);
        let range = select_chunk_download_range(
            desired,
            downloaded,
            self.visible,
            self.config.max_chunk_lines_count,
        );
        if range.is_empty() {
            return None;
        }
        self.issue_fetch(range);
        Some(range)
    }

    fn issue_fetch(&mut self, range: LineRange) {
        self.request_seq += 1;
        let request_id = self.request_seq;
        let fetcher = Arc::clone(&self.fetcher);
        let sender = self.bridge.sender();
        tracing::debug!(%range, request_id, "requesting log lines");
        let join = self.runtime.spawn(async move {
            let result = fetcher.fetch(range.start, range.len()).await;
            // The receiver may be gone when the manager was dropped.
            let _ = sender.send(FetchMessage {
                request_id,
                range,
                result,
            });
        });
        self.pending = Some(PendingRequest {
            request_id,
            range,
            join,
        });
    }

    /// Drain and apply completed fetches. Call between renders. Returns
    /// whether downloaded content changed.
    pub fn poll_fetch_messages(&mut self) -> Result<bool, DownloadError> {
        let mut changed = false;
        for message in self.bridge.try_recv_all() {
            changed |= self.handle_fetch_message(message)?;
        }
        Ok(changed)
    }

    fn handle_fetch_message(&mut self, message: FetchMessage) -> Result<bool, DownloadError> {
        let current = match &self.pending {
            Some(pending) => pending.request_id == message.request_id,
            None => false,
        };
        if !current {
            // A cancelled request's completion still arrives here; the
            // bookkeeping is to recognize it and drop it.
            tracing::trace!(request_id = message.request_id, "dropping stale fetch result");
            return Ok(false);
        }
        self.pending = None;

        match message.result {
            Err(FetchError::Cancelled) => Ok(false),
            Err(e) => Err(DownloadError::Fetch(e)),
            Ok(response) => {
                let chunk =
                    Chunk::from_payload(message.range.start, &response.into_content(), self.log_type);
                if chunk.range().is_empty() {
                    return Ok(false);
                }
                self.add_chunk(chunk)?;
                if self.search.is_active() {
                    self.search.recompute(&self.chunks, false);
                }
                (self.on_state_change)();
                Ok(true)
            }
        }
    }

    /// Insert a downloaded chunk, merging into a neighbor when the merged
    /// size stays within the chunk limit.
    ///
    /// The chunk must exactly touch its neighbors; anything else means the
    /// backend handed back lines we did not ask for, and no further
    /// request can be trusted to line up either, so downloading is
    /// disabled for good.
    fn add_chunk(&mut self, chunk: Chunk) -> Result<(), DownloadError> {
        let index = self
            .chunks
            .partition_point(|c| c.first_line() < chunk.first_line());

        if index > 0 {
            let prev = &self.chunks[index - 1];
            if prev.last_line() != chunk.first_line() {
                self.downloads_disabled = true;
                return Err(DownloadError::NonContiguousChunk {
                    chunk: chunk.range(),
                    neighbor: prev.range(),
                });
            }
        }
        if index < self.chunks.len() {
            let next = &self.chunks[index];
            if next.first_line() != chunk.last_line() {
                self.downloads_disabled = true;
                return Err(DownloadError::NonContiguousChunk {
                    chunk: chunk.range(),
                    neighbor: next.range(),
                });
            }
        }

        let max = self.config.max_chunk_lines_count;
        let fits_prev = index > 0
            && self.chunks[index - 1].line_count() + chunk.line_count() <= max;
        let fits_next = index < self.chunks.len()
            && chunk.line_count() + self.chunks[index].line_count() <= max;

        if fits_prev {
            self.chunks[index - 1].append(chunk);
            self.refresh_chunk_styles(index - 1);
            // The grown chunk may now also absorb its successor.
            if index < self.chunks.len()
                && self.chunks[index - 1].line_count() + self.chunks[index].line_count() <= max
            {
                let next = self.chunks.remove(index);
                self.chunk_styles.remove(index);
                self.chunks[index - 1].append(next);
                self.refresh_chunk_styles(index - 1);
            }
        } else if fits_next {
            let mut merged = chunk;
            merged.append(self.chunks[index].clone());
            self.chunks[index] = merged;
            self.refresh_chunk_styles(index);
        } else {
            self.chunks.insert(index, chunk);
            self.chunk_styles.insert(index, None);
        }
        debug_assert_eq!(self.chunks.len(), self.chunk_styles.len());
        Ok(())
    }

    /// Recompute a chunk's style cache entry after a merge — but only when
    /// someone already asked for styling; otherwise stay lazy.
    fn refresh_chunk_styles(&mut self, index: usize) {
        if self.chunk_styles[index].is_some() {
            self.chunk_styles[index] = Some(Rc::new(compute_chunk_styles(&self.chunks[index])));
        }
    }

    /// Drop chunks that fell entirely outside the cached-download window
    /// around the visible range. Never runs while a text selection is
    /// active: the selection's backing lines must not disappear.
    fn cleanup_downloaded_lines(&mut self) {
        if self.selection_active || self.chunks.is_empty() {
            return;
        }
        let keep = self
            .visible
            .expand(self.config.cached_download_overscan_row_count, self.log_bounds());
        let before = self.chunks.len();

        // Drop chunks and their style entries in lockstep.
        let mut kept_chunks = Vec::with_capacity(before);
        let mut kept_styles = Vec::with_capacity(before);
        for (chunk, styles) in self.chunks.drain(..).zip(self.chunk_styles.drain(..)) {
            if chunk.range().overlaps(keep) {
                kept_chunks.push(chunk);
                kept_styles.push(styles);
            }
        }
        self.chunks = kept_chunks;
        self.chunk_styles = kept_styles;

        if self.chunks.len() != before {
            tracing::debug!(
                evicted = before - self.chunks.len(),
                keep = %keep,
                "evicted log chunks outside cached window"
            );
            // Search results must always reflect the downloaded text;
            // evicted matches disappear from the count.
            if self.search.is_active() {
                self.search.recompute(&self.chunks, false);
                (self.on_state_change)();
            }
        }
    }

    /// Content for one absolute line index: a cached render, a freshly
    /// styled line, or a placeholder when not yet downloaded.
    pub fn rendered_line_content(&mut self, index: u64) -> LineContent {
        if let Some(cached) = self.render_cache.get(&index) {
            return LineContent::Loaded(Rc::clone(cached));
        }
        let Some(chunk_index) = self.find_chunk(index) else {
            return LineContent::Pending;
        };

        let styles = self.chunk_style_entry(chunk_index);
        let chunk = &self.chunks[chunk_index];
        let line_index = (index - chunk.first_line()) as usize;
        let styled = &styles[line_index];
        let rendered = Rc::new(RenderedLine {
            line_type: chunk.line_type(index).unwrap_or(LineType::Plain),
            text: styled.text.clone(),
            spans: styled.spans.clone(),
        });
        self.render_cache.insert(index, Rc::clone(&rendered));
        LineContent::Loaded(rendered)
    }

    fn chunk_style_entry(&mut self, chunk_index: usize) -> Rc<Vec<StyledLine>> {
        match &self.chunk_styles[chunk_index] {
            Some(styles) => Rc::clone(styles),
            None => {
                let styles = Rc::new(compute_chunk_styles(&self.chunks[chunk_index]));
                self.chunk_styles[chunk_index] = Some(Rc::clone(&styles));
                styles
            }
        }
    }

    fn find_chunk(&self, index: u64) -> Option<usize> {
        let i = self.chunks.partition_point(|c| c.last_line() <= index);
        (i < self.chunks.len() && self.chunks[i].contains_line(index)).then_some(i)
    }

    /// Record the range the host actually rendered and prune the render
    /// cache to a window around it. A live selection pins the cache: the
    /// browser's native selection breaks if backing nodes vanish.
    pub fn on_cell_range_rendered(&mut self, start: u64, stop: u64) {
        self.rendered = LineRange::new(start, stop).clamp_to(self.log_bounds());
        if self.selection_active {
            return;
        }
        let keep = self
            .rendered
            .expand(self.config.cache_rendered_overscan_row_count, self.log_bounds());
        self.render_cache.retain(|&line, _| keep.contains(line));
    }

    pub fn set_is_selection_active(&mut self, active: bool) {
        self.selection_active = active;
    }

    pub fn set_search_string(&mut self, search_string: &str) {
        if self.search.set_search_string(search_string) {
            self.search.recompute(&self.chunks, true);
            (self.on_state_change)();
        }
    }

    pub fn set_search_case_sensitivity(&mut self, case_sensitive: bool) {
        if self.search.set_case_sensitivity(case_sensitive) {
            self.search.recompute(&self.chunks, true);
            (self.on_state_change)();
        }
    }

    pub fn set_use_regex(&mut self, use_regex: bool) {
        if self.search.set_use_regex(use_regex) {
            self.search.recompute(&self.chunks, true);
            (self.on_state_change)();
        }
    }

    pub fn set_next_search_result(&mut self) {
        self.search.set_next_result();
        (self.on_state_change)();
    }

    pub fn set_prev_search_result(&mut self) {
        self.search.set_prev_result();
        (self.on_state_change)();
    }
}

impl Drop for ChunkedLogDownloadManager {
    fn drop(&mut self) {
        if let Some(pending) = &self.pending {
            pending.join.abort();
        }
    }
}

fn compute_chunk_styles(chunk: &Chunk) -> Vec<StyledLine> {
    chunk.lines().map(|(_, raw, _)| parse_ansi_line(raw)).collect()
}
