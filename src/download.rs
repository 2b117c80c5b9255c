//! Download decision logic.
//!
//! Pure functions deciding which line range to fetch next and whether an
//! in-flight request is still worth keeping. The case precedence in
//! [`select_chunk_download_range`] — nothing downloaded, disjoint,
//! superset, subset, split — decides which parts of a log win under scroll
//! pressure and must not be reordered.

use crate::range::LineRange;

/// Select the next range to download.
///
/// * `desired` — the range the viewer wants covered (visible range plus
///   download overscan).
/// * `downloaded` — the span currently covered by chunks (empty when
///   nothing is downloaded).
/// * `visible` — the strictly visible range, used to break ties.
/// * `max_chunk_lines` — upper bound on the length of the returned range.
///
/// The returned range never overlaps `downloaded` and, when `downloaded`
/// is non-empty, is anchored at one of its edges so the chunk list stays
/// contiguous. Returns an empty range when there is nothing to do.
pub fn select_chunk_download_range(
    desired: LineRange,
    downloaded: LineRange,
    visible: LineRange,
    max_chunk_lines: u64,
) -> LineRange {
    if desired.is_empty() || max_chunk_lines == 0 {
        return LineRange::empty();
    }

    // Nothing downloaded yet: take the desired range, clipped to the chunk
    // limit around the visible midpoint.
    if downloaded.is_empty() {
        return clip_around_midpoint(desired, visible, max_chunk_lines);
    }

    // Disjoint: grow from the downloaded edge facing the desired range, so
    // the downloaded span stays contiguous while it catches up.
    if !desired.overlaps(downloaded) {
        return if downloaded.end <= desired.start {
            LineRange::new(
                downloaded.end,
                desired.end.min(downloaded.end + max_chunk_lines),
            )
        } else {
            LineRange::new(
                desired.start.max(downloaded.start.saturating_sub(max_chunk_lines)),
                downloaded.start,
            )
        };
    }

    // Desired fully covered: nothing to do.
    if downloaded.contains_range(desired) {
        return LineRange::empty();
    }

    let left_exposed = desired.start < downloaded.start;
    let right_exposed = desired.end > downloaded.end;

    let extend_left = || {
        LineRange::new(
            desired.start.max(downloaded.start.saturating_sub(max_chunk_lines)),
            downloaded.start,
        )
    };
    let extend_right = || {
        LineRange::new(
            downloaded.end,
            desired.end.min(downloaded.end + max_chunk_lines),
        )
    };

    match (left_exposed, right_exposed) {
        // Downloaded sticks out of the desired range on one side; extend
        // only the exposed side.
        (true, false) => extend_left(),
        (false, true) => extend_right(),
        // Downloaded sits strictly inside desired: pick the side the
        // visible range overlaps, preferring the trailing side when both
        // or neither overlap.
        (true, true) => {
            let left_side = LineRange::new(desired.start, downloaded.start);
            let right_side = LineRange::new(downloaded.end, desired.end);
            if visible.overlaps(left_side) && !visible.overlaps(right_side) {
                extend_left()
            } else {
                extend_right()
            }
        }
        (false, false) => LineRange::empty(),
    }
}

fn clip_around_midpoint(desired: LineRange, visible: LineRange, max_chunk_lines: u64) -> LineRange {
    if desired.len() <= max_chunk_lines {
        return desired;
    }
    let midpoint = if visible.is_empty() {
        desired.midpoint()
    } else {
        visible.midpoint()
    };
    let start = midpoint
        .saturating_sub(max_chunk_lines / 2)
        .clamp(desired.start, desired.end - max_chunk_lines);
    LineRange::new(start, start + max_chunk_lines)
}

/// Decide whether the in-flight request should be kept when the viewport
/// changes: keep it when the visible range is already fully downloaded
/// (the request is a harmless prefetch) or when it overlaps what is being
/// fetched. Otherwise it is stale and should be cancelled.
pub fn should_keep_pending_request(
    downloaded: LineRange,
    requested: LineRange,
    visible: LineRange,
) -> bool {
    downloaded.contains_range(visible) || visible.overlaps(requested)
}
