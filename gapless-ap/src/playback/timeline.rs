//! Stream timeline
//!
//! Cumulative duration spans, one per chunk, in insertion order. Spans are
//! contiguous: each begins where the previous one ends, the first begins at 0.
//!
//! Seek lookup maps an absolute stream time to `(chunk index, offset)`. An
//! instant lying exactly on a boundary belongs to the *earlier* chunk (first
//! span whose end is `>= t`), so seeking to a chunk's end instant resumes at
//! the very end of that chunk rather than at the start of the next one.

use serde::Serialize;

/// Time interval `[begin, end)` a chunk occupies in the concatenated stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationSpan {
    pub begin_ticks: i64,
    pub end_ticks: i64,
}

impl DurationSpan {
    pub fn duration_ticks(&self) -> i64 {
        self.end_ticks - self.begin_ticks
    }
}

/// Result of a seek lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTarget {
    /// Chunk to resume from
    pub index: usize,
    /// Offset into that chunk
    pub offset_ticks: i64,
}

/// Append-only list of duration spans
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    spans: Vec<DurationSpan>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a span of `duration_ticks` after the current end
    pub fn push(&mut self, duration_ticks: i64) -> DurationSpan {
        let begin_ticks = self.total_ticks();
        let span = DurationSpan {
            begin_ticks,
            end_ticks: begin_ticks + duration_ticks,
        };
        self.spans.push(span);
        span
    }

    /// End of the last span, 0 when empty
    pub fn total_ticks(&self) -> i64 {
        self.spans.last().map_or(0, |s| s.end_ticks)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[DurationSpan] {
        &self.spans
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Locate the chunk and intra-chunk offset for stream time `t`
    ///
    /// Linear scan from the start; returns the first span with `end >= t`.
    /// None when the timeline is empty or `t` lies outside `0..=total`.
    pub fn locate(&self, t: i64) -> Option<SeekTarget> {
        if t < 0 || t > self.total_ticks() {
            return None;
        }

        self.spans
            .iter()
            .position(|span| t <= span.end_ticks)
            .map(|index| SeekTarget {
                index,
                offset_ticks: t - self.spans[index].begin_ticks,
            })
    }
}
