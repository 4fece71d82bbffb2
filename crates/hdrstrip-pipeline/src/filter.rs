use std::io::Write;

use tracing::{debug, trace};

use crate::config::SentinelMatch;
use crate::error::{PipelineError, Result};
use crate::slot::{Shared, SlotItem};

/// Where the Filter is in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Before the sentinel line. Lines are discarded.
    InHeader,
    /// After the sentinel line. Lines are written.
    InContent,
}

/// What to do with one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Discard,
    Write,
}

/// Header/content classifier.
///
/// Starts in [`FilterState::InHeader`]; the first line matching the sentinel
/// is discarded and moves it to [`FilterState::InContent`] for good.
///
/// Input arrives in chunks. A chunk ending in `\n` ends its line, so a split
/// line is matched as a whole and every chunk of it gets the disposition of
/// the line it belongs to. The state only changes between lines.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    sentinel: Vec<u8>,
    mode: SentinelMatch,
    state: FilterState,
    sentinel_line: Option<u64>,
    lines: u64,
    at_line_start: bool,
    // Bytes of the current line kept for matching: the whole line (up to the
    // marker plus `\r\n`) for exact matching, the last `marker - 1` bytes
    // for containment.
    partial: Vec<u8>,
    found: bool,
    overflow: bool,
}

impl HeaderFilter {
    pub fn new(sentinel: impl Into<Vec<u8>>, mode: SentinelMatch) -> Self {
        Self {
            sentinel: sentinel.into(),
            mode,
            state: FilterState::InHeader,
            sentinel_line: None,
            lines: 0,
            at_line_start: true,
            partial: Vec::new(),
            found: false,
            overflow: false,
        }
    }

    /// Classify the next chunk of input.
    pub fn classify(&mut self, chunk: &[u8]) -> Disposition {
        if self.at_line_start {
            self.lines += 1;
            self.partial.clear();
            self.found = false;
            self.overflow = false;
        }

        let disposition = match self.state {
            FilterState::InContent => Disposition::Write,
            FilterState::InHeader => {
                self.scan(chunk);
                Disposition::Discard
            }
        };

        self.at_line_start = chunk.ends_with(b"\n");
        if self.at_line_start {
            self.end_line();
        }
        disposition
    }

    /// End an unterminated last line, if one is in progress.
    pub fn finish(&mut self) {
        if !self.at_line_start {
            self.end_line();
            self.at_line_start = true;
        }
    }

    /// Whether the next chunk starts a new line.
    pub fn at_line_start(&self) -> bool {
        self.at_line_start
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// 1-based position of the sentinel line, once seen.
    pub fn sentinel_line(&self) -> Option<u64> {
        self.sentinel_line
    }

    fn end_line(&mut self) {
        if self.state == FilterState::InHeader && self.line_matches() {
            self.state = FilterState::InContent;
            self.sentinel_line = Some(self.lines);
            debug!(line = self.lines, "end of header");
        }
    }

    fn scan(&mut self, chunk: &[u8]) {
        match self.mode {
            SentinelMatch::Contains => {
                if self.found || self.sentinel.is_empty() {
                    return;
                }
                self.partial.extend_from_slice(chunk);
                if contains(&self.partial, &self.sentinel) {
                    self.found = true;
                    return;
                }
                let cut = self.partial.len().saturating_sub(self.sentinel.len() - 1);
                self.partial.drain(..cut);
            }
            SentinelMatch::Exact => {
                if self.overflow {
                    return;
                }
                if self.partial.len() + chunk.len() > self.sentinel.len() + 2 {
                    self.overflow = true;
                    self.partial.clear();
                } else {
                    self.partial.extend_from_slice(chunk);
                }
            }
        }
    }

    fn line_matches(&self) -> bool {
        match self.mode {
            SentinelMatch::Contains => self.found,
            SentinelMatch::Exact => {
                !self.overflow && strip_terminator(&self.partial) == self.sentinel.as_slice()
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Third stage: classifies each relayed chunk and writes the content section.
pub(crate) struct Filter<'a, W> {
    sink: W,
    shared: &'a Shared,
    classifier: HeaderFilter,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FilterStats {
    pub header_lines: u64,
    pub lines_written: u64,
    pub bytes_written: u64,
    pub sentinel_line: Option<u64>,
}

impl<'a, W: Write> Filter<'a, W> {
    pub fn new(sink: W, shared: &'a Shared, classifier: HeaderFilter) -> Self {
        Self {
            sink,
            shared,
            classifier,
        }
    }

    pub fn run(mut self) -> Result<FilterStats> {
        let turnstile = &self.shared.turnstile;
        let mut stats = FilterStats::default();

        loop {
            turnstile.filter_ready.acquire()?;

            let chunk = match self.shared.slot.take()? {
                SlotItem::End => {
                    if !self.shared.end_of_stream.is_set() {
                        return Err(PipelineError::ProtocolViolation(
                            "end of stream relayed before the source was exhausted",
                        ));
                    }
                    self.classifier.finish();
                    break;
                }
                SlotItem::Line(chunk) => chunk,
                SlotItem::Empty => {
                    return Err(PipelineError::ProtocolViolation(
                        "filter turn started with an empty slot",
                    ))
                }
            };

            let new_line = self.classifier.at_line_start();
            match self.classifier.classify(&chunk) {
                Disposition::Write => {
                    self.sink.write_all(&chunk).map_err(PipelineError::Write)?;
                    if new_line {
                        stats.lines_written += 1;
                    }
                    stats.bytes_written += chunk.len() as u64;
                    trace!(written = stats.lines_written, "content written");
                }
                Disposition::Discard if new_line => stats.header_lines += 1,
                Disposition::Discard => {}
            }

            turnstile.read_turn.release();
        }

        self.sink.flush().map_err(PipelineError::Write)?;
        stats.sentinel_line = self.classifier.sentinel_line();
        debug!(
            lines_written = stats.lines_written,
            header_lines = stats.header_lines,
            "destination flushed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_through_sentinel_then_writes() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Contains);
        assert_eq!(filter.classify(b"title: x\n"), Disposition::Discard);
        assert_eq!(filter.state(), FilterState::InHeader);
        assert_eq!(filter.classify(b"end_header\n"), Disposition::Discard);
        assert_eq!(filter.state(), FilterState::InContent);
        assert_eq!(filter.classify(b"a\n"), Disposition::Write);
        assert_eq!(filter.sentinel_line(), Some(2));
    }

    #[test]
    fn later_sentinels_are_content() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Contains);
        filter.classify(b"end_header\n");
        assert_eq!(filter.classify(b"end_header\n"), Disposition::Write);
        assert_eq!(filter.sentinel_line(), Some(1));
    }

    #[test]
    fn contains_matches_anywhere_in_line() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Contains);
        assert_eq!(filter.classify(b"the end_header is near\n"), Disposition::Discard);
        assert_eq!(filter.state(), FilterState::InContent);
    }

    #[test]
    fn exact_requires_whole_line() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Exact);
        filter.classify(b"the end_header is near\n");
        assert_eq!(filter.state(), FilterState::InHeader);
        filter.classify(b"end_header\r\n");
        assert_eq!(filter.state(), FilterState::InContent);
    }

    #[test]
    fn exact_accepts_unterminated_last_line() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Exact);
        filter.classify(b"end_header");
        assert_eq!(filter.state(), FilterState::InHeader);
        filter.finish();
        assert_eq!(filter.state(), FilterState::InContent);
        assert_eq!(filter.sentinel_line(), Some(1));
    }

    #[test]
    fn sentinel_longer_than_line_never_matches() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Contains);
        assert_eq!(filter.classify(b"end\n"), Disposition::Discard);
        assert_eq!(filter.state(), FilterState::InHeader);
    }

    #[test]
    fn exact_ignores_marker_in_tail_chunk() {
        let mut filter = HeaderFilter::new("ab", SentinelMatch::Exact);
        assert_eq!(filter.classify(b"xyzw"), Disposition::Discard);
        assert_eq!(filter.classify(b"ab\n"), Disposition::Discard);
        assert_eq!(filter.state(), FilterState::InHeader);
        assert_eq!(filter.classify(b"body\n"), Disposition::Discard);
        assert_eq!(filter.sentinel_line(), None);
    }

    #[test]
    fn exact_matches_marker_split_across_chunks() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Exact);
        filter.classify(b"end_");
        filter.classify(b"head");
        assert_eq!(filter.state(), FilterState::InHeader);
        filter.classify(b"er\n");
        assert_eq!(filter.state(), FilterState::InContent);
        assert_eq!(filter.sentinel_line(), Some(1));
    }

    #[test]
    fn contains_finds_marker_across_chunk_boundary() {
        let mut filter = HeaderFilter::new("end_header", SentinelMatch::Contains);
        filter.classify(b"xx end_he");
        filter.classify(b"ader yy\n");
        assert_eq!(filter.state(), FilterState::InContent);
        assert_eq!(filter.sentinel_line(), Some(1));
    }

    #[test]
    fn continuation_chunks_follow_their_line() {
        let mut filter = HeaderFilter::new("--", SentinelMatch::Contains);
        filter.classify(b"--\n");
        assert!(filter.at_line_start());
        assert_eq!(filter.classify(b"abcd"), Disposition::Write);
        assert!(!filter.at_line_start());
        assert_eq!(filter.classify(b"ef\n"), Disposition::Write);
        assert!(filter.at_line_start());
    }

    #[test]
    fn line_with_marker_split_stays_header_until_it_ends() {
        let mut filter = HeaderFilter::new("--", SentinelMatch::Contains);
        assert_eq!(filter.classify(b"a --"), Disposition::Discard);
        assert_eq!(filter.classify(b" tail\n"), Disposition::Discard);
        assert_eq!(filter.classify(b"body\n"), Disposition::Write);
        assert_eq!(filter.sentinel_line(), Some(1));
    }

    fn run_filter(shared: &Shared, items: Vec<SlotItem>) -> Result<(Vec<u8>, FilterStats)> {
        let mut out = Vec::new();
        let stats = std::thread::scope(|scope| {
            let filter = Filter::new(
                &mut out,
                shared,
                HeaderFilter::new("--", SentinelMatch::Contains),
            );
            let handle = scope.spawn(move || filter.run());
            for item in items {
                shared.turnstile.read_turn.acquire().unwrap();
                if item == SlotItem::End {
                    shared.end_of_stream.mark();
                }
                shared.slot.put(item).unwrap();
                shared.turnstile.filter_ready.release();
            }
            handle.join().unwrap()
        })?;
        Ok((out, stats))
    }

    #[test]
    fn filter_counts_split_lines_once() {
        let shared = Shared::default();
        let chunks = [&b"h\n"[..], b"--\n", b"abcd", b"ef\n", b"g"];
        let mut items: Vec<SlotItem> = chunks
            .iter()
            .map(|chunk| SlotItem::Line(bytes::Bytes::copy_from_slice(chunk)))
            .collect();
        items.push(SlotItem::End);

        let (out, stats) = run_filter(&shared, items).unwrap();
        assert_eq!(out, b"abcdef\ng");
        assert_eq!(stats.header_lines, 2);
        assert_eq!(stats.lines_written, 2);
        assert_eq!(stats.bytes_written, 8);
        assert_eq!(stats.sentinel_line, Some(2));
    }

    #[test]
    fn end_marker_without_flag_is_a_protocol_violation() {
        let shared = Shared::default();
        shared.slot.put(SlotItem::End).unwrap();
        shared.turnstile.filter_ready.release();

        let mut out = Vec::new();
        let filter = Filter::new(
            &mut out,
            &shared,
            HeaderFilter::new("--", SentinelMatch::Contains),
        );
        assert!(matches!(
            filter.run(),
            Err(PipelineError::ProtocolViolation(_))
        ));
    }
}
