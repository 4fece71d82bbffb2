use std::io::{BufRead, Read, Write};

use hdrstrip_frame::FrameWriter;
use tracing::{debug, trace};

use crate::config::OverlongLine;
use crate::error::{PipelineError, Result};
use crate::slot::Shared;

/// First stage: reads the source one line per turn and pushes it into the pipe.
///
/// A line longer than the limit takes several turns, one chunk each; it is
/// still counted once.
pub(crate) struct Producer<'a, R, T> {
    source: R,
    transport: FrameWriter<T>,
    shared: &'a Shared,
    max_line_len: usize,
    overlong: OverlongLine,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ProducerStats {
    pub lines_read: u64,
}

impl<'a, R: BufRead, T: Write> Producer<'a, R, T> {
    pub fn new(
        source: R,
        transport: FrameWriter<T>,
        shared: &'a Shared,
        max_line_len: usize,
        overlong: OverlongLine,
    ) -> Self {
        Self {
            source,
            transport,
            shared,
            max_line_len,
            overlong,
        }
    }

    pub fn run(self) -> Result<ProducerStats> {
        let Self {
            mut source,
            mut transport,
            shared,
            max_line_len,
            overlong,
        } = self;
        let turnstile = &shared.turnstile;
        let mut stats = ProducerStats::default();
        let mut line = Vec::with_capacity(max_line_len);
        let mut at_line_start = true;

        loop {
            turnstile.read_turn.acquire()?;

            line.clear();
            let more = read_line(
                &mut source,
                &mut line,
                max_line_len,
                overlong,
                stats.lines_read + 1,
            )?;
            if !more {
                shared.end_of_stream.mark();
                transport.send_end_of_stream()?;
                turnstile.relay_ready.release();
                break;
            }

            transport.send_line(&line)?;
            if at_line_start {
                stats.lines_read += 1;
            }
            at_line_start = line.ends_with(b"\n");
            trace!(line = stats.lines_read, len = line.len(), "chunk produced");
            turnstile.relay_ready.release();
        }

        drop(source);
        debug!(lines_read = stats.lines_read, "source exhausted and closed");
        Ok(stats)
    }
}

/// Read one line of at most `max` bytes into `buf`, terminator included.
///
/// Returns `false` at end of input. A line longer than `max` comes back as
/// its first `max` bytes under [`OverlongLine::Split`]; the rest is returned
/// by the following calls.
pub(crate) fn read_line<R: BufRead>(
    source: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    overlong: OverlongLine,
    line_no: u64,
) -> Result<bool> {
    let read = source
        .by_ref()
        .take(max as u64)
        .read_until(b'\n', buf)
        .map_err(PipelineError::Read)?;
    if read == 0 {
        return Ok(false);
    }

    if overlong == OverlongLine::Reject && read == max && buf.last() != Some(&b'\n') {
        let remaining = source.fill_buf().map_err(PipelineError::Read)?;
        if !remaining.is_empty() {
            return Err(PipelineError::LineTooLong { line: line_no, max });
        }
    }
    Ok(true)
}
