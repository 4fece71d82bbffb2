use std::io::Read;

use hdrstrip_frame::FrameReader;
use tracing::{debug, trace};

use crate::error::Result;
use crate::slot::{Shared, SlotItem};

/// Second stage: moves one frame per turn from the pipe into the line slot.
///
/// The Relay never looks inside a line; it only checks where one ends so
/// that a split line is counted once.
pub(crate) struct Relay<'a, T> {
    transport: FrameReader<T>,
    shared: &'a Shared,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RelayStats {
    pub lines_relayed: u64,
}

impl<'a, T: Read> Relay<'a, T> {
    pub fn new(transport: FrameReader<T>, shared: &'a Shared) -> Self {
        Self { transport, shared }
    }

    pub fn run(mut self) -> Result<RelayStats> {
        let turnstile = &self.shared.turnstile;
        let mut stats = RelayStats::default();
        let mut at_line_start = true;

        loop {
            turnstile.relay_ready.acquire()?;

            let frame = self.transport.read_frame()?;
            // The flag is raised before the end frame is written, and cannot
            // be raised while a line frame is in flight.
            let end = frame.is_end_of_stream();
            debug_assert_eq!(end, self.shared.end_of_stream.is_set());

            if end {
                self.shared.slot.put(SlotItem::End)?;
            } else {
                if at_line_start {
                    stats.lines_relayed += 1;
                }
                at_line_start = frame.payload.ends_with(b"\n");
                self.shared.slot.put(SlotItem::Line(frame.payload))?;
                trace!(line = stats.lines_relayed, "line relayed");
            }
            turnstile.filter_ready.release();

            if end {
                break;
            }
        }

        debug!(lines_relayed = stats.lines_relayed, "relay drained");
        Ok(stats)
    }
}
