//! State shared by the three stages: the line slot and the end-of-stream flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use bytes::Bytes;

use crate::error::{PipelineError, Result};
use crate::permit::Turnstile;

/// Contents of the line slot between two turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotItem {
    /// Nothing relayed since the Filter last took the slot.
    #[default]
    Empty,
    /// One source line, verbatim.
    Line(Bytes),
    /// The source is exhausted; no further lines follow.
    End,
}

/// The single buffer the Relay fills and the Filter drains.
///
/// Access is ordered by the permit cycle. The mutex only makes the hand-off
/// sound; it is never waited on, and finding it held is reported as
/// [`PipelineError::ProtocolViolation`].
#[derive(Debug, Default)]
pub struct LineSlot {
    item: Mutex<SlotItem>,
}

impl LineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `item`, replacing whatever the slot held.
    pub fn put(&self, item: SlotItem) -> Result<()> {
        *self.access()? = item;
        Ok(())
    }

    /// Take the current item, leaving the slot empty.
    pub fn take(&self) -> Result<SlotItem> {
        Ok(std::mem::take(&mut *self.access()?))
    }

    fn access(&self) -> Result<MutexGuard<'_, SlotItem>> {
        match self.item.try_lock() {
            Ok(guard) => Ok(guard),
            // A stage that panicked mid-turn left at worst a stale item; the
            // pipeline is already being torn down.
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(PipelineError::ProtocolViolation(
                "line slot accessed by two stages at once",
            )),
        }
    }
}

/// Set-once flag raised by the Producer when the source is exhausted.
///
/// Raised before the end frame is sent. The Filter refuses an end marker
/// that arrives while the flag is still down.
#[derive(Debug, Default)]
pub struct EndOfStream {
    reached: AtomicBool,
}

impl EndOfStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` the first time only.
    pub fn mark(&self) -> bool {
        !self.reached.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.reached.load(Ordering::Acquire)
    }
}

/// Everything the stages share for the lifetime of one run.
#[derive(Debug, Default)]
pub struct Shared {
    pub turnstile: Turnstile,
    pub slot: LineSlot,
    pub end_of_stream: EndOfStream,
}
