use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use hdrstrip_frame::{FrameConfig, FrameReader, FrameWriter};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::filter::{Filter, HeaderFilter};
use crate::permit::Turnstile;
use crate::producer::Producer;
use crate::relay::Relay;
use crate::slot::Shared;

/// Counters from one completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Lines the Producer pushed into the transport.
    pub lines_read: u64,
    /// Lines the Relay moved into the line slot.
    pub lines_relayed: u64,
    /// Lines discarded as header, sentinel included.
    pub header_lines: u64,
    /// Lines written to the destination.
    pub lines_written: u64,
    pub bytes_written: u64,
    /// 1-based line number of the sentinel, if one was found.
    pub sentinel_line: Option<u64>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn found_sentinel(&self) -> bool {
        self.sentinel_line.is_some()
    }
}

/// Cancels a running pipeline from another thread.
///
/// Every stage blocked on its permit, or reaching one later, stops with
/// [`PipelineError::Cancelled`]. Cancelling a finished pipeline does nothing.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.shared.turnstile.is_closed() {
            info!("cancelling pipeline");
        }
        self.shared.turnstile.close_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.turnstile.is_closed()
    }
}

/// One header-stripping pass: Producer, Relay and Filter over a shared slot.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shared: Arc::new(Shared::default()),
        })
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Open `input`, create or truncate `output`, and run one pass.
    ///
    /// Both files are opened before any stage starts; failing to open either
    /// aborts without running the pipeline. The source is also read once, so
    /// an unreadable source fails before the destination is created.
    pub fn run_files(
        self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<PipelineReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        let unavailable = |source: std::io::Error| PipelineError::SourceUnavailable {
            path: input.to_path_buf(),
            source,
        };
        let mut source = BufReader::new(File::open(input).map_err(unavailable)?);
        // Opening a directory succeeds on Unix; the first read does not.
        source.fill_buf().map_err(unavailable)?;
        let sink = File::create(output).map_err(|source| PipelineError::DestinationUnavailable {
            path: output.to_path_buf(),
            source,
        })?;
        debug!(?input, ?output, "opened source and destination");

        self.run(source, BufWriter::new(sink))
    }

    /// Run one pass from `source` to `sink`.
    ///
    /// The three stages run on their own threads and are all joined before
    /// this returns. If any stage fails, the others are cancelled and the
    /// first non-cancellation error is returned.
    pub fn run<R, W>(self, source: R, sink: W) -> Result<PipelineReport>
    where
        R: BufRead + Send,
        W: Write + Send,
    {
        let started = Instant::now();
        let shared: &Shared = &self.shared;

        let frame_config = FrameConfig {
            max_payload_size: self.config.max_line_len,
        };
        let (pipe_writer, pipe_reader) = hdrstrip_transport::pipe()?;
        let transport_tx = FrameWriter::with_config_pipe(pipe_writer, frame_config.clone())?;
        let transport_rx = FrameReader::with_config(pipe_reader, frame_config);

        let producer = Producer::new(
            source,
            transport_tx,
            shared,
            self.config.max_line_len,
            self.config.overlong,
        );
        let relay = Relay::new(transport_rx, shared);
        let filter = Filter::new(
            sink,
            shared,
            HeaderFilter::new(self.config.sentinel.as_bytes(), self.config.sentinel_match),
        );

        let (produced, relayed, filtered) = thread::scope(|scope| {
            let producer = spawn_stage(scope, "producer", shared, move || producer.run());
            let relay = spawn_stage(scope, "relay", shared, move || relay.run());
            let filter = spawn_stage(scope, "filter", shared, move || filter.run());
            (
                join_stage("producer", producer),
                join_stage("relay", relay),
                join_stage("filter", filter),
            )
        });

        let (produced, relayed, filtered) = match (produced, relayed, filtered) {
            (Ok(produced), Ok(relayed), Ok(filtered)) => (produced, relayed, filtered),
            (produced, relayed, filtered) => {
                return Err(first_failure([
                    produced.err(),
                    relayed.err(),
                    filtered.err(),
                ]))
            }
        };

        let report = PipelineReport {
            lines_read: produced.lines_read,
            lines_relayed: relayed.lines_relayed,
            header_lines: filtered.header_lines,
            lines_written: filtered.lines_written,
            bytes_written: filtered.bytes_written,
            sentinel_line: filtered.sentinel_line,
            elapsed: started.elapsed(),
        };
        debug_assert_eq!(report.lines_read, report.lines_relayed);
        debug_assert_eq!(
            report.lines_relayed,
            report.header_lines + report.lines_written
        );

        if !report.found_sentinel() {
            warn!(sentinel = %self.config.sentinel, "sentinel not found; destination is empty");
        }
        info!(
            lines_read = report.lines_read,
            lines_written = report.lines_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline complete"
        );
        Ok(report)
    }
}

fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    stage: &'static str,
    shared: &'env Shared,
    body: F,
) -> Result<ScopedJoinHandle<'scope, Result<T>>>
where
    F: FnOnce() -> Result<T> + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(format!("hdrstrip-{stage}"))
        .spawn_scoped(scope, move || {
            let _guard = CancelOnPanic(&shared.turnstile);
            let result = body();
            if let Err(err) = &result {
                if !err.is_cancelled() {
                    warn!(stage, error = %err, "stage failed; cancelling pipeline");
                    shared.turnstile.close_all();
                }
            }
            result
        })
        .map_err(|source| {
            shared.turnstile.close_all();
            PipelineError::Spawn { stage, source }
        })
}

fn join_stage<T>(
    stage: &'static str,
    handle: Result<ScopedJoinHandle<'_, Result<T>>>,
) -> Result<T> {
    handle?
        .join()
        .unwrap_or_else(|_| Err(PipelineError::StagePanicked(stage)))
}

/// The error to surface when at least one stage failed.
fn first_failure(errors: [Option<PipelineError>; 3]) -> PipelineError {
    let mut cancelled = None;
    for err in errors.into_iter().flatten() {
        if err.is_cancelled() {
            cancelled.get_or_insert(err);
        } else {
            return err;
        }
    }
    cancelled.unwrap_or(PipelineError::Cancelled)
}

/// Closes the turnstile if its stage unwinds, so no peer waits forever.
struct CancelOnPanic<'a>(&'a Turnstile);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.close_all();
        }
    }
}
