use hdrstrip_pipeline::{CancelHandle, Pipeline, PipelineConfig};
use tracing::debug;

use crate::cmd::StripArgs;
use crate::exit::{pipeline_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: StripArgs, format: OutputFormat) -> CliResult<i32> {
    let config = PipelineConfig {
        sentinel: args.sentinel.clone(),
        sentinel_match: args.match_mode.into(),
        max_line_len: args.max_line_len,
        overlong: args.overlong.into(),
    };
    debug!(?config, input = ?args.input, output = ?args.output, "starting strip");

    let pipeline = Pipeline::new(config).map_err(pipeline_error)?;
    install_ctrlc_handler(pipeline.cancel_handle())?;

    let report = pipeline
        .run_files(&args.input, &args.output)
        .map_err(pipeline_error)?;

    if !args.quiet {
        print_report(&report, &args.input, &args.output, &args.sentinel, format);
    }

    if args.require_sentinel && !report.found_sentinel() {
        return Err(CliError::new(
            FAILURE,
            format!(
                "sentinel {:?} not found in {}",
                args.sentinel,
                args.input.display()
            ),
        ));
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(handle: CancelHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
