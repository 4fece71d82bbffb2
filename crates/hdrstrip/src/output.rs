use std::io::IsTerminal;
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hdrstrip_pipeline::PipelineReport;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    input: String,
    output: String,
    sentinel: &'a str,
    sentinel_line: Option<u64>,
    lines_read: u64,
    lines_relayed: u64,
    header_lines: u64,
    lines_written: u64,
    bytes_written: u64,
    elapsed_ms: u64,
}

impl<'a> ReportOutput<'a> {
    fn new(report: &PipelineReport, input: &Path, output: &Path, sentinel: &'a str) -> Self {
        Self {
            input: input.display().to_string(),
            output: output.display().to_string(),
            sentinel,
            sentinel_line: report.sentinel_line,
            lines_read: report.lines_read,
            lines_relayed: report.lines_relayed,
            header_lines: report.header_lines,
            lines_written: report.lines_written,
            bytes_written: report.bytes_written,
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

pub fn print_report(
    report: &PipelineReport,
    input: &Path,
    output: &Path,
    sentinel: &str,
    format: OutputFormat,
) {
    let out = ReportOutput::new(report, input, output, sentinel);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["input".to_string(), out.input.clone()])
                .add_row(vec!["output".to_string(), out.output.clone()])
                .add_row(vec!["sentinel".to_string(), out.sentinel.to_string()])
                .add_row(vec!["sentinel line".to_string(), sentinel_line(out.sentinel_line)])
                .add_row(vec!["lines read".to_string(), out.lines_read.to_string()])
                .add_row(vec!["lines relayed".to_string(), out.lines_relayed.to_string()])
                .add_row(vec!["header lines".to_string(), out.header_lines.to_string()])
                .add_row(vec!["lines written".to_string(), out.lines_written.to_string()])
                .add_row(vec!["bytes written".to_string(), out.bytes_written.to_string()])
                .add_row(vec!["elapsed".to_string(), format!("{} ms", out.elapsed_ms)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} -> {}: {} of {} lines written ({} bytes), sentinel {} [{} ms]",
                out.input,
                out.output,
                out.lines_written,
                out.lines_read,
                out.bytes_written,
                sentinel_line(out.sentinel_line),
                out.elapsed_ms
            );
        }
    }
}

fn sentinel_line(line: Option<u64>) -> String {
    match line {
        Some(line) => format!("at line {line}"),
        None => "not found".to_string(),
    }
}
