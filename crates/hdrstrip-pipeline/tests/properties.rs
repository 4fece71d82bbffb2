#![cfg(unix)]

use std::io::Cursor;

use hdrstrip_pipeline::{Pipeline, PipelineConfig, PipelineReport};
use proptest::prelude::*;

const SENTINEL: &str = "end_header";

fn run(input: &[u8]) -> (Vec<u8>, PipelineReport) {
    let mut out = Vec::new();
    let report = Pipeline::new(PipelineConfig::default())
        .expect("default config is valid")
        .run(Cursor::new(input.to_vec()), &mut out)
        .expect("pipeline should complete");
    (out, report)
}

/// Newline-terminated lines that never contain the sentinel.
fn plain_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9 :_]{0,40}", 0..40).prop_map(|lines| {
        lines
            .into_iter()
            .filter(|line| !line.contains(SENTINEL))
            .map(|line| format!("{line}\n"))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn writes_exactly_the_lines_after_the_sentinel(
        header in plain_lines(),
        content in plain_lines(),
    ) {
        let mut input = header.concat();
        input.push_str(SENTINEL);
        input.push('\n');
        input.push_str(&content.concat());

        let (out, report) = run(input.as_bytes());

        prop_assert_eq!(out, content.concat().into_bytes());
        prop_assert_eq!(report.lines_read, (header.len() + 1 + content.len()) as u64);
        prop_assert_eq!(report.lines_relayed, report.lines_read);
        prop_assert_eq!(report.lines_written, content.len() as u64);
        prop_assert_eq!(report.sentinel_line, Some(header.len() as u64 + 1));
    }

    #[test]
    fn without_sentinel_nothing_is_written(lines in plain_lines()) {
        let input = lines.concat();
        let (out, report) = run(input.as_bytes());

        prop_assert!(out.is_empty());
        prop_assert_eq!(report.lines_relayed, lines.len() as u64);
        prop_assert_eq!(report.header_lines, lines.len() as u64);
        prop_assert_eq!(report.sentinel_line, None);
    }

    #[test]
    fn repeated_runs_match(header in plain_lines(), content in plain_lines()) {
        let input = format!("{}{SENTINEL}\n{}", header.concat(), content.concat());
        let (first, _) = run(input.as_bytes());
        let (second, _) = run(input.as_bytes());
        prop_assert_eq!(first, second);
    }
}
