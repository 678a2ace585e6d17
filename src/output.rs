//! CLI output formatting.
//!
//! # Output Format
//!
//! A run prints a header, one entry per finished file in completion order,
//! and a summary:
//!
//! ```text
//! Input:  /photos/in
//! Output: /photos/out
//! Length: 1920px
//!
//! Resized /photos/in/a.jpg → /photos/out/a.jpg
//!     3000x2000, scale=-1:1920
//! Copied /photos/in/trip/b.png → /photos/out/trip/b.jpg
//!     800x600, within target
//! Passed through /photos/in/trip/notes.txt → /photos/out/trip/notes.txt
//! Failed /photos/in/c.heic → /photos/out/c.jpg
//!     Error: Tool failed: ffmpeg failed: exit code 1
//!
//! Resized 1 image, copied 1 image, passed through 1 file, 1 failed
//! Finished with failures in 4.2s
//! ```
//!
//! # Architecture
//!
//! Each piece has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Diagnostics go through
//! `tracing` to stderr and are not formatted here.

use crate::batch::{BatchReport, ProcessEvent};
use std::path::Path;
use std::time::Duration;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn transfer_line(verb: &str, source: &Path, output: &Path) -> String {
    format!("{} {} \u{2192} {}", verb, source.display(), output.display())
}

/// `1 image`, `2 images`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let whole = elapsed.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}

/// Lines echoing what the run is about to do.
pub fn format_run_header(length: u32, input: &Path, output: &Path) -> Vec<String> {
    vec![
        format!("Input:  {}", input.display()),
        format!("Output: {}", output.display()),
        format!("Length: {length}px"),
    ]
}

pub fn print_run_header(length: u32, input: &Path, output: &Path) {
    for line in format_run_header(length, input, output) {
        println!("{}", line);
    }
    println!();
}

/// Format a single progress event.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Resized {
            source,
            output,
            width,
            height,
            scale,
        } => vec![
            transfer_line("Resized", source, output),
            format!("{}{}x{}, {}", indent(1), width, height, scale),
        ],
        ProcessEvent::Copied {
            source,
            output,
            width,
            height,
        } => vec![
            transfer_line("Copied", source, output),
            format!("{}{}x{}, within target", indent(1), width, height),
        ],
        ProcessEvent::PassedThrough { source, output } => {
            vec![transfer_line("Passed through", source, output)]
        }
        ProcessEvent::Failed {
            source,
            output,
            error,
        } => vec![
            transfer_line("Failed", source, output),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

/// Format the end-of-run summary and finish message.
pub fn format_summary(report: &BatchReport, elapsed: Duration) -> Vec<String> {
    let mut lines = Vec::new();

    if report.input_missing {
        lines.push("Input path not found".to_string());
    } else if report.output_unavailable {
        lines.push("Output directory could not be prepared".to_string());
    } else if report.output_is_input {
        lines.push("Output directory is the input directory".to_string());
    } else {
        if !report.images_found {
            lines.push("No image files found".to_string());
        }
        let mut parts = vec![
            format!("Resized {}", count(report.resized, "image")),
            format!("copied {}", count(report.copied, "image")),
        ];
        if report.passed_through > 0 {
            parts.push(format!("passed through {}", count(report.passed_through, "file")));
        }
        if report.failed > 0 {
            parts.push(format!("{} failed", report.failed));
        }
        lines.push(parts.join(", "));
    }

    let status = if report.success() {
        "Finished"
    } else {
        "Finished with failures"
    };
    lines.push(format!("{} in {}", status, format_elapsed(elapsed)));
    lines
}

pub fn print_summary(report: &BatchReport, elapsed: Duration) {
    println!();
    for line in format_summary(report, elapsed) {
        println!("{}", line);
    }
}
