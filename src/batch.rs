//! Batch driver.
//!
//! Applies the [per-file pipeline](crate::process) to a whole input tree, or
//! to a single input file, and folds the per-file results into one
//! [`BatchReport`].
//!
//! ## Modes
//!
//! | Input | Behaviour |
//! |---|---|
//! | directory | create output root, mirror every file: images through the pipeline, the rest copied |
//! | image file | create output's parent, run the pipeline once with the output path as given |
//! | other file | warn, do nothing, succeed |
//! | missing | warn, fail |
//! | directory that is also the output | refuse, fail |
//!
//! Two inputs that would land on the same output (`a.jpg` and `a.jpeg`) are
//! never raced: the first in file-name order is processed, the others fail.
//!
//! ## Failure isolation
//!
//! Every file is processed best-effort. A tool failure, I/O error or even a
//! panic inside one file's pipeline is logged with its source and destination
//! and counted, but never stops the remaining files. The run succeeds only if
//! every file did and the output root could be prepared.
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel on the global [rayon](https://docs.rs/rayon)
//! pool. Each file owns its temporaries exclusively; the only shared state is
//! the optional event channel. Counts are reduced after all workers finish.

use crate::imaging::{Scale, ToolBackend};
use crate::kind::ImageKind;
use crate::process::{
    ImageJob, ImageOutcome, PipelineOptions, ProcessError, copy_verbatim, process_image,
};
use crate::scan::{PassThrough, scan};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{error, warn};

/// Progress notification for one finished file.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Resized {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
        scale: Scale,
    },
    /// Image already within the target; copied.
    Copied {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    /// Non-image copied verbatim.
    PassedThrough { source: PathBuf, output: PathBuf },
    Failed {
        source: PathBuf,
        output: PathBuf,
        error: String,
    },
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub resized: usize,
    pub copied: usize,
    pub passed_through: usize,
    pub failed: usize,
    /// Whether the input contained at least one image.
    pub images_found: bool,
    /// Input path did not exist.
    pub input_missing: bool,
    /// Output directory could not be created.
    pub output_unavailable: bool,
    /// Output directory is the input directory; nothing was done.
    pub output_is_input: bool,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.failed == 0 && !self.input_missing && !self.output_unavailable && !self.output_is_input
    }

    fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Resized => self.resized += 1,
            FileStatus::Copied => self.copied += 1,
            FileStatus::PassedThrough => self.passed_through += 1,
            FileStatus::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileStatus {
    Resized,
    Copied,
    PassedThrough,
    Failed,
}

fn emit(events: Option<&Sender<ProcessEvent>>, event: ProcessEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn fail(
    events: Option<&Sender<ProcessEvent>>,
    source: &Path,
    output: &Path,
    error: String,
) -> FileStatus {
    error!(
        source = %source.display(),
        output = %output.display(),
        %error,
        "failed to process file"
    );
    emit(
        events,
        ProcessEvent::Failed {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            error,
        },
    );
    FileStatus::Failed
}

/// Per-file boundary: everything that goes wrong becomes `Failed`.
fn run_image(
    backend: &impl ToolBackend,
    job: &ImageJob,
    options: &PipelineOptions,
    events: Option<&Sender<ProcessEvent>>,
) -> FileStatus {
    if let Err(e) = ensure_parent(&job.output) {
        return fail(events, &job.source, &job.output, e.to_string());
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| process_image(backend, job, options)));
    match result {
        Ok(Ok(ImageOutcome::Resized {
            width,
            height,
            scale,
        })) => {
            emit(
                events,
                ProcessEvent::Resized {
                    source: job.source.clone(),
                    output: job.output.clone(),
                    width,
                    height,
                    scale,
                },
            );
            FileStatus::Resized
        }
        Ok(Ok(ImageOutcome::Copied { width, height })) => {
            emit(
                events,
                ProcessEvent::Copied {
                    source: job.source.clone(),
                    output: job.output.clone(),
                    width,
                    height,
                },
            );
            FileStatus::Copied
        }
        Ok(Err(e)) => fail(events, &job.source, &job.output, e.to_string()),
        Err(payload) => fail(
            events,
            &job.source,
            &job.output,
            format!("panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn run_pass_through(file: &PassThrough, events: Option<&Sender<ProcessEvent>>) -> FileStatus {
    let copied = ensure_parent(&file.output).and_then(|()| copy_verbatim(&file.source, &file.output));
    match copied {
        Ok(()) => {
            emit(
                events,
                ProcessEvent::PassedThrough {
                    source: file.source.clone(),
                    output: file.output.clone(),
                },
            );
            FileStatus::PassedThrough
        }
        Err(e) => fail(events, &file.source, &file.output, e.to_string()),
    }
}

/// Resize everything under (or at) `input` into `output`.
pub fn run(
    backend: &impl ToolBackend,
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
    events: Option<&Sender<ProcessEvent>>,
) -> BatchReport {
    if input.is_dir() {
        run_directory(backend, input, output, options, events)
    } else if input.is_file() {
        run_single(backend, input, output, options, events)
    } else {
        warn!(input = %input.display(), "input path does not exist");
        BatchReport {
            input_missing: true,
            ..BatchReport::default()
        }
    }
}

fn run_directory(
    backend: &impl ToolBackend,
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
    events: Option<&Sender<ProcessEvent>>,
) -> BatchReport {
    let mut report = BatchReport::default();

    let roots = fs::create_dir_all(output)
        .and_then(|()| Ok((fs::canonicalize(input)?, fs::canonicalize(output)?)));
    let (input, output) = match roots {
        Ok(roots) => roots,
        Err(e) => {
            error!(output = %output.display(), error = %e, "failed to create output directory");
            report.output_unavailable = true;
            return report;
        }
    };
    if input == output {
        error!(
            input = %input.display(),
            "output directory is the input directory, refusing to overwrite sources"
        );
        report.output_is_input = true;
        return report;
    }

    let found = scan(&input, &output);
    for e in &found.errors {
        warn!(error = %e, "failed to read input entry");
        report.failed += 1;
    }
    for job in &found.duplicates {
        let error = ProcessError::DuplicateOutput(job.output.clone()).to_string();
        report.record(fail(events, &job.source, &job.output, error));
    }

    report.images_found = !found.images.is_empty() || !found.duplicates.is_empty();
    if !report.images_found {
        warn!(input = %input.display(), "found no image files in the input folder");
    }

    let image_statuses: Vec<FileStatus> = found
        .images
        .par_iter()
        .map(|job| run_image(backend, job, options, events))
        .collect();
    let other_statuses: Vec<FileStatus> = found
        .others
        .par_iter()
        .map(|file| run_pass_through(file, events))
        .collect();

    for status in image_statuses.into_iter().chain(other_statuses) {
        report.record(status);
    }
    report
}

fn run_single(
    backend: &impl ToolBackend,
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
    events: Option<&Sender<ProcessEvent>>,
) -> BatchReport {
    let mut report = BatchReport::default();

    let Some(kind) = ImageKind::from_path(input) else {
        warn!(input = %input.display(), "unsupported file type of input file");
        return report;
    };
    report.images_found = true;

    if let Err(e) = ensure_parent(output) {
        error!(output = %output.display(), error = %e, "failed to create output directory");
        report.output_unavailable = true;
        return report;
    }

    let job = ImageJob {
        source: input.to_path_buf(),
        output: output.to_path_buf(),
        kind,
    };
    report.record(run_image(backend, &job, options, events));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{tree, write_file};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn options(length: u32) -> PipelineOptions {
        PipelineOptions {
            length,
            verbose: false,
            keep_temporaries: false,
        }
    }

    #[test]
    fn directory_run_mirrors_tree() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_file(&input.join("a.jpg"), "a");
        write_file(&input.join("trip/b.png"), "b");
        write_file(&input.join("trip/notes.txt"), "notes");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000), ("b", 800, 600)]);

        let report = run(&backend, &input, &output, &options(1920), None);

        assert!(report.success());
        assert_eq!(report.resized, 1);
        assert_eq!(report.copied, 1);
        assert_eq!(report.passed_through, 1);
        assert_eq!(tree(&output), vec!["a.jpg", "trip/b.jpg", "trip/notes.txt"]);
        assert_eq!(fs::read_to_string(output.join("trip/notes.txt")).unwrap(), "notes");
        // No temporaries left behind in the input
        assert_eq!(tree(&input), vec!["a.jpg", "trip/b.png", "trip/notes.txt"]);
    }

    #[test]
    fn one_failure_does_not_stop_the_others() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        for name in ["p1", "p2", "p3", "p4"] {
            write_file(&input.join(format!("{name}.jpg")), name);
        }
        let backend = MockBackend::with_dimensions(&[
            ("p1", 4000, 3000),
            ("p2", 4000, 3000),
            ("p3", 4000, 3000),
            ("p4", 4000, 3000),
        ])
        .failing_resize("p3");

        let report = run(&backend, &input, &output, &options(1000), None);

        assert!(!report.success());
        assert_eq!(report.resized, 3);
        assert_eq!(report.failed, 1);
        for name in ["p1", "p2", "p4"] {
            let out = fs::read_to_string(output.join(format!("{name}.jpg"))).unwrap();
            assert_eq!(out, "resized scale=-1:1000");
        }
        assert_eq!(tree(&input), vec!["p1.jpg", "p2.jpg", "p3.jpg", "p4.jpg"]);
    }

    #[test]
    fn no_images_is_a_warning_not_a_failure() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_file(&input.join("readme.md"), "# hi");
        let backend = MockBackend::new();

        let report = run(&backend, &input, &output, &options(1920), None);

        assert!(report.success());
        assert!(!report.images_found);
        assert_eq!(report.passed_through, 1);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn output_directory_equal_to_input_is_refused() {
        let tmp = TempDir::new().unwrap();
        let photos = tmp.path().join("photos");
        write_file(&photos.join("a.jpg"), "original bytes");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000)]);

        // Same directory reached through a different spelling
        let report = run(&backend, &photos, &photos.join("."), &options(1920), None);

        assert!(report.output_is_input);
        assert!(!report.success());
        assert!(backend.get_operations().is_empty());
        assert_eq!(tree(&photos), vec!["a.jpg"]);
        assert_eq!(fs::read_to_string(photos.join("a.jpg")).unwrap(), "original bytes");
    }

    #[test]
    fn single_file_onto_itself_fails_and_keeps_source() {
        let tmp = TempDir::new().unwrap();
        let photo = tmp.path().join("a.jpg");
        write_file(&photo, "original bytes");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000)]);

        let report = run(&backend, &photo, &photo, &options(1920), None);

        assert_eq!(report.failed, 1);
        assert!(!report.success());
        assert_eq!(fs::read_to_string(&photo).unwrap(), "original bytes");
    }

    #[test]
    fn user_sidecar_named_file_survives() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_file(&input.join("a.jpg"), "jpeg");
        write_file(&input.join("a.jpg.xml"), "my hand-written notes");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000)]);

        let report = run(&backend, &input, &output, &options(1920), None);

        // The image cannot get a sidecar of its own, so it fails loudly
        assert_eq!(report.failed, 1);
        assert_eq!(report.passed_through, 1);
        assert_eq!(tree(&input), vec!["a.jpg", "a.jpg.xml"]);
        assert_eq!(
            fs::read_to_string(input.join("a.jpg.xml")).unwrap(),
            "my hand-written notes"
        );
        assert_eq!(
            fs::read_to_string(output.join("a.jpg.xml")).unwrap(),
            "my hand-written notes"
        );
    }

    #[test]
    fn inputs_sharing_an_output_do_not_race() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_file(&input.join("a.jpeg"), "first");
        write_file(&input.join("a.jpg"), "second");
        let backend = MockBackend::with_dimensions(&[("a", 100, 100)]);
        let (tx, rx) = mpsc::channel();

        let report = run(&backend, &input, &output, &options(1920), Some(&tx));
        drop(tx);

        assert_eq!(report.copied, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.success());
        // First in file-name order wins
        assert_eq!(fs::read_to_string(output.join("a.jpg")).unwrap(), "first");
        let failed: Vec<PathBuf> = rx
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::Failed { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].ends_with("a.jpg"));
    }

    #[test]
    fn missing_input_fails() {
        let tmp = TempDir::new().unwrap();
        let report = run(
            &MockBackend::new(),
            &tmp.path().join("nope"),
            &tmp.path().join("out"),
            &options(1920),
            None,
        );
        assert!(report.input_missing);
        assert!(!report.success());
    }

    #[test]
    fn output_that_cannot_be_created_fails_the_run() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_file(&input.join("a.jpg"), "a");
        // A file where the output directory should go
        let output = tmp.path().join("blocked");
        write_file(&output, "");

        let report = run(&MockBackend::new(), &input, &output, &options(1920), None);

        assert!(report.output_unavailable);
        assert!(!report.success());
    }

    #[test]
    fn single_image_uses_output_path_as_given() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.jpg");
        let output = tmp.path().join("nested/dir/result.jpg");
        write_file(&input, "a");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000)]);

        let report = run(&backend, &input, &output, &options(1920), None);

        assert!(report.success());
        assert_eq!(report.resized, 1);
        assert!(output.exists());
    }

    #[test]
    fn single_unsupported_file_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("notes.txt");
        write_file(&input, "text");
        let output = tmp.path().join("out.txt");

        let report = run(&MockBackend::new(), &input, &output, &options(1920), None);

        assert!(report.success());
        assert!(!report.images_found);
        assert!(!output.exists());
    }

    #[test]
    fn unknown_dimensions_count_as_failure() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_file(&input.join("mystery.jpg"), "?");

        let report = run(&MockBackend::new(), &input, &tmp.path().join("out"), &options(1920), None);

        assert_eq!(report.failed, 1);
        assert!(!report.success());
    }

    #[test]
    fn events_are_sent_for_every_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_file(&input.join("a.jpg"), "a");
        write_file(&input.join("b.jpg"), "b");
        write_file(&input.join("c.txt"), "c");
        let backend = MockBackend::with_dimensions(&[("a", 3000, 2000), ("b", 100, 100)]);
        let (tx, rx) = mpsc::channel();

        run(&backend, &input, &tmp.path().join("out"), &options(1920), Some(&tx));
        drop(tx);
        let events: Vec<ProcessEvent> = rx.iter().collect();

        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().filter(|e| matches!(e, ProcessEvent::Resized { .. })).count(),
            1
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, ProcessEvent::Copied { .. })).count(),
            1
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, ProcessEvent::PassedThrough { .. })).count(),
            1
        );
    }

    #[test]
    fn panic_message_extracts_strings() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"boom".to_string()), "boom");
        assert_eq!(panic_message(&42), "unknown panic");
    }
}
