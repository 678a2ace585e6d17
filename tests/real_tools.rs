//! Integration tests against the real external tools.
//!
//! Need `exiftool`, `ffmpeg` and ImageMagick (`magick`) on PATH. Fixtures
//! are generated with ffmpeg's `lavfi` colour source.
//!
//! Run with: cargo test --test real_tools -- --ignored

use img_resizer::batch;
use img_resizer::imaging::ExternalBackend;
use img_resizer::process::PipelineOptions;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn generate_image(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let out = Command::new("ffmpeg")
        .args(["-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(format!("color=c=teal:s={width}x{height}"))
        .args(["-frames:v", "1", "-y"])
        .arg(path)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "ffmpeg failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

fn tag(path: &Path, name: &str) -> String {
    let out = Command::new("exiftool")
        .arg("-s3")
        .arg(format!("-{name}"))
        .arg(path)
        .output()
        .unwrap();
    assert!(out.status.success());
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn set_artist(path: &Path, artist: &str) {
    let out = Command::new("exiftool")
        .args(["-overwrite_original", &format!("-Artist={artist}")])
        .arg(path)
        .output()
        .unwrap();
    assert!(out.status.success());
}

fn options(length: u32) -> PipelineOptions {
    PipelineOptions {
        length,
        verbose: false,
        keep_temporaries: false,
    }
}

#[test]
#[ignore = "requires exiftool, ffmpeg and ImageMagick"]
fn resizes_jpeg_and_keeps_metadata() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    let source = input.join("wide.jpg");
    generate_image(&source, 640, 480);
    set_artist(&source, "Test Artist");

    let report = batch::run(&ExternalBackend::default(), &input, &output, &options(240), None);

    assert!(report.success(), "{report:?}");
    let result = output.join("wide.jpg");
    assert_eq!(tag(&result, "ImageHeight"), "240");
    assert_eq!(tag(&result, "ImageWidth"), "320");
    assert_eq!(tag(&result, "Artist"), "Test Artist");
    assert!(!input.join("wide.jpg.xml").exists());
}

#[test]
#[ignore = "requires exiftool, ffmpeg and ImageMagick"]
fn normalizes_png_to_jpeg() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    generate_image(&input.join("tall.png"), 300, 600);

    let report = batch::run(&ExternalBackend::default(), &input, &output, &options(150), None);

    assert!(report.success(), "{report:?}");
    let result = output.join("tall.jpg");
    assert_eq!(tag(&result, "FileType"), "JPEG");
    assert_eq!(tag(&result, "ImageWidth"), "150");
    assert!(!input.join("tall.jpg").exists());
}

#[test]
#[ignore = "requires exiftool, ffmpeg and ImageMagick"]
fn small_image_is_copied() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    generate_image(&input.join("icon.jpg"), 64, 48);

    let report = batch::run(&ExternalBackend::default(), &input, &output, &options(1920), None);

    assert!(report.success());
    assert_eq!(report.copied, 1);
    assert_eq!(
        std::fs::read(input.join("icon.jpg")).unwrap(),
        std::fs::read(output.join("icon.jpg")).unwrap()
    );
}
