//! End-to-end tests for the `slide-curate` binary.

use assert_fs::prelude::*;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::process::Command;

fn slide(shade: u8) -> RgbImage {
    RgbImage::from_fn(40, 30, |x, y| {
        let v = if (x / 5 + y / 5) % 2 == 0 { shade } else { 255 - shade };
        Rgb([v, v, v])
    })
}

fn curate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_slide-curate"))
}

#[test]
fn curate_writes_the_default_pdf() {
    let temp = assert_fs::TempDir::new().unwrap();
    let folder = temp.child("lecture");
    folder.create_dir_all().unwrap();
    slide(20).save(folder.child("1.png").path()).unwrap();
    slide(235).save(folder.child("2.png").path()).unwrap();

    let output = curate()
        .arg("curate")
        .arg(folder.path())
        .args(["--output-format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    folder
        .child("lecture.pdf")
        .assert(predicate::path::is_file());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert!(report["pages"].as_u64().unwrap() >= 1);
}

#[test]
fn scan_lists_in_natural_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    for name in ["img10.png", "img2.png", "img1.png"] {
        slide(60).save(temp.child(name).path()).unwrap();
    }

    let output = curate()
        .arg("scan")
        .arg(temp.path())
        .args(["--output-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["img1.png", "img2.png", "img10.png"]);
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let temp = assert_fs::TempDir::new().unwrap();
    let output = curate()
        .arg("curate")
        .arg(temp.path())
        .args(["--watermark-threshold", "1.5"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("1.5").eval(&stderr));
    temp.child("out.pdf").assert(predicate::path::missing());
}
