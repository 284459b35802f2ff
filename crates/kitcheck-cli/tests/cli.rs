use assert_cmd::Command;
use kitcheck::analyze::{FoamColor, Template, ToolDefinition};
use kitcheck::core::Region;
use predicates::prelude::*;
use std::path::Path;

fn write_photo(path: &Path, slot_rgb: [u8; 3]) {
    let mut img = image::RgbImage::from_pixel(120, 100, image::Rgb([15, 15, 15]));
    for y in 20..70 {
        for x in 30..90 {
            img.put_pixel(x, y, image::Rgb(slot_rgb));
        }
    }
    img.save_with_format(path, image::ImageFormat::Png)
        .expect("write photo");
}

fn demo_template() -> Template {
    Template {
        template_id: "demo".into(),
        name: "Demo kit".into(),
        description: None,
        foam_color: FoamColor::DarkGrey,
        image_width: 120,
        image_height: 100,
        tools: vec![ToolDefinition {
            tool_id: "driver".into(),
            name: "Driver".into(),
            description: None,
            slot_index: 1,
            region: Some(Region::Rect {
                x: 30,
                y: 20,
                width: 60,
                height: 50,
            }),
        }],
        thresholds: None,
        reference_markers: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

fn kitcheck() -> Command {
    Command::cargo_bin("kitcheck").expect("binary")
}

#[test]
fn help_lists_subcommands() {
    kitcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect-markers"))
        .stdout(predicate::str::contains("checkin"));
}

#[test]
fn detect_markers_reports_empty_for_blank_photo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let photo = dir.path().join("blank.png");
    image::RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]))
        .save_with_format(&photo, image::ImageFormat::Png)
        .expect("write");

    kitcheck()
        .args(["detect-markers", "--image"])
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"));
}

#[test]
fn analyze_writes_report_and_annotated_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template_path = dir.path().join("template.json");
    let photo_path = dir.path().join("photo.png");
    let report_path = dir.path().join("report.json");
    let annotated_path = dir.path().join("annotated.png");

    std::fs::write(
        &template_path,
        serde_json::to_string_pretty(&demo_template()).expect("template json"),
    )
    .expect("write template");
    write_photo(&photo_path, [220, 30, 30]);

    kitcheck()
        .args(["analyze", "--template"])
        .arg(&template_path)
        .arg("--image")
        .arg(&photo_path)
        .arg("--report")
        .arg(&report_path)
        .arg("--annotated")
        .arg(&annotated_path)
        .assert()
        .success();

    let report = std::fs::read_to_string(&report_path).expect("report");
    assert!(report.contains("\"status\": \"complete\""));
    assert!(report.contains("\"present\": 1"));

    let annotated = image::open(&annotated_path).expect("annotated decodes");
    assert_eq!(annotated.width(), 120);
}

#[test]
fn checkin_cycle_through_the_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(data_dir.join("templates")).expect("mkdir");
    std::fs::write(
        data_dir.join("templates/demo.json"),
        serde_json::to_string_pretty(&demo_template()).expect("template json"),
    )
    .expect("write template");

    let photo = dir.path().join("photo.png");
    write_photo(&photo, [15, 15, 15]); // empty slot

    kitcheck()
        .args(["create-toolkit", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1", "--template", "demo", "--name", "Kit one"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"never_checked\""));

    kitcheck()
        .args(["checkin", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1", "--image"])
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"incomplete\""));

    kitcheck()
        .args(["checkout", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"checked_out\""));

    kitcheck()
        .args(["history", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ci_KIT-1_"));
}

#[test]
fn set_reference_adopts_the_image_dimensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(data_dir.join("templates")).expect("mkdir");
    std::fs::write(
        data_dir.join("templates/demo.json"),
        serde_json::to_string_pretty(&demo_template()).expect("template json"),
    )
    .expect("write template");

    // marker-less reference: dimensions update, layout stays cleared
    let photo = dir.path().join("reference.png");
    image::RgbImage::from_pixel(64, 48, image::Rgb([200, 200, 200]))
        .save_with_format(&photo, image::ImageFormat::Png)
        .expect("write");

    kitcheck()
        .args(["set-reference", "--data-dir"])
        .arg(&data_dir)
        .args(["--template", "demo", "--image"])
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"image_width\": 64"))
        .stdout(predicate::str::contains("\"reference_markers\": null"));
}

#[test]
fn checkout_before_first_checkin_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(data_dir.join("templates")).expect("mkdir");
    std::fs::write(
        data_dir.join("templates/demo.json"),
        serde_json::to_string_pretty(&demo_template()).expect("template json"),
    )
    .expect("write template");

    kitcheck()
        .args(["create-toolkit", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1", "--template", "demo", "--name", "Kit one"])
        .assert()
        .success();

    kitcheck()
        .args(["checkout", "--data-dir"])
        .arg(&data_dir)
        .args(["--toolkit", "KIT-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot check out"));
}
