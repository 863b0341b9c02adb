// 该文件是 Renshu （人数） 项目的一部分。
// tests/batch_output.rs - 批处理与报表输出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod common;

use std::{path::Path, sync::mpsc::channel};

use chrono::{NaiveDate, NaiveDateTime};
use renshu::{
  Counter,
  counter::METHOD_FAILED,
  input::{ImageFileInput, collect_images},
  model::{Label, LazyModel},
  output::{DirectoryRecordOutput, SaveImageFileOutput},
  task::{BatchTask, OneShotTask, Task},
  threshold::ThresholdPolicy,
};

use common::{FakeDetector, items, write_png};

fn created_at() -> NaiveDateTime {
  NaiveDate::from_ymd_opt(2026, 5, 2)
    .and_then(|d| d.and_hms_opt(8, 15, 0))
    .unwrap()
}

fn counter() -> Counter<FakeDetector, FakeDetector> {
  Counter::new(
    LazyModel::ready(
      "EfficientDet",
      FakeDetector::new("EfficientDet D1", items(Label::Person, &[0.9, 0.8, 0.7, 0.6, 0.5, 0.4])),
    ),
    LazyModel::ready(
      "Face Cascade",
      FakeDetector::new("Face Cascade", items(Label::Face, &[0.9])),
    ),
    ThresholdPolicy::default(),
    0,
  )
}

fn prepare_inputs(dir: &Path) {
  write_png(dir, "a.png", 40, 30);
  write_png(dir, "b.png", 50, 40);
  std::fs::write(dir.join("c_broken.jpg"), b"garbage").unwrap();
  std::fs::write(dir.join("notes.txt"), b"not an image").unwrap();
}

#[test]
fn batch_writes_annotated_images_and_reports() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  prepare_inputs(input_dir.path());

  let images = collect_images(&[input_dir.path().to_path_buf()]).unwrap();
  let names = images.iter().map(|i| i.name()).collect::<Vec<_>>();
  assert_eq!(names, ["a.png", "b.png", "c_broken.jpg"]);

  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());
  let csv_path = output.report().csv_path();
  let json_path = output.report().json_path();

  let records = BatchTask::default()
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  assert_eq!(records.len(), 3);
  assert_eq!(records[0].people_count, 6);
  assert_eq!(records[1].people_count, 6);
  assert_eq!(records[2].people_count, 0);
  assert_eq!(records[2].method, METHOD_FAILED);
  assert!(records[2].processed_path.is_none());

  assert!(output_dir.path().join("processed_a.png").is_file());
  assert!(output_dir.path().join("processed_b.png").is_file());
  assert!(!output_dir.path().join("processed_c_broken.jpg").exists());
  assert!(!output_dir.path().join("processed_notes.txt").exists());

  let saved = image::open(output_dir.path().join("processed_b.png")).unwrap();
  assert_eq!((saved.width(), saved.height()), (50, 40));

  assert_eq!(
    csv_path.file_name().unwrap(),
    "people_count_results_20260502_081500.csv"
  );
  let csv = std::fs::read_to_string(&csv_path).unwrap();
  let lines = csv.lines().collect::<Vec<_>>();
  assert_eq!(lines[0], "image_name,people_count,method");
  assert_eq!(lines[1], "a.png,6,EfficientDet D1 (threshold: 0.23)");
  assert_eq!(lines[3], "c_broken.jpg,0,Detection Failed");

  let json: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
  assert_eq!(json["total_images"], 3);
  assert_eq!(json["total_people"], 12);
  assert_eq!(json["results"][1]["image_name"], "b.png");
  assert!(json["results"][2]["processed_image"].is_null());
}

#[test]
fn interrupted_batch_still_reports_processed_images() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  prepare_inputs(input_dir.path());

  let images = collect_images(&[input_dir.path().to_path_buf()]).unwrap();
  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());
  let json_path = output.report().json_path();

  let (tx, rx) = channel();
  tx.send(()).unwrap();
  let records = BatchTask::default()
    .with_interrupt(rx)
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  assert_eq!(records.len(), 1);
  assert!(output_dir.path().join("processed_a.png").is_file());
  assert!(!output_dir.path().join("processed_b.png").exists());

  let json: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
  assert_eq!(json["total_images"], 1);
}

#[test]
fn max_images_limits_batch() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  prepare_inputs(input_dir.path());

  let images = collect_images(&[input_dir.path().to_path_buf()]).unwrap();
  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());

  let records = BatchTask::default()
    .with_max_images(Some(2))
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  let names = records.iter().map(|r| r.image_name.as_str()).collect::<Vec<_>>();
  assert_eq!(names, ["a.png", "b.png"]);
}

#[test]
fn one_shot_saves_single_annotated_image() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  prepare_inputs(input_dir.path());

  let images = collect_images(&[input_dir.path().join("b.png")]).unwrap();
  let target = output_dir.path().join("nested").join("result.png");
  let counter = counter();

  let records = OneShotTask
    .run_task(images.into_iter(), &counter, SaveImageFileOutput::new(&target))
    .unwrap();

  assert_eq!(records.len(), 1);
  assert_eq!(records[0].people_count, 6);
  assert_eq!(records[0].processed_path.as_deref(), Some(target.as_path()));
  assert!(target.is_file());
}

#[test]
fn one_shot_without_input_is_an_error() {
  let output_dir = tempfile::tempdir().unwrap();
  let counter = counter();
  let result = OneShotTask.run_task(
    Vec::<ImageFileInput>::new().into_iter(),
    &counter,
    SaveImageFileOutput::new(output_dir.path().join("x.png")),
  );
  assert!(result.is_err());
}

#[test]
fn failed_save_does_not_stop_the_batch() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  write_png(input_dir.path(), "a.png", 40, 30);
  write_png(input_dir.path(), "b.png", 40, 30);
  write_png(input_dir.path(), "c.png", 40, 30);
  // 目标路径被目录占用，b.png 的标注图像无法写出
  std::fs::create_dir(output_dir.path().join("processed_b.png")).unwrap();

  let images = collect_images(&[input_dir.path().to_path_buf()]).unwrap();
  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());
  let csv_path = output.report().csv_path();

  let records = BatchTask::default()
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  assert_eq!(records.len(), 3);
  assert_eq!(records[1].image_name, "b.png");
  assert_eq!(records[1].people_count, 6);
  assert!(records[1].processed_path.is_none());
  assert!(records[2].processed_path.is_some());
  assert!(output_dir.path().join("processed_c.png").is_file());

  let csv = std::fs::read_to_string(&csv_path).unwrap();
  assert_eq!(csv.lines().count(), 4);
  assert!(csv.contains("b.png,6,"));
}

#[test]
fn zero_max_images_processes_nothing() {
  let input_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  prepare_inputs(input_dir.path());

  let images = collect_images(&[input_dir.path().to_path_buf()]).unwrap();
  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());
  let json_path = output.report().json_path();

  let records = BatchTask::default()
    .with_max_images(Some(0))
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  assert!(records.is_empty());
  assert!(!output_dir.path().join("processed_a.png").exists());
  let json: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
  assert_eq!(json["total_images"], 0);
}

#[test]
fn same_names_from_different_directories_are_kept_apart() {
  let first_dir = tempfile::tempdir().unwrap();
  let second_dir = tempfile::tempdir().unwrap();
  let output_dir = tempfile::tempdir().unwrap();
  write_png(first_dir.path(), "a.png", 40, 30);
  write_png(second_dir.path(), "a.png", 24, 18);

  let images = collect_images(&[
    first_dir.path().join("a.png"),
    second_dir.path().join("a.png"),
  ])
  .unwrap();
  let counter = counter();
  let output = DirectoryRecordOutput::with_time(output_dir.path(), created_at());

  let records = BatchTask::default()
    .run_task(images.into_iter(), &counter, output)
    .unwrap();

  let first = output_dir.path().join("processed_a.png");
  let second = output_dir.path().join("processed_a_2.png");
  assert_eq!(records[0].processed_path.as_deref(), Some(first.as_path()));
  assert_eq!(records[1].processed_path.as_deref(), Some(second.as_path()));
  assert_eq!(image::open(&first).unwrap().width(), 40);
  assert_eq!(image::open(&second).unwrap().width(), 24);
}
