// 该文件是 Renshu （人数） 项目的一部分。
// src/output/report.rs - 批处理统计报表
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

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

const REPORT_PREFIX: &str = "people_count_results";
const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 单张图像的处理记录
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
  pub image_name: String,
  pub people_count: usize,
  pub method: String,
  pub processed_path: Option<PathBuf>,
}

pub struct Record {
  directory: PathBuf,
  stem: String,
}

impl Record {
  pub fn new(directory: impl Into<PathBuf>, created_at: NaiveDateTime) -> Self {
    Record {
      directory: directory.into(),
      stem: format!(
        "{}_{}",
        REPORT_PREFIX,
        created_at.format(REPORT_TIMESTAMP_FORMAT)
      ),
    }
  }

  pub fn csv_path(&self) -> PathBuf {
    self.directory.join(format!("{}.csv", self.stem))
  }

  pub fn json_path(&self) -> PathBuf {
    self.directory.join(format!("{}.json", self.stem))
  }

  /// 写出 CSV 表格和 JSON 汇总，返回 (csv, json) 路径
  pub fn record(&self, records: &[BatchRecord]) -> Result<(PathBuf, PathBuf), ReportError> {
    std::fs::create_dir_all(&self.directory)?;

    let csv_path = self.csv_path();
    write_csv(&csv_path, records)?;

    let json_path = self.json_path();
    write_json(&json_path, records)?;

    info!(
      "报表已写出: {} / {}",
      csv_path.display(),
      json_path.display()
    );
    Ok((csv_path, json_path))
  }
}

fn csv_field(value: &str) -> String {
  if value.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

pub fn write_csv(path: &Path, records: &[BatchRecord]) -> Result<(), ReportError> {
  let mut lines = vec!["image_name,people_count,method".to_string()];
  for record in records {
    lines.push(format!(
      "{},{},{}",
      csv_field(&record.image_name),
      record.people_count,
      csv_field(&record.method)
    ));
  }
  lines.push(String::new());
  std::fs::write(path, lines.join("\n"))?;
  Ok(())
}

pub fn write_json(path: &Path, records: &[BatchRecord]) -> Result<(), ReportError> {
  let results = records
    .iter()
    .map(|record| {
      serde_json::json!({
        "image_name": record.image_name,
        "people_count": record.people_count,
        "method": record.method,
        "processed_image": record
          .processed_path
          .as_ref()
          .map(|path| path.display().to_string()),
      })
    })
    .collect::<Vec<_>>();

  let summary = serde_json::json!({
    "total_images": records.len(),
    "total_people": records.iter().map(|r| r.people_count).sum::<usize>(),
    "results": results,
  });

  std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
  Ok(())
}
