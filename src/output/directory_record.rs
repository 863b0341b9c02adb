// 该文件是 Renshu （人数） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::info;

use crate::{
  counter::CountResult,
  input::ImageFileInput,
  output::{BatchRecord, Record, ReportError, Render},
};

const PROCESSED_PREFIX: &str = "processed_";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("报表错误: {0}")]
  ReportError(#[from] ReportError),
}

/// 将标注图像保存为 `processed_<原文件名>`，并在结束时写出统计报表。
/// 重名的输入依次保存为 `processed_<名称>_2.<扩展名>`、`_3` ...
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record: Record,
  seen: Mutex<HashMap<String, usize>>,
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    Self::with_time(directory, Local::now().naive_local())
  }

  /// 报表文件名使用给定的时间戳
  pub fn with_time(directory: impl AsRef<Path>, created_at: NaiveDateTime) -> Self {
    let directory = directory.as_ref().to_path_buf();
    DirectoryRecordOutput {
      record: Record::new(&directory, created_at),
      directory,
      seen: Mutex::new(HashMap::new()),
    }
  }

  pub fn report(&self) -> &Record {
    &self.record
  }

  fn processed_path(&self, input: &ImageFileInput) -> PathBuf {
    let name = input.name();
    let ordinal = {
      let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
      let ordinal = seen.entry(name.clone()).or_insert(0);
      *ordinal += 1;
      *ordinal
    };

    self
      .directory
      .join(format!("{}{}", PROCESSED_PREFIX, ordinal_name(&name, ordinal)))
  }
}

/// 第一次出现的名称保持不变，之后在扩展名前追加序号
fn ordinal_name(name: &str, ordinal: usize) -> String {
  if ordinal <= 1 {
    return name.to_string();
  }
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, ordinal, ext),
    _ => format!("{}_{}", name, ordinal),
  }
}

impl Render<ImageFileInput, CountResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(
    &self,
    frame: &ImageFileInput,
    result: &CountResult,
  ) -> Result<BatchRecord, Self::Error> {
    let mut record = BatchRecord::from_result(frame, result);

    if let Some(image) = &result.annotated_image {
      std::fs::create_dir_all(&self.directory)?;
      let path = self.processed_path(frame);
      image.save(&path)?;
      info!("保存标注图像: {}", path.display());
      record.processed_path = Some(path);
    }

    Ok(record)
  }

  fn finish(&self, records: &[BatchRecord]) -> Result<(), Self::Error> {
    self.record.record(records)?;
    Ok(())
  }
}
