// 该文件是 Renshu （人数） 项目的一部分。
// src/output.rs - 输出定义
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

use crate::{counter::CountResult, input::ImageFileInput};

pub trait Render<Frame, Output>: Sized {
  type Error;

  /// 输出一张图像的结果，返回其处理记录
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<BatchRecord, Self::Error>;

  /// 所有图像处理完成后调用
  fn finish(&self, _records: &[BatchRecord]) -> Result<(), Self::Error> {
    Ok(())
  }
}

pub mod draw;

mod directory_record;
mod report;
mod save_image_file;

pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};
pub use self::report::{BatchRecord, Record, ReportError};
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

impl BatchRecord {
  pub fn from_result(input: &ImageFileInput, result: &CountResult) -> Self {
    BatchRecord {
      image_name: input.name(),
      people_count: result.count,
      method: result.method.clone(),
      processed_path: None,
    }
  }
}
