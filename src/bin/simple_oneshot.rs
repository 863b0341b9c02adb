// 该文件是 Renshu （人数） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像计数
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use renshu::{
  Counter, CounterConfig, FromUrl,
  input::ImageFileInput,
  output::{Render, SaveImageFileOutput},
  task::{OneShotTask, Task},
};
use tracing::info;

/// Renshu 单张图像计数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 主检测模型地址
  #[arg(long, value_name = "MODEL", env = "RENSHU_PRIMARY_MODEL")]
  pub model: Option<Url>,
  /// 人脸检测模型文件路径
  #[arg(long, value_name = "FILE", env = "RENSHU_FACE_MODEL")]
  pub face_model: Option<PathBuf>,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 标注图像保存路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
}

/// 不保存标注图像，只输出计数
struct LogOnly;

impl Render<ImageFileInput, renshu::CountResult> for LogOnly {
  type Error = std::convert::Infallible;

  fn render_result(
    &self,
    frame: &ImageFileInput,
    result: &renshu::CountResult,
  ) -> Result<renshu::output::BatchRecord, Self::Error> {
    Ok(renshu::output::BatchRecord::from_result(frame, result))
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let mut config = CounterConfig::default();
  if let Some(model) = args.model {
    config.primary_model_endpoint = model;
  }
  if let Some(face_model) = args.face_model {
    config.fallback_model_path = face_model;
  }
  config.validate()?;

  info!("模型地址: {}", config.primary_model_endpoint);
  info!("输入来源: {}", args.input);

  let input = ImageFileInput::from_url(&args.input)?;
  let counter = Counter::from_config(&config);

  let records = match &args.output {
    Some(output) => {
      info!("输出路径: {}", output);
      let output = SaveImageFileOutput::from_url(output)?;
      OneShotTask.run_task(std::iter::once(input), &counter, output)?
    }
    None => OneShotTask.run_task(std::iter::once(input), &counter, LogOnly)?,
  };

  for record in records {
    println!("{}: {} ({})", record.image_name, record.people_count, record.method);
  }

  Ok(())
}
