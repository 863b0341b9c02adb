// 该文件是 Renshu （人数） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use renshu::{
  Counter,
  input::collect_images,
  output::DirectoryRecordOutput,
  task::{BatchTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  let config = args.counter_config();
  config.validate()?;

  info!("主模型: {}", config.primary_model_endpoint);
  if let Some(lite) = &config.lite_model_endpoint {
    info!("轻量模型: {}", lite);
  }
  info!("人脸模型: {}", config.fallback_model_path.display());
  info!("输出目录: {}", args.output.display());

  let images = collect_images(&args.inputs)?;
  if images.is_empty() {
    warn!("没有可处理的图像");
    return Ok(());
  }

  let counter = Counter::from_config(&config);
  counter.warm_up();

  let output = DirectoryRecordOutput::new(&args.output);
  let records = BatchTask::default()
    .with_max_images(args.max_images)
    .with_ctrlc()?
    .run_task(images.into_iter(), &counter, output)?;

  let total: usize = records.iter().map(|r| r.people_count).sum();
  info!("共处理 {} 张图像，总人数: {}", records.len(), total);

  Ok(())
}
