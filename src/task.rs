// 该文件是 Renshu （人数） 项目的一部分。
// src/task.rs - 计数任务
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
  sync::mpsc::{Receiver, channel},
  thread,
  time::{Duration, Instant},
};

use image::RgbImage;
use tracing::{info, warn};

use crate::{
  counter::{CountResult, Counter},
  input::ImageFileInput,
  model::{DetectResult, Model},
  output::{BatchRecord, Render},
};

pub trait Task<I, C, O>: Sized {
  type Error;
  fn run_task(self, input: I, counter: C, output: O) -> Result<Vec<BatchRecord>, Self::Error>;
}

/// 只处理第一张图像
pub struct OneShotTask;

impl<'a, P, S, RE, I, O> Task<I, &'a Counter<P, S>, O> for OneShotTask
where
  P: Model<Input = RgbImage, Output = DetectResult>,
  P::Error: std::fmt::Display,
  S: Model<Input = RgbImage, Output = DetectResult>,
  S::Error: std::fmt::Display,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = ImageFileInput>,
  O: Render<ImageFileInput, CountResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    counter: &'a Counter<P, S>,
    output: O,
  ) -> Result<Vec<BatchRecord>, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let now = Instant::now();
    let result = counter.count_with_fallback(&frame);
    info!(
      "{}: {} 人 [{}]，耗时: {:.2?}",
      frame.name(),
      result.count,
      result.method,
      now.elapsed()
    );
    let record = output.render_result(&frame, &result)?;
    let records = vec![record];
    output.finish(&records)?;

    Ok(records)
  }
}

/// 顺序处理所有图像，每张图像完成后检查中断信号
#[derive(Default, Debug)]
pub struct BatchTask {
  max_images: Option<usize>,
  interrupt: Option<Receiver<()>>,
}

impl BatchTask {
  pub fn with_max_images(mut self, max_images: Option<usize>) -> Self {
    self.max_images = max_images;
    self
  }

  /// 使用给定的通道作为中断信号
  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后在当前图像处理完成时退出
  pub fn with_ctrlc(self) -> Result<Self, ctrlc::Error> {
    let (tx, rx) = channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    Ok(self.with_interrupt(rx))
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }
}

impl<'a, P, S, RE, I, O> Task<I, &'a Counter<P, S>, O> for BatchTask
where
  P: Model<Input = RgbImage, Output = DetectResult>,
  P::Error: std::fmt::Display,
  S: Model<Input = RgbImage, Output = DetectResult>,
  S::Error: std::fmt::Display,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = ImageFileInput>,
  O: Render<ImageFileInput, CountResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    counter: &'a Counter<P, S>,
    output: O,
  ) -> Result<Vec<BatchRecord>, Self::Error> {
    info!("开始批处理任务...");
    let started = Instant::now();
    let mut records = Vec::new();

    for (index, frame) in input.enumerate() {
      if self.max_images.map(|n| records.len() >= n).unwrap_or(false) {
        info!("达到指定图像数 {}, 退出任务循环", records.len());
        break;
      }

      info!("处理第 {} 张图像: {}", index + 1, frame.name());
      let now = Instant::now();
      let result = counter.count_with_fallback(&frame);
      // 单张图像输出失败时仍保留计数，继续处理后续图像
      let record = output
        .render_result(&frame, &result)
        .unwrap_or_else(|e| {
          warn!("保存 {} 的结果失败: {}", frame.name(), e);
          BatchRecord::from_result(&frame, &result)
        });
      info!(
        "{}: {} 人 [{}]，耗时: {:.2?}",
        record.image_name,
        record.people_count,
        record.method,
        now.elapsed()
      );
      records.push(record);

      if self.interrupted() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    output.finish(&records)?;

    let total: usize = records.iter().map(|r| r.people_count).sum();
    info!(
      "任务完成: {} 张图像，共 {} 人，耗时: {:.2?}",
      records.len(),
      total,
      started.elapsed()
    );
    Ok(records)
  }
}
