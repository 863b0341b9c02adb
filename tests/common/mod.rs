// 该文件是 Renshu （人数） 项目的一部分。
// tests/common/mod.rs - 测试用的模拟模型
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

#![allow(dead_code)]

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use image::{Rgb, RgbImage};
use renshu::model::{DetectItem, DetectResult, Label, Model};

/// 返回固定检测结果的模型，并记录推理次数
pub struct FakeDetector {
  pub name: &'static str,
  pub items: Vec<DetectItem>,
  pub calls: AtomicUsize,
  pub fail: bool,
}

impl FakeDetector {
  pub fn new(name: &'static str, items: Vec<DetectItem>) -> Self {
    FakeDetector {
      name,
      items,
      calls: AtomicUsize::new(0),
      fail: false,
    }
  }

  pub fn failing(name: &'static str) -> Self {
    FakeDetector {
      fail: true,
      ..Self::new(name, Vec::new())
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Model for FakeDetector {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = String;

  fn name(&self) -> &str {
    self.name
  }

  fn infer(&self, _input: &RgbImage) -> Result<DetectResult, String> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      return Err("推理失败".to_string());
    }
    Ok(DetectResult::new(self.items.clone()))
  }
}

/// 沿对角线排列的检测框，分数依次给出
pub fn items(kind: Label, scores: &[f32]) -> Vec<DetectItem> {
  let n = scores.len().max(1) as f32;
  scores
    .iter()
    .enumerate()
    .map(|(i, &score)| {
      let start = i as f32 / n;
      DetectItem {
        kind,
        score,
        bbox: [start, start, start + 0.5 / n, start + 0.5 / n],
      }
    })
    .collect()
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
  let image = RgbImage::from_pixel(width, height, Rgb([90, 120, 150]));
  let path = dir.join(name);
  image.save(&path).expect("写入测试图像失败");
  path
}
