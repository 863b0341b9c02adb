// 该文件是 Renshu （人数） 项目的一部分。
// src/model/seeta_face.rs - 经典级联人脸检测（回退方法）
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

use std::{fs::File, io::BufReader, path::PathBuf};

use image::RgbImage;
use rustface::ImageData;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{AsGrayFrame, GrayFrame},
  model::{DetectItem, DetectResult, Label, Model},
};

const SEETA_MIN_FACE_SIZE: u32 = 20;
const SEETA_SCORE_THRESH: f64 = 2.0;
const SEETA_PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SEETA_WINDOW_STEP: u32 = 4;

#[derive(Error, Debug)]
pub enum SeetaFaceError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("输入无效: {0}")]
  InvalidInput(String),
}

/// SeetaFace 漏斗级联人脸检测器。
///
/// 模型只读取一次；每次推理从克隆的模型构建一个新的检测器，
/// 所以 `infer` 只需要 `&self`。
pub struct SeetaFace {
  model: rustface::Model,
  min_face_size: u32,
  score_thresh: f64,
}

pub struct SeetaFaceBuilder {
  model_path: PathBuf,
  min_face_size: u32,
  score_thresh: f64,
}

impl SeetaFaceBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    SeetaFaceBuilder {
      model_path: model_path.into(),
      min_face_size: SEETA_MIN_FACE_SIZE,
      score_thresh: SEETA_SCORE_THRESH,
    }
  }

  pub fn min_face_size(mut self, size: u32) -> Self {
    self.min_face_size = size;
    self
  }

  pub fn build(self) -> Result<SeetaFace, SeetaFaceError> {
    info!("加载人脸检测模型: {}", self.model_path.display());
    let file = File::open(&self.model_path)?;
    let model = rustface::read_model(BufReader::new(file))
      .map_err(|e| SeetaFaceError::ModelLoadError(e.to_string()))?;
    info!("人脸检测模型加载完成");

    Ok(SeetaFace {
      model,
      min_face_size: self.min_face_size,
      score_thresh: self.score_thresh,
    })
  }
}

/// 像素坐标 (x, y, w, h) 转为归一化的 [top, left, bottom, right]
fn normalize_face_box(x: i32, y: i32, w: u32, h: u32, width: u32, height: u32) -> [f32; 4] {
  let (fw, fh) = (width as f32, height as f32);
  let left = x as f32 / fw;
  let top = y as f32 / fh;
  let right = (x as f32 + w as f32) / fw;
  let bottom = (y as f32 + h as f32) / fh;
  [
    top.clamp(0.0, 1.0),
    left.clamp(0.0, 1.0),
    bottom.clamp(0.0, 1.0),
    right.clamp(0.0, 1.0),
  ]
}

fn gray_input(input: &RgbImage) -> Result<GrayFrame, SeetaFaceError> {
  let (width, height) = input.dimensions();
  if width == 0 || height == 0 {
    return Err(SeetaFaceError::InvalidInput(format!(
      "图像尺寸无效: {}x{}",
      width, height
    )));
  }
  Ok(GrayFrame::from(input))
}

impl Model for SeetaFace {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = SeetaFaceError;

  fn name(&self) -> &str {
    "Face Cascade"
  }

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let gray = gray_input(input)?;
    let (width, height) = (gray.width(), gray.height());

    let mut detector = rustface::create_detector_with_model(self.model.clone());
    detector.set_min_face_size(self.min_face_size);
    detector.set_score_thresh(self.score_thresh);
    detector.set_pyramid_scale_factor(SEETA_PYRAMID_SCALE_FACTOR);
    detector.set_slide_window_step(SEETA_WINDOW_STEP, SEETA_WINDOW_STEP);

    let faces = detector.detect(&ImageData::new(gray.as_gray(), width, height));
    debug!("检测到 {} 张人脸", faces.len());

    let items = faces
      .iter()
      .map(|face| {
        let bbox = face.bbox();
        DetectItem {
          kind: Label::Face,
          score: face.score() as f32,
          bbox: normalize_face_box(
            bbox.x(),
            bbox.y(),
            bbox.width(),
            bbox.height(),
            width,
            height,
          ),
        }
      })
      .collect();

    Ok(DetectResult::new(items))
  }
}
