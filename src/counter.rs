// 该文件是 Renshu （人数） 项目的一部分。
// src/counter.rs - 人数统计与回退级联
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

//! 回退级联：主检测器 -> 人脸检测 -> 默认人数。
//!
//! 每个阶段最多尝试一次，任何错误都会直接进入下一个阶段，
//! 所以 [`Counter::count_with_fallback`] 总能给出一个结果。

use chrono::{Local, NaiveDateTime};
use image::RgbImage;
use tracing::{info, warn};

use crate::{
  config::CounterConfig,
  error::CountError,
  input::ImageFileInput,
  model::{DetectResult, EfficientDet, LazyModel, Model, SeetaFace, SeetaFaceBuilder},
  output::draw::{Banner, Draw},
  threshold::{ThresholdPolicy, select_count},
};

/// 所有检测方法都失败时的方法标签
pub const METHOD_FAILED: &str = "Detection Failed";
/// 回退方法标签的后缀
pub const FALLBACK_SUFFIX: &str = "(fallback)";

/// 一张图像的最终统计结果
#[derive(Debug, Clone)]
pub struct CountResult {
  pub count: usize,
  pub annotated_image: Option<RgbImage>,
  pub method: String,
}

impl CountResult {
  pub fn is_fallback(&self) -> bool {
    self.method.ends_with(FALLBACK_SUFFIX)
  }

  pub fn is_failed(&self) -> bool {
    self.method == METHOD_FAILED
  }
}

/// 进程级的计数上下文，持有只初始化一次的模型句柄。
/// 启动时构建一次，之后以引用传给所有调用者。
pub struct Counter<P = EfficientDet, S = SeetaFace> {
  primary: LazyModel<P>,
  secondary: LazyModel<S>,
  policy: ThresholdPolicy,
  default_count: usize,
  draw: Draw,
}

impl Counter<EfficientDet, SeetaFace> {
  pub fn from_config(config: &CounterConfig) -> Self {
    let primary_url = config.primary_model_endpoint.clone();
    let lite_url = config.lite_model_endpoint.clone();
    let primary = LazyModel::new("EfficientDet", move || {
      EfficientDet::load_with_lite(&primary_url, lite_url.as_ref())
    });

    let face_model = config.fallback_model_path.clone();
    let min_face_size = config.fallback_min_face_size;
    let secondary = LazyModel::new("Face Cascade", move || {
      SeetaFaceBuilder::new(face_model.clone())
        .min_face_size(min_face_size)
        .build()
    });

    Counter::new(primary, secondary, config.policy(), config.default_count)
  }
}

impl<P, S> Counter<P, S>
where
  P: Model<Input = RgbImage, Output = DetectResult>,
  P::Error: std::fmt::Display,
  S: Model<Input = RgbImage, Output = DetectResult>,
  S::Error: std::fmt::Display,
{
  pub fn new(
    primary: LazyModel<P>,
    secondary: LazyModel<S>,
    policy: ThresholdPolicy,
    default_count: usize,
  ) -> Self {
    Counter {
      primary,
      secondary,
      policy,
      default_count,
      draw: Draw::default(),
    }
  }

  pub fn policy(&self) -> &ThresholdPolicy {
    &self.policy
  }

  pub fn default_count(&self) -> usize {
    self.default_count
  }

  /// 提前初始化主检测器，返回其是否可用
  pub fn warm_up(&self) -> bool {
    match self.primary.get() {
      Ok(model) => {
        info!("主检测器已就绪: {}", model.name());
        true
      }
      Err(e) => {
        warn!("主检测器不可用，将使用人脸检测回退: {}", e);
        false
      }
    }
  }

  pub fn count_with_fallback(&self, input: &ImageFileInput) -> CountResult {
    self.count_with_fallback_at(input, Local::now().naive_local())
  }

  /// 与 [`Counter::count_with_fallback`] 相同，但使用给定的处理时间标注图像
  pub fn count_with_fallback_at(
    &self,
    input: &ImageFileInput,
    processed_at: NaiveDateTime,
  ) -> CountResult {
    info!("处理图像: {}", input.name());

    match self.primary_state(input, processed_at) {
      Ok(result) => return result,
      Err(e) => warn!("主检测失败 [{}]: {}，尝试人脸检测", e.kind(), e),
    }

    match self.secondary_state(input, processed_at) {
      Ok(result) => return result,
      Err(e) => warn!("人脸检测失败 [{}]: {}，使用默认人数", e.kind(), e),
    }

    self.default_state()
  }

  fn primary_state(
    &self,
    input: &ImageFileInput,
    processed_at: NaiveDateTime,
  ) -> Result<CountResult, CountError> {
    let model = self.primary.get()?;
    let image = input.decode()?;
    let selection = select_count(model, &image, &self.policy).map_err(CountError::inference)?;

    let threshold = selection.chosen.threshold;
    let method = format!("{} (threshold: {:.2})", model.name(), threshold);
    let banner = Banner {
      title: model.name(),
      method: &method,
      processed_at,
    };
    let annotated = self
      .draw
      .render(&image, &selection.detections, threshold, &banner);

    Ok(CountResult {
      count: selection.chosen.count,
      annotated_image: Some(annotated),
      method,
    })
  }

  fn secondary_state(
    &self,
    input: &ImageFileInput,
    processed_at: NaiveDateTime,
  ) -> Result<CountResult, CountError> {
    let model = self.secondary.get()?;
    let image = input.decode()?;
    let faces = model.infer(&image).map_err(CountError::inference)?;

    // 人脸检测器已经按自身的分数阈值过滤，这里全部计入
    let threshold = f32::NEG_INFINITY;
    let count = faces.count_above(threshold);
    let method = format!("{} {}", model.name(), FALLBACK_SUFFIX);
    info!("{}: 检测到 {} 张人脸", model.name(), count);

    let banner = Banner {
      title: model.name(),
      method: &method,
      processed_at,
    };
    let annotated = self.draw.render(&image, &faces, threshold, &banner);

    Ok(CountResult {
      count,
      annotated_image: Some(annotated),
      method,
    })
  }

  fn default_state(&self) -> CountResult {
    CountResult {
      count: self.default_count,
      annotated_image: None,
      method: METHOD_FAILED.to_string(),
    }
  }
}
