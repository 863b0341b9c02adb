// 该文件是 Renshu （人数） 项目的一部分。
// src/model/efficientdet.rs - EfficientDet 目标检测模型
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcFrame, RgbNhwcFrame},
  model::{DetectItem, DetectResult, Label, Model, WithLabel},
};

const EFFICIENTDET_DEFAULT_INPUT: u32 = 640;
const EFFICIENTDET_DEFAULT_VARIANT: &str = "D1";
const EFFICIENTDET_OUTPUT_BOXES: &str = "detection_boxes";
const EFFICIENTDET_OUTPUT_CLASSES: &str = "detection_classes";
const EFFICIENTDET_OUTPUT_SCORES: &str = "detection_scores";
const EFFICIENTDET_OUTPUT_NUM: &str = "num_detections";

#[derive(Error, Debug)]
pub enum EfficientDetError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("输入无效: {0}")]
  InvalidInput(String),
  #[error("Tract 错误: {0}")]
  TractError(String),
}

impl From<TractError> for EfficientDetError {
  fn from(err: TractError) -> Self {
    EfficientDetError::TractError(format!("{:#}", err))
  }
}

/// 输出张量在模型输出列表中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputIndex {
  boxes: usize,
  classes: usize,
  scores: usize,
  num: Option<usize>,
}

impl OutputIndex {
  fn resolve<'a>(labels: impl Iterator<Item = &'a str>) -> Result<Self, EfficientDetError> {
    let mut boxes = None;
    let mut classes = None;
    let mut scores = None;
    let mut num = None;

    for (idx, label) in labels.enumerate() {
      debug!("模型输出[{}]: '{}'", idx, label);
      if label.contains(EFFICIENTDET_OUTPUT_BOXES) {
        boxes = Some(idx);
      } else if label.contains(EFFICIENTDET_OUTPUT_CLASSES) {
        classes = Some(idx);
      } else if label.contains(EFFICIENTDET_OUTPUT_SCORES) {
        scores = Some(idx);
      } else if label.contains(EFFICIENTDET_OUTPUT_NUM) {
        num = Some(idx);
      }
    }

    let missing = |name: &str| EfficientDetError::ModelInvalid(format!("缺少输出 '{}'", name));
    Ok(OutputIndex {
      boxes: boxes.ok_or_else(|| missing(EFFICIENTDET_OUTPUT_BOXES))?,
      classes: classes.ok_or_else(|| missing(EFFICIENTDET_OUTPUT_CLASSES))?,
      scores: scores.ok_or_else(|| missing(EFFICIENTDET_OUTPUT_SCORES))?,
      num,
    })
  }
}

pub struct EfficientDet {
  plan: TypedRunnableModel<TypedModel>,
  name: String,
  input_size: u32,
  outputs: OutputIndex,
}

pub struct EfficientDetBuilder {
  model_path: PathBuf,
  input_size: u32,
  variant: String,
}

impl FromUrlWithScheme for EfficientDetBuilder {
  const SCHEME: &'static str = "efficientdet";
}

impl FromUrl for EfficientDetBuilder {
  type Error = EfficientDetError;

  /// `efficientdet:///models/d1.onnx?input=640&variant=D1`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EfficientDetError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = EfficientDetBuilder::new(url.path());
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "input" => {
          let size = value.parse::<u32>().map_err(|_| {
            EfficientDetError::ModelPathError(format!("无效的输入尺寸: {}", value))
          })?;
          builder = builder.input_size(size);
        }
        "variant" => builder = builder.variant(&value),
        _ => warn!("忽略未知的模型参数: {}={}", key, value),
      }
    }

    Ok(builder)
  }
}

impl EfficientDetBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    EfficientDetBuilder {
      model_path: model_path.into(),
      input_size: EFFICIENTDET_DEFAULT_INPUT,
      variant: EFFICIENTDET_DEFAULT_VARIANT.to_string(),
    }
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn variant(mut self, variant: &str) -> Self {
    self.variant = variant.to_string();
    self
  }

  pub fn build(self) -> Result<EfficientDet, EfficientDetError> {
    if self.input_size == 0 {
      return Err(EfficientDetError::ModelPathError("输入尺寸不能为 0".to_string()));
    }
    if !self.model_path.exists() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(EfficientDetError::ModelNotFound(self.model_path));
    }

    info!(
      "加载模型文件: {} (EfficientDet {}, 输入 {}x{})",
      self.model_path.display(),
      self.variant,
      self.input_size,
      self.input_size
    );

    let size = self.input_size as usize;
    let model = tract_onnx::onnx()
      .model_for_path(&self.model_path)?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(u8::datum_type(), tvec!(1, size, size, 3)),
      )?
      .into_optimized()?;

    let labels = model
      .output_outlets()?
      .iter()
      .map(|outlet| {
        model
          .outlet_label(*outlet)
          .unwrap_or_else(|| model.node(outlet.node).name.as_str())
      })
      .collect::<Vec<_>>();
    let outputs = OutputIndex::resolve(labels.into_iter())?;
    debug!("模型输出索引: {:?}", outputs);

    let plan = model.into_runnable()?;
    info!("模型加载完成");

    Ok(EfficientDet {
      plan,
      name: format!("EfficientDet {}", self.variant),
      input_size: self.input_size,
      outputs,
    })
  }
}

impl EfficientDet {
  /// 先加载主模型，失败时再尝试精度较低的轻量模型
  pub fn load_with_lite(primary: &Url, lite: Option<&Url>) -> Result<Self, EfficientDetError> {
    let primary_err = match EfficientDetBuilder::from_url(primary).and_then(|b| b.build()) {
      Ok(model) => return Ok(model),
      Err(e) => e,
    };

    let Some(lite) = lite else {
      error!("主模型加载失败且未配置轻量模型: {}", primary_err);
      return Err(primary_err);
    };

    warn!("主模型加载失败: {}，尝试轻量模型 {}", primary_err, lite);
    EfficientDetBuilder::from_url(lite)
      .and_then(|b| b.build())
      .inspect_err(|e| error!("轻量模型加载失败: {}", e))
  }

  fn to_tensor(&self, frame: &RgbNhwcFrame) -> Result<Tensor, EfficientDetError> {
    let shape = (1, frame.height(), frame.width(), frame.channels());
    let array = tract_ndarray::Array4::from_shape_vec(shape, frame.as_nhwc().to_vec())
      .map_err(|e| EfficientDetError::InvalidInput(e.to_string()))?;
    Ok(array.into_tensor())
  }

  fn output_f32(
    outputs: &TVec<TValue>,
    index: usize,
    name: &str,
  ) -> Result<Vec<f32>, EfficientDetError> {
    let value = outputs
      .get(index)
      .ok_or_else(|| EfficientDetError::ModelInvalid(format!("缺少输出 '{}'", name)))?;
    let values = value.cast_to::<f32>()?;
    Ok(values.as_slice::<f32>()?.to_vec())
  }
}

/// 将模型的平铺输出还原为检测列表
fn decode_outputs(
  boxes: &[f32],
  classes: &[f32],
  scores: &[f32],
  num_detections: Option<f32>,
) -> DetectResult {
  let available = scores.len().min(classes.len()).min(boxes.len() / 4);
  let count = num_detections
    .map(|n| (n.max(0.0) as usize).min(available))
    .unwrap_or(available);

  let items = (0..count)
    .map(|i| {
      let b = &boxes[i * 4..i * 4 + 4];
      DetectItem {
        kind: Label::from_label_id(classes[i].round().max(0.0) as u32),
        score: scores[i],
        bbox: [
          b[0].clamp(0.0, 1.0),
          b[1].clamp(0.0, 1.0),
          b[2].clamp(0.0, 1.0),
          b[3].clamp(0.0, 1.0),
        ],
      }
    })
    .collect::<Vec<_>>();

  debug!("检测到 {} 个物体", items.len());
  DetectResult::new(items)
}

impl Model for EfficientDet {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = EfficientDetError;

  fn name(&self) -> &str {
    &self.name
  }

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let frame = RgbNhwcFrame::resized_from(input, self.input_size, self.input_size);
    let tensor = self.to_tensor(&frame)?;

    debug!("执行模型推理");
    let outputs = self.plan.run(tvec!(tensor.into()))?;

    debug!("后处理模型输出");
    let boxes = Self::output_f32(&outputs, self.outputs.boxes, EFFICIENTDET_OUTPUT_BOXES)?;
    let classes = Self::output_f32(&outputs, self.outputs.classes, EFFICIENTDET_OUTPUT_CLASSES)?;
    let scores = Self::output_f32(&outputs, self.outputs.scores, EFFICIENTDET_OUTPUT_SCORES)?;
    let num = match self.outputs.num {
      Some(index) => Self::output_f32(&outputs, index, EFFICIENTDET_OUTPUT_NUM)?
        .first()
        .copied(),
      None => None,
    };

    Ok(decode_outputs(&boxes, &classes, &scores, num))
  }
}
