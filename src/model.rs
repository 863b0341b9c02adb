// 该文件是 Renshu （人数） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  /// 模型名称，会出现在结果的方法标签中
  fn name(&self) -> &str;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// COCO 数据集中 person 的类别编号（EfficientDet 输出从 1 开始计数）
pub const COCO_PERSON_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
  Person,
  Face,
  Other(u32),
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_id(id: u32) -> Self;
}

impl WithLabel for Label {
  fn to_label_str(&self) -> String {
    match self {
      Label::Person => "Person".to_string(),
      Label::Face => "Face".to_string(),
      Label::Other(id) => format!("Class {}", id),
    }
  }

  fn from_label_id(id: u32) -> Self {
    if id == COCO_PERSON_ID {
      Label::Person
    } else {
      Label::Other(id)
    }
  }
}

impl Label {
  /// 是否计入人数。人脸只会由回退检测器产生，每张脸对应一个人。
  pub fn is_people(&self) -> bool {
    matches!(self, Label::Person | Label::Face)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub kind: Label,
  pub score: f32,
  pub bbox: [f32; 4], // [top, left, bottom, right]，归一化到 [0, 1]
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn new(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 置信度严格大于阈值的人物检测
  pub fn people_above(&self, threshold: f32) -> impl Iterator<Item = &DetectItem> {
    self
      .items
      .iter()
      .filter(move |item| item.kind.is_people() && item.score > threshold)
  }

  pub fn count_above(&self, threshold: f32) -> usize {
    self.people_above(threshold).count()
  }
}

mod efficientdet;
mod lazy;
mod seeta_face;

pub use self::efficientdet::{EfficientDet, EfficientDetBuilder, EfficientDetError};
pub use self::lazy::LazyModel;
pub use self::seeta_face::{SeetaFace, SeetaFaceBuilder, SeetaFaceError};
