// 该文件是 Renshu （人数） 项目的一部分。
// src/error.rs - 计数流程错误定义
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

use thiserror::Error;

use crate::input::ImageFileInputError;

/// 计数流程中各阶段可能出现的错误。
///
/// 这些错误只在回退级联内部流转，最终都会被转换为下一个阶段，
/// 调用者拿到的永远是一个 [`crate::CountResult`]。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CountError {
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("图像解码错误: {0}")]
  Decode(String),
}

impl CountError {
  pub fn inference(err: impl std::fmt::Display) -> Self {
    CountError::Inference(err.to_string())
  }

  pub fn kind(&self) -> &'static str {
    match self {
      CountError::ModelUnavailable(_) => "model-unavailable",
      CountError::Inference(_) => "inference",
      CountError::Decode(_) => "decode",
    }
  }
}

impl From<ImageFileInputError> for CountError {
  fn from(err: ImageFileInputError) -> Self {
    CountError::Decode(err.to_string())
  }
}
