// 该文件是 Renshu （人数） 项目的一部分。
// src/config.rs - 计数配置
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

use thiserror::Error;
use url::Url;

use crate::threshold::{
  DEFAULT_CANDIDATE_THRESHOLDS, DEFAULT_LOW_COUNT_GUARD, DEFAULT_PREFERRED_THRESHOLD,
  ThresholdPolicy,
};

pub const DEFAULT_PRIMARY_MODEL: &str = "efficientdet:///models/efficientdet_d1.onnx?input=640&variant=D1";
pub const DEFAULT_LITE_MODEL: &str = "efficientdet:///models/efficientdet_d0.onnx?input=512&variant=D0";
pub const DEFAULT_FACE_MODEL: &str = "models/seeta_fd_frontal_v1.0.bin";
pub const DEFAULT_FACE_MIN_SIZE: u32 = 20;

/// 所有检测都失败时报告的人数。
/// 报告 0 而不是猜测至少有一个人；该值会直接出现在报表中。
pub const DEFAULT_FALLBACK_COUNT: usize = 0;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("候选阈值不能为空")]
  EmptyCandidates,
  #[error("阈值 {0} 超出范围 [0, 1]")]
  ThresholdOutOfRange(f32),
  #[error("候选阈值必须严格升序: {0} 之后是 {1}")]
  CandidatesNotAscending(f32, f32),
  #[error("首选阈值 {0} 不能出现在候选阈值中")]
  PreferredInCandidates(f32),
  #[error("最小人脸尺寸必须大于 0")]
  ZeroFaceSize,
  #[error("无效的模型地址 '{0}': {1}")]
  InvalidEndpoint(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterConfig {
  pub candidate_thresholds: Vec<f32>,
  pub preferred_threshold: f32,
  pub low_count_guard: usize,
  pub primary_model_endpoint: Url,
  /// 主模型加载失败时尝试的轻量模型
  pub lite_model_endpoint: Option<Url>,
  /// 人脸检测回退模型
  pub fallback_model_path: PathBuf,
  /// 人脸检测的最小人脸边长（像素）
  pub fallback_min_face_size: u32,
  pub default_count: usize,
}

pub fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
  Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint(endpoint.to_string(), e.to_string()))
}

impl Default for CounterConfig {
  fn default() -> Self {
    Self {
      candidate_thresholds: DEFAULT_CANDIDATE_THRESHOLDS.to_vec(),
      preferred_threshold: DEFAULT_PREFERRED_THRESHOLD,
      low_count_guard: DEFAULT_LOW_COUNT_GUARD,
      primary_model_endpoint: Url::parse(DEFAULT_PRIMARY_MODEL).expect("默认主模型地址无效"),
      lite_model_endpoint: Some(Url::parse(DEFAULT_LITE_MODEL).expect("默认轻量模型地址无效")),
      fallback_model_path: PathBuf::from(DEFAULT_FACE_MODEL),
      fallback_min_face_size: DEFAULT_FACE_MIN_SIZE,
      default_count: DEFAULT_FALLBACK_COUNT,
    }
  }
}

impl CounterConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.candidate_thresholds.is_empty() {
      return Err(ConfigError::EmptyCandidates);
    }

    let in_range = |t: f32| (0.0..=1.0).contains(&t);
    for &t in self
      .candidate_thresholds
      .iter()
      .chain(std::iter::once(&self.preferred_threshold))
    {
      if !in_range(t) {
        return Err(ConfigError::ThresholdOutOfRange(t));
      }
    }

    for pair in self.candidate_thresholds.windows(2) {
      if pair[0] >= pair[1] {
        return Err(ConfigError::CandidatesNotAscending(pair[0], pair[1]));
      }
    }

    if self
      .candidate_thresholds
      .contains(&self.preferred_threshold)
    {
      return Err(ConfigError::PreferredInCandidates(self.preferred_threshold));
    }

    if self.fallback_min_face_size == 0 {
      return Err(ConfigError::ZeroFaceSize);
    }

    Ok(())
  }

  pub fn policy(&self) -> ThresholdPolicy {
    ThresholdPolicy {
      candidates: self.candidate_thresholds.clone(),
      preferred: self.preferred_threshold,
      low_count_guard: self.low_count_guard,
    }
  }
}
