// 该文件是 Renshu （人数） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use renshu::config::{
  CounterConfig, DEFAULT_FACE_MIN_SIZE, DEFAULT_FACE_MODEL, DEFAULT_LITE_MODEL, DEFAULT_PRIMARY_MODEL,
};

/// Renshu 人数统计参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像文件或目录（目录不递归展开）
  #[arg(required = true, value_name = "SOURCE")]
  pub inputs: Vec<PathBuf>,

  /// 标注图像与统计报表的输出目录
  #[arg(long, default_value = "processed", value_name = "DIR", env = "RENSHU_OUTPUT")]
  pub output: PathBuf,

  /// 候选阈值，严格升序，逗号分隔
  #[arg(
    long,
    value_delimiter = ',',
    default_value = "0.10,0.15,0.20,0.25,0.30,0.50",
    value_name = "THRESHOLDS",
    env = "RENSHU_CANDIDATE_THRESHOLDS"
  )]
  pub candidate_thresholds: Vec<f32>,

  /// 首选阈值
  #[arg(long, default_value = "0.23", value_name = "THRESHOLD", env = "RENSHU_PREFERRED_THRESHOLD")]
  pub preferred_threshold: f32,

  /// 首选阈值计数低于该值时尝试更低的阈值
  #[arg(long, default_value = "5", value_name = "COUNT", env = "RENSHU_LOW_COUNT_GUARD")]
  pub low_count_guard: usize,

  /// 主检测模型地址
  #[arg(long, default_value = DEFAULT_PRIMARY_MODEL, value_name = "MODEL", env = "RENSHU_PRIMARY_MODEL")]
  pub primary_model: Url,

  /// 轻量检测模型地址，主模型加载失败时使用
  #[arg(long, default_value = DEFAULT_LITE_MODEL, value_name = "MODEL", env = "RENSHU_LITE_MODEL")]
  pub lite_model: Url,

  /// 不使用轻量检测模型
  #[arg(long)]
  pub no_lite_model: bool,

  /// 人脸检测模型文件路径
  #[arg(long, default_value = DEFAULT_FACE_MODEL, value_name = "FILE", env = "RENSHU_FACE_MODEL")]
  pub face_model: PathBuf,

  /// 人脸检测的最小人脸边长（像素）
  #[arg(long, default_value_t = DEFAULT_FACE_MIN_SIZE, value_name = "PIXELS", env = "RENSHU_FACE_MIN_SIZE")]
  pub face_min_size: u32,

  /// 所有检测都失败时报告的人数
  #[arg(long, default_value = "0", value_name = "COUNT", env = "RENSHU_DEFAULT_COUNT")]
  pub default_count: usize,

  /// 最多处理的图像数
  #[arg(long, value_name = "COUNT")]
  pub max_images: Option<usize>,
}

impl Args {
  pub fn counter_config(&self) -> CounterConfig {
    CounterConfig {
      candidate_thresholds: self.candidate_thresholds.clone(),
      preferred_threshold: self.preferred_threshold,
      low_count_guard: self.low_count_guard,
      primary_model_endpoint: self.primary_model.clone(),
      lite_model_endpoint: (!self.no_lite_model).then(|| self.lite_model.clone()),
      fallback_model_path: self.face_model.clone(),
      fallback_min_face_size: self.face_min_size,
      default_count: self.default_count,
    }
  }
}
