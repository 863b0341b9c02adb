// 该文件是 Renshu （人数） 项目的一部分。
// src/threshold.rs - 置信度阈值扫描与选择策略
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

//! 在一组候选阈值上统计人数，并按策略选出最终阈值。
//!
//! 单一阈值在密集人群中容易漏检，所以策略默认使用首选阈值，
//! 只有当首选阈值下的人数低于下限时，才放宽到更低的候选阈值。
//! 候选集合、首选阈值和下限直接决定输出人数，默认值不可随意修改。

use tracing::{debug, info};

use crate::model::{DetectResult, Model};

pub const DEFAULT_CANDIDATE_THRESHOLDS: [f32; 6] = [0.10, 0.15, 0.20, 0.25, 0.30, 0.50];
pub const DEFAULT_PREFERRED_THRESHOLD: f32 = 0.23;
pub const DEFAULT_LOW_COUNT_GUARD: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPolicy {
  /// 升序排列的候选阈值
  pub candidates: Vec<f32>,
  /// 首选阈值，不属于候选集合
  pub preferred: f32,
  /// 首选阈值下人数低于该值时才尝试更低的阈值
  pub low_count_guard: usize,
}

impl Default for ThresholdPolicy {
  fn default() -> Self {
    Self {
      candidates: DEFAULT_CANDIDATE_THRESHOLDS.to_vec(),
      preferred: DEFAULT_PREFERRED_THRESHOLD,
      low_count_guard: DEFAULT_LOW_COUNT_GUARD,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCount {
  pub threshold: f32,
  pub count: usize,
}

/// 一张图像在各阈值下的人数
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSweep {
  candidates: Vec<ThresholdCount>,
  preferred: ThresholdCount,
}

impl ThresholdSweep {
  /// 基于同一组检测结果统计所有阈值，不会重复推理
  pub fn from_detections(result: &DetectResult, policy: &ThresholdPolicy) -> Self {
    let candidates = policy
      .candidates
      .iter()
      .map(|&threshold| (threshold, result.count_above(threshold)));
    let preferred = (policy.preferred, result.count_above(policy.preferred));
    Self::from_counts(candidates, preferred)
  }

  pub fn from_counts(
    candidates: impl IntoIterator<Item = (f32, usize)>,
    preferred: (f32, usize),
  ) -> Self {
    let mut candidates = candidates
      .into_iter()
      .map(|(threshold, count)| ThresholdCount { threshold, count })
      .collect::<Vec<_>>();
    candidates.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));

    Self {
      candidates,
      preferred: ThresholdCount {
        threshold: preferred.0,
        count: preferred.1,
      },
    }
  }

  pub fn candidates(&self) -> &[ThresholdCount] {
    &self.candidates
  }

  pub fn preferred(&self) -> ThresholdCount {
    self.preferred
  }

  pub fn count_at(&self, threshold: f32) -> Option<usize> {
    if self.preferred.threshold == threshold {
      return Some(self.preferred.count);
    }
    self
      .candidates
      .iter()
      .find(|c| c.threshold == threshold)
      .map(|c| c.count)
  }

  /// 选择规则：默认使用首选阈值；若其人数低于下限，则按从高到低的顺序
  /// 查看低于首选阈值的候选阈值，取第一个人数严格更多的阈值。
  pub fn select(&self, low_count_guard: usize) -> ThresholdCount {
    let preferred = self.preferred;
    if preferred.count >= low_count_guard {
      return preferred;
    }

    let better = self
      .candidates
      .iter()
      .rev()
      .filter(|c| c.threshold < preferred.threshold)
      .find(|c| c.count > preferred.count);

    match better {
      Some(better) => {
        debug!(
          "阈值 {} 下仅 {} 人，改用更低阈值 {} ({} 人)",
          preferred.threshold, preferred.count, better.threshold, better.count
        );
        *better
      }
      None => preferred,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Selection {
  pub detections: DetectResult,
  pub sweep: ThresholdSweep,
  pub chosen: ThresholdCount,
}

/// 运行一次模型，然后在缓存的检测结果上完成阈值扫描与选择
pub fn select_count<M>(
  model: &M,
  input: &M::Input,
  policy: &ThresholdPolicy,
) -> Result<Selection, M::Error>
where
  M: Model<Output = DetectResult>,
{
  let detections = model.infer(input)?;
  let sweep = ThresholdSweep::from_detections(&detections, policy);
  for entry in sweep.candidates() {
    debug!("阈值 {:.2}: {} 人", entry.threshold, entry.count);
  }
  debug!(
    "首选阈值 {:.2}: {} 人",
    sweep.preferred().threshold,
    sweep.preferred().count
  );

  let chosen = sweep.select(policy.low_count_guard);
  info!(
    "{}: 最终阈值 {:.2}, 人数 {}",
    model.name(),
    chosen.threshold,
    chosen.count
  );

  Ok(Selection {
    detections,
    sweep,
    chosen,
  })
}
