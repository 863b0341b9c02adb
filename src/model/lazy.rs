// 该文件是 Renshu （人数） 项目的一部分。
// src/model/lazy.rs - 延迟初始化的模型句柄
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

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::error::CountError;

type Loader<M> = Box<dyn Fn() -> Result<M, String> + Send + Sync>;

/// 只初始化一次的模型句柄。
///
/// 第一次 [`LazyModel::get`] 时执行加载，结果（包括失败）会被缓存，
/// 之后所有调用共享同一个只读模型。加载失败表现为 `ModelUnavailable`。
pub struct LazyModel<M> {
  name: &'static str,
  cell: OnceLock<Result<M, String>>,
  loader: Loader<M>,
}

impl<M> LazyModel<M> {
  pub fn new<F, E>(name: &'static str, loader: F) -> Self
  where
    F: Fn() -> Result<M, E> + Send + Sync + 'static,
    E: std::fmt::Display,
  {
    LazyModel {
      name,
      cell: OnceLock::new(),
      loader: Box::new(move || loader().map_err(|e| e.to_string())),
    }
  }

  /// 已经加载好的模型
  pub fn ready(name: &'static str, model: M) -> Self {
    let cell = OnceLock::new();
    let _ = cell.set(Ok(model));
    LazyModel {
      name,
      cell,
      loader: Box::new(|| Err("模型已初始化".to_string())),
    }
  }

  /// 永远不可用的模型槽位
  pub fn unavailable(name: &'static str, reason: impl Into<String>) -> Self {
    let cell = OnceLock::new();
    let _ = cell.set(Err(reason.into()));
    LazyModel {
      name,
      cell,
      loader: Box::new(|| Err("模型不可用".to_string())),
    }
  }

  pub fn get(&self) -> Result<&M, CountError> {
    self
      .cell
      .get_or_init(|| {
        info!("初始化模型: {}", self.name);
        let result = (self.loader)();
        if let Err(e) = &result {
          warn!("模型 {} 初始化失败: {}", self.name, e);
        }
        result
      })
      .as_ref()
      .map_err(|e| CountError::ModelUnavailable(format!("{}: {}", self.name, e)))
  }

  pub fn is_initialized(&self) -> bool {
    self.cell.get().is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  #[test]
  fn loader_runs_once_even_on_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lazy: LazyModel<u32> = LazyModel::new("broken", move || {
      counter.fetch_add(1, Ordering::SeqCst);
      Err::<u32, _>("no file")
    });

    assert!(!lazy.is_initialized());
    for _ in 0..3 {
      assert!(matches!(lazy.get(), Err(CountError::ModelUnavailable(_))));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn ready_and_unavailable_slots() {
    let lazy = LazyModel::ready("fixed", 7u32);
    assert!(lazy.is_initialized());
    assert_eq!(lazy.get().copied(), Ok(7));

    let lazy: LazyModel<u32> = LazyModel::unavailable("none", "disabled");
    assert_eq!(
      lazy.get().copied(),
      Err(CountError::ModelUnavailable("none: disabled".to_string()))
    );
  }
}
