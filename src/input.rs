// 该文件是 Renshu （人数） 项目的一部分。
// src/input.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 允许处理的图像扩展名
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 磁盘上的一张图像。
///
/// 只保存路径，每次 [`ImageFileInput::decode`] 都重新读取文件，
/// 这样级联中的每个阶段都独立地处理解码失败。
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Ok(ImageFileInput::open(url.path()))
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Self {
    ImageFileInput {
      path: path.as_ref().to_path_buf(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 文件名（不含目录），用于报表和输出文件命名
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path.display().to_string())
  }

  pub fn decode(&self) -> Result<RgbImage, ImageFileInputError> {
    debug!("解码图像: {}", self.path.display());
    let image = ImageReader::open(&self.path)?
      .with_guessed_format()?
      .decode()?;
    Ok(image.into_rgb8())
  }
}

/// 判断文件扩展名是否在允许列表中（不区分大小写）
pub fn allowed_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      ALLOWED_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

/// 展开输入列表：目录按文件名排序展开（不递归），
/// 扩展名不被允许的文件会被跳过。
pub fn collect_images(sources: &[PathBuf]) -> Result<Vec<ImageFileInput>, ImageFileInputError> {
  let mut images = Vec::new();

  for source in sources {
    if source.is_dir() {
      let mut entries = std::fs::read_dir(source)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
      entries.sort();
      for path in entries {
        if path.is_file() && allowed_file(&path) {
          images.push(ImageFileInput::open(path));
        }
      }
    } else if allowed_file(source) {
      images.push(ImageFileInput::open(source));
    } else {
      warn!("跳过不支持的文件: {}", source.display());
    }
  }

  debug!("共收集到 {} 张图像", images.len());
  Ok(images)
}
