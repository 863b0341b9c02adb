// 该文件是 Renshu （人数） 项目的一部分。
// src/frame.rs - 模型输入帧定义
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

use image::{RgbImage, imageops::FilterType};

const RGB_CHANNELS: usize = 3;

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

pub trait AsGrayFrame {
  fn as_gray(&self) -> &[u8];
}

/// 按 NHWC（行优先、通道交错）排布的 RGB 帧
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  /// 将图像拉伸缩放到模型输入尺寸。
  /// 检测框使用归一化坐标，拉伸不会影响框在原图上的位置。
  pub fn resized_from(image: &RgbImage, width: u32, height: u32) -> Self {
    if image.dimensions() == (width, height) {
      return Self::from(image);
    }
    let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
    Self::from(&resized)
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

impl From<&RgbImage> for RgbNhwcFrame {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    // RgbImage 的内存布局本身就是 HWC
    Self {
      width: width as usize,
      height: height as usize,
      data: image.as_raw().clone().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

/// 单通道灰度帧，供经典人脸检测器使用
#[derive(Debug, Clone)]
pub struct GrayFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl GrayFrame {
  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn width(&self) -> u32 {
    self.width
  }
}

impl From<&RgbImage> for GrayFrame {
  fn from(image: &RgbImage) -> Self {
    let gray = image::imageops::grayscale(image);
    let (width, height) = gray.dimensions();
    Self {
      width,
      height,
      data: gray.into_raw().into_boxed_slice(),
    }
  }
}

impl AsGrayFrame for GrayFrame {
  fn as_gray(&self) -> &[u8] {
    &self.data
  }
}
