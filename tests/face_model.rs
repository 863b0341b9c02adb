// 该文件是 Renshu （人数） 项目的一部分。
// tests/face_model.rs - 真实人脸检测模型
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

//! 需要 SeetaFace 模型文件，通过 `RENSHU_FACE_MODEL` 指定路径：
//!
//! ```sh
//! RENSHU_FACE_MODEL=models/seeta_fd_frontal_v1.0.bin cargo test --test face_model -- --ignored
//! ```
//!
//! 设置 `RENSHU_FACE_SAMPLE` 与 `RENSHU_FACE_SAMPLE_COUNT` 时还会检查一张真实照片的人脸数。

use std::path::PathBuf;

use image::{Rgb, RgbImage};
use renshu::model::{Label, Model, SeetaFace, SeetaFaceBuilder, SeetaFaceError};

fn face_model() -> Option<SeetaFace> {
  let path = PathBuf::from(std::env::var_os("RENSHU_FACE_MODEL")?);
  if !path.is_file() {
    return None;
  }
  Some(SeetaFaceBuilder::new(path).build().expect("人脸模型加载失败"))
}

#[test]
#[ignore]
fn blank_image_has_no_faces() {
  let Some(model) = face_model() else {
    return;
  };
  let image = RgbImage::from_pixel(160, 120, Rgb([128, 128, 128]));
  let faces = model.infer(&image).unwrap();
  assert_eq!(faces.len(), 0);
}

#[test]
#[ignore]
fn empty_image_is_rejected() {
  let Some(model) = face_model() else {
    return;
  };
  assert!(matches!(
    model.infer(&RgbImage::new(0, 0)),
    Err(SeetaFaceError::InvalidInput(_))
  ));
}

#[test]
#[ignore]
fn sample_photo_face_count() {
  let Some(model) = face_model() else {
    return;
  };
  let (Some(sample), Some(expected)) = (
    std::env::var_os("RENSHU_FACE_SAMPLE"),
    std::env::var("RENSHU_FACE_SAMPLE_COUNT").ok(),
  ) else {
    return;
  };
  let expected: usize = expected.parse().expect("RENSHU_FACE_SAMPLE_COUNT 必须是整数");

  let image = image::open(sample).unwrap().into_rgb8();
  let faces = model.infer(&image).unwrap();
  assert_eq!(faces.len(), expected);
  assert!(faces.items.iter().all(|item| item.kind == Label::Face));
  assert_eq!(faces.count_above(f32::NEG_INFINITY), expected);
}
