// 该文件是 Renshu （人数） 项目的一部分。
// src/output/draw.rs - 检测结果标注
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

use ab_glyph::{FontArc, PxScale};
use chrono::NaiveDateTime;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::model::{DetectItem, DetectResult, WithLabel};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BANNER_FONT_SIZE: f32 = 24.0;
const FOOTER_FONT_SIZE: f32 = 16.0;
const BOX_THICKNESS: i32 = 3;

// 摘要横幅固定位置 (10, 10) - (500, 50)
const BANNER_X: i32 = 10;
const BANNER_Y: i32 = 10;
const BANNER_WIDTH: u32 = 490;
const BANNER_HEIGHT: u32 = 40;
const BANNER_TEXT_X: i32 = 15;
const BANNER_TEXT_Y: i32 = 18;

// 页脚文字距离底部的偏移
const FOOTER_X: i32 = 15;
const FOOTER_PROCESSED_OFFSET: i32 = 44;
const FOOTER_METHOD_OFFSET: i32 = 24;

const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];
const BANNER_COLOR: [u8; 3] = [0, 0, 0];
const BANNER_TEXT_COLOR: [u8; 3] = [255, 255, 0]; // 黄色
const FOOTER_TEXT_COLOR: [u8; 3] = [255, 255, 255];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 横幅与页脚的文字内容
#[derive(Debug, Clone)]
pub struct Banner<'a> {
  /// 检测器名称，如 "EfficientDet D1"
  pub title: &'a str,
  /// 完整的方法标签
  pub method: &'a str,
  pub processed_at: NaiveDateTime,
}

pub struct Draw {
  font: FontArc,
  label_scale: PxScale,
  banner_scale: PxScale,
  footer_scale: PxScale,
}

impl Default for Draw {
  fn default() -> Self {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");

    Self {
      font,
      label_scale: PxScale::from(LABEL_FONT_SIZE),
      banner_scale: PxScale::from(BANNER_FONT_SIZE),
      footer_scale: PxScale::from(FOOTER_FONT_SIZE),
    }
  }
}

/// 归一化的 [top, left, bottom, right] 转换为像素坐标 (x_min, y_min, x_max, y_max)
fn to_pixel_box(bbox: &[f32; 4], width: u32, height: u32) -> (i32, i32, i32, i32) {
  let (w, h) = (width as f32, height as f32);
  let max_x = width as i32 - 1;
  let max_y = height as i32 - 1;

  let x_min = ((bbox[1] * w) as i32).clamp(0, max_x);
  let y_min = ((bbox[0] * h) as i32).clamp(0, max_y);
  let x_max = ((bbox[3] * w) as i32).clamp(0, max_x);
  let y_max = ((bbox[2] * h) as i32).clamp(0, max_y);
  (x_min, y_min, x_max, y_max)
}

impl Draw {
  /// 在图像副本上绘制阈值以上的人物检测、摘要横幅和页脚。
  /// 输入不会被修改，相同输入总是得到逐像素相同的输出。
  pub fn render(
    &self,
    image: &RgbImage,
    result: &DetectResult,
    threshold: f32,
    banner: &Banner,
  ) -> RgbImage {
    let mut canvas = image.clone();
    let mut count = 0usize;

    for item in result.people_above(threshold) {
      count += 1;
      self.draw_bbox_with_label(&mut canvas, item, count);
    }

    self.draw_banner(&mut canvas, count, banner);
    canvas
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem, ordinal: usize) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }

    let (x_min, y_min, x_max, y_max) = to_pixel_box(&item.bbox, image.width(), image.height());
    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框向内加粗
    for t in 0..BOX_THICKNESS {
      let w = x_max - x_min - 2 * t;
      let h = y_max - y_min - 2 * t;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(BOX_COLOR));
    }

    let label = format!(
      "{} {} ({:.2})",
      item.kind.to_label_str(),
      ordinal,
      item.score
    );
    let (text_width, text_height) = text_size(self.label_scale, &self.font, &label);
    let label_height = text_height as i32 + 2 * LABEL_TEXT_VERTICAL_PADDING;

    // 标签放在边框上方，放不下时贴着图像顶部
    let label_x = x_min;
    let label_y = (y_min - label_height).max(0);
    let max_width = (image.width() as i32 - label_x).max(0) as u32;
    let label_width = text_width.min(max_width);

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height as u32);
      draw_filled_rect_mut(image, rect, Rgb(BOX_COLOR));
      draw_text_mut(
        image,
        Rgb(LABEL_TEXT_COLOR),
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        self.label_scale,
        &self.font,
        &label,
      );
    }
  }

  fn draw_banner(&self, image: &mut RgbImage, count: usize, banner: &Banner) {
    let rect = Rect::at(BANNER_X, BANNER_Y).of_size(BANNER_WIDTH, BANNER_HEIGHT);
    draw_filled_rect_mut(image, rect, Rgb(BANNER_COLOR));

    let summary = format!("{}: {} people detected", banner.title, count);
    draw_text_mut(
      image,
      Rgb(BANNER_TEXT_COLOR),
      BANNER_TEXT_X,
      BANNER_TEXT_Y,
      self.banner_scale,
      &self.font,
      &summary,
    );

    let height = image.height() as i32;
    let processed = format!(
      "Processed: {}",
      banner.processed_at.format(TIMESTAMP_FORMAT)
    );
    draw_text_mut(
      image,
      Rgb(FOOTER_TEXT_COLOR),
      FOOTER_X,
      height - FOOTER_PROCESSED_OFFSET,
      self.footer_scale,
      &self.font,
      &processed,
    );

    let method = format!("Method: {}", banner.method);
    draw_text_mut(
      image,
      Rgb(FOOTER_TEXT_COLOR),
      FOOTER_X,
      height - FOOTER_METHOD_OFFSET,
      self.footer_scale,
      &self.font,
      &method,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Label;
  use chrono::NaiveDate;

  fn banner() -> Banner<'static> {
    Banner {
      title: "EfficientDet D1",
      method: "EfficientDet D1 (threshold: 0.23)",
      processed_at: NaiveDate::from_ymd_opt(2026, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .unwrap(),
    }
  }

  fn detections() -> DetectResult {
    DetectResult::new(vec![
      DetectItem {
        kind: Label::Person,
        score: 0.91,
        bbox: [0.5, 0.1, 0.9, 0.3],
      },
      DetectItem {
        kind: Label::Person,
        score: 0.12,
        bbox: [0.5, 0.6, 0.9, 0.8],
      },
    ])
  }

  #[test]
  fn pixel_box_scales_by_width_and_height() {
    let bbox = [0.25, 0.1, 0.75, 0.5];
    assert_eq!(to_pixel_box(&bbox, 200, 100), (20, 25, 100, 75));
  }

  #[test]
  fn render_is_deterministic_and_leaves_input_untouched() {
    let image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
    let draw = Draw::default();

    let first = draw.render(&image, &detections(), 0.23, &banner());
    let second = draw.render(&image, &detections(), 0.23, &banner());

    assert_eq!(first, second);
    assert_ne!(first, image);
    assert!(image.pixels().all(|p| *p == Rgb([128, 128, 128])));
  }

  #[test]
  fn only_detections_above_threshold_get_boxes() {
    let image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
    let draw = Draw::default();
    let annotated = draw.render(&image, &detections(), 0.23, &banner());

    // 第一个框的左边 (x = 32, y 在 120..216 之间) 被画成绿色
    assert_eq!(*annotated.get_pixel(32, 180), Rgb(BOX_COLOR));
    // 第二个检测分数过低，没有边框
    assert_eq!(*annotated.get_pixel(192, 180), Rgb([128, 128, 128]));
  }

  #[test]
  fn banner_is_opaque_black() {
    let image = RgbImage::from_pixel(600, 200, Rgb([200, 200, 200]));
    let draw = Draw::default();
    let annotated = draw.render(&image, &DetectResult::default(), 0.5, &banner());

    assert_eq!(*annotated.get_pixel(490, 45), Rgb(BANNER_COLOR));
    assert_eq!(*annotated.get_pixel(550, 45), Rgb([200, 200, 200]));
  }

  #[test]
  fn tiny_images_do_not_panic() {
    let image = RgbImage::new(4, 4);
    let draw = Draw::default();
    let annotated = draw.render(&image, &detections(), 0.0, &banner());
    assert_eq!(annotated.dimensions(), (4, 4));
  }
}
