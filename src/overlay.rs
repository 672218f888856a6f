//! Overlay模块 - 把筛选后的检测结果画到底图的副本上
//!
//! 每个检测结果画一个矩形框，并在框左上角上方写 "类别名 置信度"。
//! 标签之间可能重叠，不做避让。底图只读。

pub mod font;
pub mod render;

use serde::Deserialize;

pub use render::render;

/// 叠加层样式
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// 框与文字颜色 (R, G, B)
    pub color: [u8; 3],
    /// 框线宽度
    pub line_width: f32,
    /// 字体放大倍数（5x7 点阵的整数倍）
    pub font_scale: u32,
    /// 标签底边距框顶的距离
    pub label_offset: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: [0x00, 0xFF, 0x00],
            line_width: 2.0,
            font_scale: 2,
            label_offset: 10.0,
        }
    }
}
