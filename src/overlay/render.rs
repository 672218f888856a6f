use image::{DynamicImage, GenericImageView, Rgba};
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};

use crate::detect::{Detection, FilteredDetections};
use crate::overlay::OverlayStyle;
use crate::overlay::font::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph, is_lit, text_width};
use crate::registry::Category;

/// 在底图副本上绘制筛选后的检测结果
///
/// 绘制顺序与 `filtered` 一致，后画的标签可能盖住先画的。
/// `filtered` 为空时返回与底图逐像素相同的图像。
///
/// # 参数
/// * `base` - 底图（不会被修改）
/// * `filtered` - 已按类别筛选的检测结果
/// * `category` - 目标类别，用于标签文字
/// * `style` - 颜色、线宽与字号
pub fn render(
    base: &DynamicImage,
    filtered: &FilteredDetections<'_>,
    category: &Category,
    style: &OverlayStyle,
) -> DynamicImage {
    if filtered.is_empty() {
        return base.clone();
    }

    let (img_width, img_height) = base.dimensions();
    // 只在透明画布上绘制叠加层，随后合成到底图上
    let mut dt = DrawTarget::new(img_width as i32, img_height as i32);

    let [r, g, b] = style.color;
    let source = Source::Solid(SolidSource { r, g, b, a: 0xFF });

    for detection in filtered {
        draw_box(&mut dt, detection, &source, style);

        let label = format!("{} {:.2}", category.name, detection.confidence);
        let (left, bottom) = label_origin(detection, &label, style, img_width);
        draw_text(&mut dt, &label, left, bottom, style.font_scale, &source);
    }

    let mut rendered = base.to_rgba8();
    for (pixel, &overlay) in rendered.pixels_mut().zip(dt.get_data()) {
        // alpha 为 0 的位置没有被绘制，保持底图原值
        if overlay >> 24 != 0 {
            *pixel = composite(overlay, *pixel);
        }
    }

    if base.color().has_alpha() {
        DynamicImage::ImageRgba8(rendered)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rendered).to_rgb8())
    }
}

/// 标签左下角坐标
///
/// 标签底边默认在框顶上方 `label_offset` 处；放不下时向内收，保证整行文字落在图像内。
fn label_origin(detection: &Detection, label: &str, style: &OverlayStyle, img_width: u32) -> (f32, f32) {
    let width = text_width(label, style.font_scale) as f32;
    let height = (GLYPH_HEIGHT * style.font_scale) as f32;

    let left = detection.bbox.x1.min(img_width as f32 - width).max(0.0);
    let bottom = (detection.bbox.y1 - style.label_offset).max(height);
    (left, bottom)
}

fn draw_box(dt: &mut DrawTarget, detection: &Detection, source: &Source<'_>, style: &OverlayStyle) {
    let bbox = &detection.bbox;

    let mut pb = PathBuilder::new();
    pb.rect(bbox.x1, bbox.y1, bbox.x2 - bbox.x1, bbox.y2 - bbox.y1);
    let path = pb.finish();

    dt.stroke(
        &path,
        source,
        &StrokeStyle {
            join: LineJoin::Miter,
            width: style.line_width,
            ..StrokeStyle::default()
        },
        &DrawOptions::new(),
    );
}

/// 用点阵字体绘制一行文字，`bottom` 为文字底边的 y 坐标
fn draw_text(dt: &mut DrawTarget, text: &str, left: f32, bottom: f32, scale: u32, source: &Source<'_>) {
    let cell = scale as f32;
    let top = bottom - (GLYPH_HEIGHT * scale) as f32;
    let options = DrawOptions::new();

    for (index, c) in text.chars().enumerate() {
        let bitmap = glyph(c);
        let origin_x = left + (index as u32 * GLYPH_ADVANCE * scale) as f32;

        for col in 0..GLYPH_WIDTH {
            for row in 0..GLYPH_HEIGHT {
                if is_lit(bitmap, col, row) {
                    dt.fill_rect(
                        origin_x + col as f32 * cell,
                        top + row as f32 * cell,
                        cell,
                        cell,
                        source,
                        &options,
                    );
                }
            }
        }
    }
}

/// 把 DrawTarget 中预乘 alpha 的像素以 source-over 方式合成到底图像素上
fn composite(overlay: u32, Rgba([dr, dg, db, da]): Rgba<u8>) -> Rgba<u8> {
    let [sb, sg, sr, sa] = overlay.to_le_bytes();
    let inverse = 255 - u32::from(sa);

    // 结果 alpha，单位 1/255
    let alpha = u32::from(sa) * 255 + u32::from(da) * inverse;
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    // 预乘后的分量，单位 1/255²；除以 alpha 得到直通颜色
    let channel = |s: u8, d: u8| {
        let premultiplied = u32::from(s) * 255 * 255 + u32::from(d) * u32::from(da) * inverse;
        ((premultiplied + alpha / 2) / alpha).min(255) as u8
    };

    Rgba([
        channel(sr, dr),
        channel(sg, dg),
        channel(sb, db),
        ((alpha + 127) / 255) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::registry::CategoryId;

    #[test]
    fn opaque_overlay_replaces_base() {
        let green = u32::from_le_bytes([0, 255, 0, 255]);
        assert_eq!(composite(green, Rgba([91, 60, 200, 128])), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn partial_overlay_blends_over_opaque_base() {
        // 半覆盖的绿色（预乘后 g = 128）叠在不透明黑色上
        let half_green = u32::from_le_bytes([0, 128, 0, 128]);
        assert_eq!(composite(half_green, Rgba([0, 0, 0, 255])), Rgba([0, 128, 0, 255]));
    }

    #[test]
    fn label_stays_inside_the_image() {
        let detection = Detection::new(CategoryId(2), BoundingBox::new(50.0, 4.0, 60.0, 20.0), 0.9);
        let style = OverlayStyle::default();
        let label = "car 0.90";

        let (left, bottom) = label_origin(&detection, label, &style, 200);
        assert_eq!(left, 50.0);
        assert_eq!(bottom, (GLYPH_HEIGHT * style.font_scale) as f32);

        let (left, _) = label_origin(&detection, label, &style, 100);
        assert_eq!(left, 100.0 - text_width(label, style.font_scale) as f32);
    }
}
