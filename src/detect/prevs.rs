use std::path::Path;

use image::{DynamicImage, imageops::FilterType};
use ndarray::{Array4, Axis, Zip};

use crate::Result;

/// 加载图像文件
///
/// 启动时调用一次，得到的图像在整个进程生命周期内只读。
///
/// # 错误处理
/// 文件不存在或无法解码时返回Err
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path)?;
    tracing::info!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "image loaded"
    );
    Ok(img)
}

/// 调整图像大小以适应模型输入
///
/// 使用CatmullRom插值算法将图像调整为指定尺寸。
pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::CatmullRom)
}

/// 将图像转换为模型输入张量
///
/// 将图像转换为模型所需的四维张量格式，包括：
/// 1. 归一化像素值到[0, 1]范围
/// 2. 调整通道顺序为RGB
/// 3. 调整维度顺序为NCHW格式
///
/// # 返回值
/// 返回形状为(1, 3, height, width)的四维张量
pub fn image_to_tensor(img: &DynamicImage, input_height: usize, input_width: usize) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut tensor = Array4::zeros((1, 3, input_height, input_width));

    // 按像素并行填充，超出图像范围的位置保持为 0
    Zip::indexed(tensor.index_axis_mut(Axis(0), 0)).par_for_each(|(c, y, x), value| {
        if x < width && y < height {
            *value = f32::from(rgb.get_pixel(x as u32, y as u32).0[c]) / 255.0;
        }
    });

    tensor
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgb, RgbImage};

    use super::*;

    #[test]
    fn tensor_is_nchw_and_normalized() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, Rgb([255, 0, 51]));
        let tensor = image_to_tensor(&DynamicImage::ImageRgb8(img), 2, 4);

        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert!((tensor[[0, 0, 1, 3]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 1, 3]], 0.0);
        assert!((tensor[[0, 2, 1, 3]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let img = DynamicImage::new_rgb8(1920, 1080);
        let resized = resize_image(&img, 640, 640);
        assert_eq!(resized.dimensions(), (640, 640));
    }

    #[test]
    fn missing_image_is_an_error() {
        assert!(load_image(Path::new("does/not/exist.jpg")).is_err());
    }
}
