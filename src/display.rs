//! Display模块 - 显示渲染结果并轮询退出信号

use std::path::PathBuf;

use image::DynamicImage;

use crate::Result;

/// 显示面
pub trait DisplaySurface {
    /// 显示一帧
    fn show(&mut self, image: &DynamicImage) -> Result<()>;

    /// 非阻塞地检查用户是否要求退出；每轮显示之后调用一次
    fn quit_requested(&mut self) -> bool;
}

/// 把每一轮的结果写入同一个文件，适合无界面环境；从不请求退出
#[derive(Debug, Clone)]
pub struct FileDisplay {
    path: PathBuf,
}

impl FileDisplay {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DisplaySurface for FileDisplay {
    fn show(&mut self, image: &DynamicImage) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        image.save(&self.path)?;
        tracing::info!(path = %self.path.display(), "overlay saved");
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        false
    }
}

/// 转为窗口缓冲区使用的 0RGB 像素
pub fn to_0rgb(image: &DynamicImage) -> Vec<u32> {
    image
        .to_rgb8()
        .pixels()
        .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]))
        .collect()
}

#[cfg(feature = "window")]
pub use window::WindowDisplay;

#[cfg(feature = "window")]
mod window {
    use image::{DynamicImage, GenericImageView};
    use minifb::{Key, KeyRepeat, Window, WindowOptions};

    use super::{DisplaySurface, to_0rgb};
    use crate::{Error, Result};

    /// 桌面窗口，第一次显示时按图像尺寸创建；按 q / Esc 或关闭窗口即退出
    pub struct WindowDisplay {
        title: String,
        window: Option<Window>,
    }

    impl WindowDisplay {
        pub fn new(title: String) -> Self {
            Self {
                title,
                window: None,
            }
        }
    }

    impl DisplaySurface for WindowDisplay {
        fn show(&mut self, image: &DynamicImage) -> Result<()> {
            let (width, height) = image.dimensions();
            let (width, height) = (width as usize, height as usize);

            if self
                .window
                .as_ref()
                .is_some_and(|window| window.get_size() != (width, height))
            {
                self.window = None;
            }
            let window = match self.window.take() {
                Some(window) => window,
                None => Window::new(&self.title, width, height, WindowOptions::default())
                    .map_err(|e| Error::Display(e.to_string()))?,
            };
            let window = self.window.insert(window);

            window
                .update_with_buffer(&to_0rgb(image), width, height)
                .map_err(|e| Error::Display(e.to_string()))
        }

        fn quit_requested(&mut self) -> bool {
            let Some(window) = self.window.as_mut() else {
                return false;
            };

            window.update();
            !window.is_open()
                || window.is_key_down(Key::Q)
                || window.is_key_down(Key::Escape)
                || window
                    .get_keys_pressed(KeyRepeat::No)
                    .iter()
                    .any(|key| matches!(key, Key::Q | Key::Escape))
        }
    }
}
