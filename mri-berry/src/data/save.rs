//! 图像的持久化存储.

use super::{DecodedImage, IntensityWindow, Mask};
use crate::consts::gray::{BLACK, WHITE};
use image::ImageResult;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 对于 [`Mask`], 区域内像素保存为白色, 背景保存为黑色;
/// 对于 [`DecodedImage`], 在保存时会用图像自身强度范围构建的窗口规范化.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

impl ImgWriteVis for Mask {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &inside) in self.indexed_iter() {
            let pix = if inside { WHITE } else { BLACK };
            buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
        }
        buf.save(path)
    }
}

impl ImgWriteVis for DecodedImage {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_gray().save(path)
    }
}

impl DecodedImage {
    /// 以图像自身的强度范围为窗口, 获得强度窗.
    /// 若图像强度全部相同 (无法构建窗口), 返回 `None`.
    #[inline]
    pub fn auto_window(&self) -> Option<IntensityWindow> {
        let (lo, hi) = self.min_max();
        IntensityWindow::from_range(lo, hi)
    }

    /// 按照自动窗口将整张图像转换为 8-bit 灰度图. 无法构建窗口时得到全黑图像.
    pub fn to_gray(&self) -> image::GrayImage {
        let (height, width) = self.shape();
        let window = self.auto_window();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &v) in self.indexed_iter() {
            let gray = window.and_then(|win| win.eval(v)).unwrap_or(BLACK);
            buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
        }
        buf
    }
}
