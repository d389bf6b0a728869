use std::ops::Index;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use num::ToPrimitive;

use crate::{BerryError, BerryResult, Idx2d};

mod mask;
mod save;
mod window;

pub use mask::Mask;
pub use save::ImgWriteVis;
pub use window::IntensityWindow;

/// 已解码的二维医学图像切片, 包括像素强度和像素物理间距.
///
/// 像素以 `f32` 保存, 形状为 `(高, 宽)`, 以 `(行, 列)` 索引.
/// 本库将像素值视为不透明的有序数值, 不关心其物理意义.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: Array2<f32>,

    /// `(dx, dy)`, 单个像素在宽/高方向上的物理尺寸 (单位: 毫米).
    spacing: (f64, f64),
}

/// 图像来源. 负责从本地文件解码出 [`DecodedImage`].
///
/// 本库本身不实现任何医学图像容器的解码; 上层调用者应实现该 trait.
pub trait ImageSource {
    /// 解码 `path` 指向的图像.
    fn decode(&self, path: &Path) -> BerryResult<DecodedImage>;
}

impl Index<Idx2d> for DecodedImage {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.pixels[index]
    }
}

impl DecodedImage {
    /// 直接由像素矩阵和像素间距 `(dx, dy)` 创建图像.
    ///
    /// 宽或高为 0, 或像素间距不是正有限数时返回 `BerryError::InvalidInput`.
    pub fn new(pixels: Array2<f32>, pixel_spacing: (f64, f64)) -> BerryResult<Self> {
        let &[h, w] = pixels.shape() else {
            unreachable!()
        };
        if h == 0 || w == 0 {
            return Err(BerryError::InvalidInput(format!(
                "image dimensions must be positive, got {w}x{h}"
            )));
        }
        let (dx, dy) = pixel_spacing;
        if !(dx.is_finite() && dy.is_finite() && dx > 0.0 && dy > 0.0) {
            return Err(BerryError::InvalidInput(format!(
                "pixel spacing must be positive, got ({dx}, {dy})"
            )));
        }
        Ok(Self {
            pixels,
            spacing: pixel_spacing,
        })
    }

    /// 由行优先存储的任意数值像素缓冲区创建图像.
    ///
    /// `buf.len()` 必须等于 `width * height`, 且每个像素都必须能转换为 `f32`.
    pub fn from_raw<T: ToPrimitive>(
        width: usize,
        height: usize,
        buf: &[T],
        pixel_spacing: (f64, f64),
    ) -> BerryResult<Self> {
        if buf.len() != width * height {
            return Err(BerryError::InvalidInput(format!(
                "buffer of {} pixels does not fit {width}x{height}",
                buf.len()
            )));
        }
        let data = buf
            .iter()
            .map(|p| {
                p.to_f32()
                    .ok_or_else(|| BerryError::InvalidInput("pixel is not representable".into()))
            })
            .collect::<BerryResult<Vec<f32>>>()?;
        let pixels = Array2::from_shape_vec((height, width), data)
            .map_err(|e| BerryError::InvalidInput(e.to_string()))?;
        Self::new(pixels, pixel_spacing)
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.pixels.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 像素物理间距 `(dx, dy)`, 以毫米为单位.
    #[inline]
    pub fn pixel_spacing(&self) -> (f64, f64) {
        self.spacing
    }

    /// 单个像素的实际面积值, 以平方毫米为单位.
    #[inline]
    pub fn pixel_area(&self) -> f64 {
        self.spacing.0 * self.spacing.1
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&f32> {
        self.pixels.get(pos)
    }

    /// 获得像素数据的一份不可变 shallow copy.
    #[inline]
    pub fn pixels(&self) -> ArrayView2<'_, f32> {
        self.pixels.view()
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &f32)> {
        self.pixels.indexed_iter()
    }

    /// 最小和最大像素值.
    pub fn min_max(&self) -> (f32, f32) {
        self.pixels
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)))
    }

    /// 计算 `mask` 覆盖的所有像素的平均值. 如果 `mask` 为全背景则返回 `None`.
    ///
    /// 形状不一致时返回 `BerryError::ShapeMismatch`.
    pub fn mean_under(&self, mask: &Mask) -> BerryResult<Option<f64>> {
        mask.check_shape(self.shape())?;
        let mut count = 0u64;
        let mut sum = 0.0;
        for (pos, _) in mask.indexed_iter().filter(|&(_, &m)| m) {
            count += 1;
            sum += self[pos] as f64;
        }
        Ok((count != 0).then(|| sum / count as f64))
    }
}
