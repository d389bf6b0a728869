//! 单切片分割评估.
//!
//! [`SegmentationCase`] 持有一张切片图像及其内/外轮廓, 将轮廓栅格化为掩膜,
//! 在外轮廓内做阈值分割, 再以内轮廓为真值计算 Jaccard 系数.

use crate::consts::rgb::{GROUND_TRUTH, OVERLAP, PREDICTED};
use crate::contour::{bounding_box, rasterize, Contour};
use crate::overlap::jaccard;
use crate::threshold::{FitCache, Intensities, MixtureModel, MixtureThresholder, ThresholdSpec};
use crate::{BerryError, BerryResult, DecodedImage, Mask};
use image::{Rgb, RgbImage};
use log::debug;
use std::ops::Range;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
    }
}

/// 一次阈值分割的完整结果.
#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    /// 拟合得到的混合模型.
    pub model: MixtureModel,
    /// 推导出的阈值.
    pub threshold: f64,
    /// 后处理之前的预测掩膜.
    pub raw: Mask,
    /// 最终预测掩膜 (可能已膨胀).
    pub predicted: Mask,
    /// 最终预测掩膜与内轮廓掩膜的 Jaccard 系数.
    pub jaccard: f64,
}

/// 一张切片及其手绘轮廓.
#[derive(Debug, Clone)]
pub struct SegmentationCase {
    image: DecodedImage,
    inner: Contour,
    outer: Option<Contour>,
    inner_mask: Mask,
    outer_mask: Option<Mask>,
    slice_number: Option<u32>,

    /// 最近一次运行使用的参数及其结果.
    cached: Option<(ThresholdSpec, ThresholdOutcome)>,
}

impl SegmentationCase {
    /// 创建分割评估, 并立即栅格化内/外轮廓.
    ///
    /// `inner` 为真值区域, `outer` 为阈值分割的 ROI.
    pub fn new(image: DecodedImage, inner: Contour, outer: Option<Contour>) -> BerryResult<Self> {
        let (height, width) = image.shape();
        let inner_mask = rasterize(&inner, width, height)?;
        let outer_mask = outer
            .as_ref()
            .map(|c| rasterize(c, width, height))
            .transpose()?;
        Ok(Self {
            image,
            inner,
            outer,
            inner_mask,
            outer_mask,
            slice_number: None,
            cached: None,
        })
    }

    /// 附上切片编号.
    #[inline]
    pub fn with_slice_number(mut self, slice_number: u32) -> Self {
        self.slice_number = Some(slice_number);
        self
    }

    /// 切片编号.
    #[inline]
    pub fn slice_number(&self) -> Option<u32> {
        self.slice_number
    }

    /// 切片图像.
    #[inline]
    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    /// 内轮廓.
    #[inline]
    pub fn inner(&self) -> &Contour {
        &self.inner
    }

    /// 外轮廓.
    #[inline]
    pub fn outer(&self) -> Option<&Contour> {
        self.outer.as_ref()
    }

    /// 内轮廓掩膜 (真值).
    #[inline]
    pub fn inner_mask(&self) -> &Mask {
        &self.inner_mask
    }

    /// 外轮廓掩膜 (ROI).
    #[inline]
    pub fn outer_mask(&self) -> Option<&Mask> {
        self.outer_mask.as_ref()
    }

    /// 最近一次运行的结果.
    #[inline]
    pub fn outcome(&self) -> Option<&ThresholdOutcome> {
        self.cached.as_ref().map(|(_, o)| o)
    }

    /// 以 `spec` 运行阈值分割并评估. 参数与上次相同时直接返回缓存的结果.
    ///
    /// 没有外轮廓时返回 `BerryError::InvalidInput`.
    pub fn run(&mut self, spec: &ThresholdSpec) -> BerryResult<&ThresholdOutcome> {
        self.run_with(spec, None)
    }

    /// 同 [`run`](SegmentationCase::run), 但通过 `cache` 共享拟合结果.
    pub fn run_cached(
        &mut self,
        spec: &ThresholdSpec,
        cache: &FitCache,
    ) -> BerryResult<&ThresholdOutcome> {
        self.run_with(spec, Some(cache))
    }

    fn run_with(
        &mut self,
        spec: &ThresholdSpec,
        cache: Option<&FitCache>,
    ) -> BerryResult<&ThresholdOutcome> {
        if !matches!(&self.cached, Some((s, _)) if s == spec) {
            let outcome = self.evaluate(spec, cache)?;
            self.cached = Some((*spec, outcome));
        }
        match &self.cached {
            Some((_, outcome)) => Ok(outcome),
            None => unreachable!(),
        }
    }

    fn evaluate(&self, spec: &ThresholdSpec, cache: Option<&FitCache>) -> BerryResult<ThresholdOutcome> {
        let roi = self
            .outer_mask
            .as_ref()
            .ok_or_else(|| BerryError::InvalidInput("case has no outer contour".into()))?;

        let intensities = Intensities::from_masked(&self.image, roi)?;
        let mut thresholder = MixtureThresholder::new(*spec);
        let model = match cache {
            Some(cache) => thresholder.fit_cached(&intensities, cache)?,
            None => thresholder.fit(&intensities)?,
        }
        .clone();
        let threshold = thresholder.derive_threshold()?;
        let raw = thresholder.predict_mask(&self.image, roi)?;
        let predicted = thresholder.postprocess(raw.clone());
        let jaccard = jaccard(&predicted, &self.inner_mask)?;

        debug!(
            "slice {:?}: threshold {threshold:.3}, jaccard {jaccard:.4}",
            self.slice_number
        );
        Ok(ThresholdOutcome {
            model,
            threshold,
            raw,
            predicted,
            jaccard,
        })
    }

    /// 内轮廓区域的实际面积, 以平方毫米为单位.
    #[inline]
    pub fn inner_area_mm2(&self) -> f64 {
        self.inner_mask.area(self.image.pixel_spacing())
    }

    /// 内轮廓区域平均强度相对于全图最大强度的百分比.
    ///
    /// 内轮廓为空或图像最大强度为 0 时返回 `None`.
    pub fn roi_avg_relative_intensity(&self) -> BerryResult<Option<f64>> {
        let (_, max) = self.image.min_max();
        let mean = self.image.mean_under(&self.inner_mask)?;
        Ok(mean.and_then(|m| (max != 0.0).then(|| m / max as f64 * 100.0)))
    }

    /// 外扩 `margin` 像素的包围盒, 已裁剪到图像范围. 优先使用外轮廓.
    fn crop(&self, margin: i64) -> BerryResult<(Range<usize>, Range<usize>)> {
        let contour = self.outer.as_ref().unwrap_or(&self.inner);
        let (height, width) = self.image.shape();
        let (rows, cols) = bounding_box(contour, margin)?.clip(height, width);
        if rows.is_empty() || cols.is_empty() {
            return Err(BerryError::InvalidInput(
                "contour lies outside the image".into(),
            ));
        }
        Ok((rows, cols))
    }

    /// 轮廓附近的叠加图: 真值为绿色, 预测为红色, 重合部分为黄色, 其余为原始灰度.
    ///
    /// 必须先 [`run`](SegmentationCase::run), 否则返回 `BerryError::PreconditionViolation`.
    pub fn overlay(&self, margin: i64) -> BerryResult<RgbImage> {
        let outcome = self
            .outcome()
            .ok_or(BerryError::PreconditionViolation("overlay requested before run"))?;
        let (rows, cols) = self.crop(margin)?;
        let gray = self.image.to_gray();

        let mut buf = RgbImage::new(cols.len() as u32, rows.len() as u32);
        for (y, h) in rows.enumerate() {
            for (x, w) in cols.clone().enumerate() {
                let color = match (self.inner_mask[(h, w)], outcome.predicted[(h, w)]) {
                    (true, true) => OVERLAP,
                    (true, false) => GROUND_TRUTH,
                    (false, true) => PREDICTED,
                    (false, false) => [gray.get_pixel(w as u32, h as u32).0[0]; 3],
                };
                buf.put_pixel(x as u32, y as u32, Rgb(color));
            }
        }
        Ok(buf)
    }

    /// 左侧为轮廓附近的原始灰度图, 右侧为以 `color` 涂上内轮廓区域的同一区域.
    pub fn contour_overlay(&self, margin: i64, color: [u8; 3]) -> BerryResult<RgbImage> {
        let (rows, cols) = self.crop(margin)?;
        let gray = self.image.to_gray();
        let crop_width = cols.len() as u32;

        let mut buf = RgbImage::new(crop_width * 2, rows.len() as u32);
        for (y, h) in rows.enumerate() {
            for (x, w) in cols.clone().enumerate() {
                let g = [gray.get_pixel(w as u32, h as u32).0[0]; 3];
                let painted = if self.inner_mask[(h, w)] { color } else { g };
                buf.put_pixel(x as u32, y as u32, Rgb(g));
                buf.put_pixel(crop_width + x as u32, y as u32, Rgb(painted));
            }
        }
        Ok(buf)
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl SegmentationCase {
    /// 借助 `rayon`, 并行地对每个切片运行阈值分割, 按顺序返回各自的 Jaccard 系数.
    ///
    /// 各切片互不共享可变状态; 某一切片失败不影响其它切片.
    pub fn par_run(cases: &mut [SegmentationCase], spec: &ThresholdSpec) -> Vec<BerryResult<f64>> {
        cases
            .par_iter_mut()
            .map(|case| case.run(spec).map(|o| o.jaccard))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentationCase;
    use crate::consts::rgb::OVERLAP;
    use crate::contour::{Contour, Point};
    use crate::threshold::{FitCache, ThresholdSpec};
    use crate::{BerryError, DecodedImage};
    use ndarray::Array2;

    fn square(lo: f64, hi: f64) -> Contour {
        [(lo, lo), (hi, lo), (hi, hi), (lo, hi)]
            .into_iter()
            .map(Point::from)
            .collect()
    }

    /// 32x32, 中心 `[10, 21]` 的方块亮度为 200, 其余为 20 附近.
    fn bright_square() -> DecodedImage {
        let pixels = Array2::from_shape_fn((32, 32), |(h, w)| {
            if (10..=21).contains(&h) && (10..=21).contains(&w) {
                200.0 + (w % 3) as f32
            } else {
                20.0 + (h % 3) as f32
            }
        });
        DecodedImage::new(pixels, (0.5, 0.5)).unwrap()
    }

    #[test]
    fn test_case_run() {
        let mut case =
            SegmentationCase::new(bright_square(), square(10.0, 21.0), Some(square(4.0, 27.0)))
                .unwrap()
                .with_slice_number(48);
        assert_eq!(case.slice_number(), Some(48));
        assert!(case.outcome().is_none());

        let outcome = case.run(&ThresholdSpec::default()).unwrap();
        assert!(outcome.threshold > 22.0 && outcome.threshold < 200.0);
        assert_eq!(outcome.jaccard, 1.0);
        assert_eq!(outcome.raw, outcome.predicted);
        assert_eq!(case.inner_area_mm2(), 144.0 * 0.25);

        // 参数改变时重新计算: 膨胀后预测区域变大.
        let dilated = ThresholdSpec::default().with_postprocess(true);
        let outcome = case.run(&dilated).unwrap();
        assert!(outcome.jaccard < 1.0);
        assert!(outcome.predicted.count() > outcome.raw.count());
    }

    #[test]
    fn test_case_run_cached() {
        let cache = FitCache::new();
        let spec = ThresholdSpec::default();
        let mut a = SegmentationCase::new(bright_square(), square(10.0, 21.0), Some(square(4.0, 27.0)))
            .unwrap();
        let mut b = a.clone();
        let ja = a.run_cached(&spec, &cache).unwrap().jaccard;
        let jb = b.run_cached(&spec, &cache).unwrap().jaccard;
        assert_eq!(ja, jb);
        assert_eq!(cache.fit_count(), 1);
    }

    #[test]
    fn test_case_without_outer() {
        let mut case = SegmentationCase::new(bright_square(), square(10.0, 21.0), None).unwrap();
        assert!(matches!(
            case.run(&ThresholdSpec::default()).unwrap_err(),
            BerryError::InvalidInput(_)
        ));
        assert!(matches!(
            case.overlay(5).unwrap_err(),
            BerryError::PreconditionViolation(_)
        ));
        // 没有外轮廓时, 以内轮廓裁剪.
        let img = case.contour_overlay(2, [0, 0, 255]).unwrap();
        assert_eq!(img.dimensions(), (2 * 15, 15));
    }

    #[test]
    fn test_case_overlay() {
        let mut case =
            SegmentationCase::new(bright_square(), square(10.0, 21.0), Some(square(4.0, 27.0)))
                .unwrap();
        case.run(&ThresholdSpec::default().with_postprocess(true))
            .unwrap();
        let img = case.overlay(0).unwrap();
        // 外轮廓包围盒 [4, 27), 不含右/下边界.
        assert_eq!(img.dimensions(), (23, 23));
        assert_eq!(img.get_pixel(10 - 4, 10 - 4).0, OVERLAP);
        // 第 6 行强度为 20, 即全图最小值.
        assert_eq!(img.get_pixel(0, 6 - 4).0, [0, 0, 0]);
        assert!(case.roi_avg_relative_intensity().unwrap().unwrap() > 99.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_case_par_run() {
        let mut cases = vec![
            SegmentationCase::new(bright_square(), square(10.0, 21.0), Some(square(4.0, 27.0)))
                .unwrap(),
            SegmentationCase::new(bright_square(), square(10.0, 21.0), None).unwrap(),
        ];
        let results = SegmentationCase::par_run(&mut cases, &ThresholdSpec::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(1.0));
        assert!(results[1].is_err());
        assert!(cases[0].outcome().is_some());
    }
}
