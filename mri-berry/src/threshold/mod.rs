//! 基于高斯混合模型的无监督阈值分割.
//!
//! 在 ROI (外轮廓) 内的像素强度上拟合一维高斯混合模型, 由分量均值推导阈值,
//! 再将 ROI 内高于阈值的像素判定为区域内部. 可选地, 对结果做形态学膨胀.
//!
//! # 使用
//!
//! ```
//! use mri_berry::threshold::{fit_mixture, Intensities, ThresholdSpec};
//!
//! let values = (0..50).flat_map(|d| [40.0 + (d % 5) as f64, 160.0 + (d % 5) as f64]);
//! let intensities = Intensities::from_values(values).unwrap();
//! let model = fit_mixture(&intensities, &ThresholdSpec::default()).unwrap();
//! let t = model.threshold().unwrap();
//! assert!((t - 102.0).abs() < 1e-3);
//! ```

use crate::consts::{
    DEFAULT_COMPONENTS, DEFAULT_DILATION_RADIUS, DEFAULT_MAX_ITER, DEFAULT_REG_COVAR,
    DEFAULT_SEED, DEFAULT_TOL, MAX_DENSITY_SAMPLES,
};
use crate::post_proc::dilate;
use crate::{BerryError, BerryResult, DecodedImage, FitError, Mask};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod cache;
mod gmm;
mod intensities;

pub use cache::FitCache;
pub use intensities::Intensities;

/// 阈值分割参数.
///
/// 所有参数都有默认值, 可以通过 `with_*` 方法逐项修改:
///
/// ```
/// use mri_berry::threshold::ThresholdSpec;
///
/// let spec = ThresholdSpec::default().with_components(3).with_postprocess(true);
/// assert_eq!(spec.components(), 3);
/// assert_eq!(spec.seed(), 0);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSpec {
    /// 混合模型的分量个数.
    components: u32,

    /// k-means++ 初始化的随机数种子.
    seed: u64,

    /// EM 迭代次数上限.
    max_iter: u32,

    /// 平均对数似然变化量小于该值时视为收敛.
    tol: f64,

    /// 加到每个分量方差上的正则项.
    reg_covar: f64,

    /// 是否对预测掩膜做膨胀.
    postprocess: bool,

    /// 膨胀所用圆盘结构元素的半径 (单位: 像素).
    dilation_radius: u32,
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self {
            components: DEFAULT_COMPONENTS,
            seed: DEFAULT_SEED,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            reg_covar: DEFAULT_REG_COVAR,
            postprocess: false,
            dilation_radius: DEFAULT_DILATION_RADIUS,
        }
    }
}

impl ThresholdSpec {
    /// 设置分量个数.
    #[inline]
    pub fn with_components(mut self, components: u32) -> Self {
        self.components = components;
        self
    }

    /// 设置随机数种子.
    #[inline]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// 设置 EM 迭代次数上限.
    #[inline]
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// 设置收敛容差.
    #[inline]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// 设置方差正则项.
    #[inline]
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// 是否启用膨胀后处理.
    #[inline]
    pub fn with_postprocess(mut self, postprocess: bool) -> Self {
        self.postprocess = postprocess;
        self
    }

    /// 设置膨胀半径.
    #[inline]
    pub fn with_dilation_radius(mut self, radius: u32) -> Self {
        self.dilation_radius = radius;
        self
    }

    /// 分量个数.
    #[inline]
    pub fn components(&self) -> u32 {
        self.components
    }

    /// 随机数种子.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// EM 迭代次数上限.
    #[inline]
    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    /// 收敛容差.
    #[inline]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// 方差正则项.
    #[inline]
    pub fn reg_covar(&self) -> f64 {
        self.reg_covar
    }

    /// 是否启用膨胀后处理.
    #[inline]
    pub fn postprocess(&self) -> bool {
        self.postprocess
    }

    /// 膨胀半径.
    #[inline]
    pub fn dilation_radius(&self) -> u32 {
        self.dilation_radius
    }
}

/// 高斯混合模型的一个分量.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    /// 均值.
    pub mean: f64,
    /// 方差 (已包含正则项).
    pub variance: f64,
    /// 混合权重.
    pub weight: f64,
}

impl Component {
    #[inline]
    pub(crate) fn new(mean: f64, variance: f64, weight: f64) -> Self {
        Self {
            mean,
            variance,
            weight,
        }
    }

    /// 该分量在 `x` 处的加权概率密度 `weight * N(x; mean, variance)`.
    #[inline]
    pub fn weighted_pdf(&self, x: f64) -> f64 {
        self.weight * self.log_pdf(x).exp()
    }
}

/// 已拟合的一维高斯混合模型. 不可变; 各分量按均值升序排列, 权重之和为 1.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureModel {
    components: Vec<Component>,
    iterations: u32,
    log_likelihood: f64,
}

/// 各分量在强度定义域上的加权概率密度采样, 仅用于诊断和绘图.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurves {
    /// 采样点.
    pub xs: Vec<f64>,
    /// `curves[j][i]` 为第 `j` 个分量在 `xs[i]` 处的加权密度.
    pub curves: Vec<Vec<f64>>,
}

impl MixtureModel {
    pub(crate) fn new(mut components: Vec<Component>, iterations: u32, log_likelihood: f64) -> Self {
        components.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        Self {
            components,
            iterations,
            log_likelihood,
        }
    }

    /// 所有分量, 按均值升序.
    #[inline]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// 分量个数.
    #[inline]
    pub fn k(&self) -> usize {
        self.components.len()
    }

    /// 所有分量的均值, 升序.
    pub fn means(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.mean).collect()
    }

    /// 实际运行的 EM 迭代次数.
    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// 收敛时的平均对数似然.
    #[inline]
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// 由分量均值推导阈值.
    ///
    /// + 两个分量: 两个均值的算术平均;
    /// + 多于两个分量: 最低两个均值的算术平均;
    /// + 只有一个分量: 返回 `FitError::SinglePopulation`.
    pub fn threshold(&self) -> BerryResult<f64> {
        match self.components.as_slice() {
            [] | [_] => Err(FitError::SinglePopulation.into()),
            // 已按均值升序排列.
            [lo, next, ..] => Ok((lo.mean + next.mean) / 2.0),
        }
    }

    /// 在 `[lo, hi]` 上以 1 为步长采样每个分量的加权概率密度.
    ///
    /// 区间端点非有限或 `lo > hi` 时不采样; 采样点至多 `MAX_DENSITY_SAMPLES` 个.
    pub fn density_curves(&self, lo: f64, hi: f64) -> DensityCurves {
        let xs: Vec<f64> = if lo.is_finite() && hi.is_finite() && lo <= hi {
            let n = (hi - lo).floor().min((MAX_DENSITY_SAMPLES - 1) as f64) as usize + 1;
            (0..n).map(|i| lo + i as f64).collect()
        } else {
            Vec::new()
        };
        let curves = self
            .components
            .iter()
            .map(|c| xs.iter().map(|&x| c.weighted_pdf(x)).collect())
            .collect();
        DensityCurves { xs, curves }
    }
}

/// 在强度多重集上拟合高斯混合模型.
///
/// # 错误
///
/// + 多重集为空: `FitError::EmptyIntensities`;
/// + 分量个数小于 1: `FitError::InvalidComponents`;
/// + 样本数少于分量个数: `FitError::TooFewSamples`;
/// + `max_iter` 次迭代内未收敛: `FitError::NotConverged`;
/// + 参数出现 NaN 或 inf: `FitError::Degenerate`.
///
/// 同样的输入和同样的 `spec` (包括种子) 总是得到同样的模型.
pub fn fit_mixture(intensities: &Intensities, spec: &ThresholdSpec) -> BerryResult<MixtureModel> {
    gmm::GmmImp::new(intensities, spec)?.fit()
}

/// 将 `roi` 内强度严格大于 `threshold` 的像素判定为区域内部.
///
/// `roi` 外的像素按强度 `0` 处理. `image` 与 `roi` 形状不一致时返回
/// `BerryError::ShapeMismatch`.
pub fn predict_mask(image: &DecodedImage, threshold: f64, roi: &Mask) -> BerryResult<Mask> {
    roi.check_shape(image.shape())?;
    Ok(Mask::from_shape_fn(image.shape(), |pos| {
        let v = if roi[pos] { image[pos] as f64 } else { 0.0 };
        v > threshold
    }))
}

/// 阈值分割器的状态.
#[derive(Debug, Clone)]
enum ThresholderState {
    Unfit,
    Fit(Arc<MixtureModel>),
}

/// 带状态的阈值分割器: 必须先 [`fit`](MixtureThresholder::fit),
/// 才能推导阈值或预测掩膜.
#[derive(Debug, Clone)]
pub struct MixtureThresholder {
    spec: ThresholdSpec,
    state: ThresholderState,
}

impl MixtureThresholder {
    /// 以 `spec` 参数创建未拟合的分割器.
    #[inline]
    pub fn new(spec: ThresholdSpec) -> Self {
        Self {
            spec,
            state: ThresholderState::Unfit,
        }
    }

    /// 分割参数.
    #[inline]
    pub fn spec(&self) -> &ThresholdSpec {
        &self.spec
    }

    /// 是否已拟合?
    #[inline]
    pub fn is_fit(&self) -> bool {
        matches!(self.state, ThresholderState::Fit(_))
    }

    /// 已拟合的模型. 未拟合时返回 `None`.
    pub fn model(&self) -> Option<&MixtureModel> {
        match &self.state {
            ThresholderState::Unfit => None,
            ThresholderState::Fit(m) => Some(m.as_ref()),
        }
    }

    /// 在 `intensities` 上拟合模型, 覆盖之前的结果. 失败时分割器回到未拟合状态.
    pub fn fit(&mut self, intensities: &Intensities) -> BerryResult<&MixtureModel> {
        self.state = ThresholderState::Unfit;
        let model = fit_mixture(intensities, &self.spec)?;
        self.store(Arc::new(model))
    }

    /// 同 [`fit`](MixtureThresholder::fit), 但通过 `cache` 共享拟合结果.
    pub fn fit_cached(
        &mut self,
        intensities: &Intensities,
        cache: &FitCache,
    ) -> BerryResult<&MixtureModel> {
        self.state = ThresholderState::Unfit;
        let model = cache.get_or_fit(intensities, &self.spec)?;
        self.store(model)
    }

    fn store(&mut self, model: Arc<MixtureModel>) -> BerryResult<&MixtureModel> {
        self.state = ThresholderState::Fit(model);
        let ThresholderState::Fit(m) = &self.state else {
            unreachable!()
        };
        Ok(m.as_ref())
    }

    /// 由已拟合模型推导阈值. 未拟合时返回 `BerryError::PreconditionViolation`.
    pub fn derive_threshold(&self) -> BerryResult<f64> {
        self.model()
            .ok_or(BerryError::PreconditionViolation(
                "threshold derived before fit",
            ))?
            .threshold()
    }

    /// 以推导出的阈值在 `roi` 内预测掩膜, 不做后处理.
    pub fn predict_mask(&self, image: &DecodedImage, roi: &Mask) -> BerryResult<Mask> {
        if !self.is_fit() {
            return Err(BerryError::PreconditionViolation("mask predicted before fit"));
        }
        predict_mask(image, self.derive_threshold()?, roi)
    }

    /// 按 `spec` 决定是否对 `mask` 做膨胀.
    pub fn postprocess(&self, mask: Mask) -> Mask {
        if self.spec.postprocess {
            dilate(&mask, self.spec.dilation_radius)
        } else {
            mask
        }
    }

    /// 完整流程: 收集 `roi` 内的强度, 拟合, 推导阈值, 预测并后处理.
    ///
    /// 返回 `(阈值, 预测掩膜)`.
    pub fn segment(&mut self, image: &DecodedImage, roi: &Mask) -> BerryResult<(f64, Mask)> {
        let intensities = Intensities::from_masked(image, roi)?;
        self.fit(&intensities)?;
        let threshold = self.derive_threshold()?;
        let mask = predict_mask(image, threshold, roi)?;
        Ok((threshold, self.postprocess(mask)))
    }
}
