//! 运行时错误.

use crate::Idx2d;
use std::fmt::{Display, Formatter};

/// 库内所有操作的运行时错误.
///
/// 所有错误都是局部, 同步且不可重试的: 它们在违反约定的调用处直接返回.
#[derive(Debug, Clone, PartialEq)]
pub enum BerryError {
    /// 非法输入, 例如需要求范围时传入了空轮廓, 或图像尺寸非正.
    InvalidInput(String),

    /// 比较了形状 `(高, 宽)` 不一致的两个对象.
    ShapeMismatch {
        /// 左侧对象的形状.
        left: Idx2d,
        /// 右侧对象的形状.
        right: Idx2d,
    },

    /// 混合模型拟合失败.
    Fit(FitError),

    /// 在未拟合时推导阈值或预测掩膜.
    PreconditionViolation(&'static str),

    /// 外部协作者 (文件读取, 图像解码) 的 I/O 错误.
    Io(String),
}

/// 高斯混合模型拟合错误.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// 强度多重集为空.
    EmptyIntensities,

    /// 分量个数非法 (必须至少为 1).
    InvalidComponents(u32),

    /// 样本总数少于分量个数.
    ///
    /// 第一个参数代表已有的样本数, 第二个参数代表分量个数.
    TooFewSamples(u64, u32),

    /// 达到迭代上限时仍未收敛. 参数为已运行的迭代次数.
    NotConverged(u32),

    /// 参数出现 NaN 或 inf.
    Degenerate,

    /// 只有一个分量时无法区分两个群体, 因此无法推导阈值.
    SinglePopulation,
}

/// 库内通用结果类型.
pub type BerryResult<T> = Result<T, BerryError>;

impl From<FitError> for BerryError {
    #[inline]
    fn from(value: FitError) -> Self {
        Self::Fit(value)
    }
}

impl From<std::io::Error> for BerryError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl Display for FitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::EmptyIntensities => write!(f, "intensity set is empty"),
            FitError::InvalidComponents(k) => write!(f, "invalid component count {k}"),
            FitError::TooFewSamples(n, k) => {
                write!(f, "{n} samples are not enough for {k} components")
            }
            FitError::NotConverged(it) => write!(f, "not converged after {it} iterations"),
            FitError::Degenerate => write!(f, "mixture parameters became non-finite"),
            FitError::SinglePopulation => {
                write!(f, "a threshold needs at least two components")
            }
        }
    }
}

impl Display for BerryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BerryError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            BerryError::ShapeMismatch { left, right } => {
                write!(f, "shape mismatch: {left:?} vs {right:?}")
            }
            BerryError::Fit(e) => write!(f, "fit error: {e}"),
            BerryError::PreconditionViolation(msg) => write!(f, "precondition violated: {msg}"),
            BerryError::Io(msg) => write!(f, "i/o error: {msg}"),
        }
    }
}

impl std::error::Error for FitError {}

impl std::error::Error for BerryError {}
