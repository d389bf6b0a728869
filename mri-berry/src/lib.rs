#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供心脏 MRI 水平切片与手绘轮廓的结构化信息, 以及基础的分割评估算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 不负责医学图像文件 (如 DICOM) 的解码. 上层调用者需要通过
//!   [`ImageSource`] 提供已解码的 [`DecodedImage`].
//! 2. 所有在文档中声明的错误条件都以 [`BerryError`] 返回, 不会 panic.
//!
//! # 开发计划
//!
//! ### 轮廓栅格化 ✅
//!
//! 以 even-odd 规则将首尾相连的多边形转换为布尔掩膜, 边界像素计入区域.
//!
//! 实现位于 `mri-berry/src/contour/raster.rs`.
//!
//! ### 轮廓包围盒 ✅
//!
//! 实现位于 `mri-berry/src/contour/bbox.rs`.
//!
//! ### 高斯混合模型阈值分割 ✅
//!
//! 在外轮廓 (ROI) 内的像素强度上拟合一维高斯混合模型, 并由各分量均值推导阈值.
//! 初始化使用显式种子, 保证同样的输入得到同样的结果.
//!
//! 实现位于 `mri-berry/src/threshold/*`.
//!
//! ### 形态学膨胀后处理 ✅
//!
//! 圆盘结构元素的二值膨胀, 用于弥合逐像素阈值留下的小缺口.
//!
//! 实现位于 `mri-berry/src/post_proc`.
//!
//! ### 区域重叠度量 ✅
//!
//! Jaccard 系数 (以及 Dice 系数).
//!
//! 实现位于 `mri-berry/src/overlap.rs`.
//!
//! ### 单切片分割评估流程 ✅
//!
//! 持有一张图像与其内/外轮廓, 组合上述功能并缓存结果.
//!
//! 实现位于 `mri-berry/src/case.rs`.
//!
//! ### 拟合结果共享缓存 ✅
//!
//! 以 (强度多重集, 拟合参数) 为键, 保证同一个键至多只有一次并发拟合.
//!
//! 实现位于 `mri-berry/src/threshold/cache.rs`.
//!
//! ### 多分量 (k > 2) 阈值策略 ⌛️
//!
//! 目前取最低两个均值的平均值. 该策略有待确认.

/// 二维索引 `(行, 列)`, 即 `(高, 宽)`.
pub type Idx2d = (usize, usize);

/// 图像数据结构: 已解码图像, 掩膜, 强度窗口及其持久化.
mod data;

pub use data::{DecodedImage, ImageSource, ImgWriteVis, IntensityWindow, Mask};

pub mod case;
pub mod consts;
pub mod contour;
mod error;
pub mod overlap;
pub mod post_proc;
pub mod prelude;
pub mod threshold;

pub use error::{BerryError, BerryResult, FitError};
