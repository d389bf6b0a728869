//! 二维布尔掩膜.

use crate::{BerryError, BerryResult, Idx2d};
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 拥有所有权的二维布尔掩膜, `true` 代表区域内部.
///
/// 掩膜的形状为 `(高, 宽)`, 以 `(行, 列)` 索引. 掩膜只能由轮廓栅格化,
/// 阈值分割或形态学操作产生, 不对外提供直接构造方法.
/// 只有形状一致的两个掩膜才可以比较.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Index<Idx2d> for Mask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl Mask {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// 创建全背景掩膜.
    #[inline]
    pub(crate) fn background(shape: Idx2d) -> Self {
        Self::new(Array2::from_elem(shape, false))
    }

    /// 按位置逐一计算掩膜值.
    #[inline]
    pub(crate) fn from_shape_fn<F: FnMut(Idx2d) -> bool>(shape: Idx2d, f: F) -> Self {
        Self::new(Array2::from_shape_fn(shape, f))
    }

    /// 给定位置 (高, 宽) 的可变引用. 越界时返回 `None`.
    #[inline]
    pub(crate) fn get_mut(&mut self, pos: Idx2d) -> Option<&mut bool> {
        self.data.get_mut(pos)
    }

    /// 掩膜的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 获得掩膜的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得掩膜的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 掩膜的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 获取给定位置 (高, 宽) 的值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<bool> {
        self.data.get(pos).copied()
    }

    /// 区域内 (`true`) 的像素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 该掩膜是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.data.iter().any(|p| *p)
    }

    /// 获取可以迭代掩膜像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, bool, Ix2> {
        self.data.iter()
    }

    /// 以行优先规则, 获取能迭代所有 `(索引, 值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &bool)> {
        self.data.indexed_iter()
    }

    /// 收集所有区域内像素的索引, 结果按行优先存储.
    pub fn positions<B: FromIterator<Idx2d>>(&self) -> B {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| p.then_some(pos))
            .collect()
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<bool> {
        self.data
    }

    /// 检查掩膜形状是否为 `shape`. 不一致时返回 `BerryError::ShapeMismatch`.
    #[inline]
    pub fn check_shape(&self, shape: Idx2d) -> BerryResult<()> {
        if self.shape() == shape {
            Ok(())
        } else {
            Err(BerryError::ShapeMismatch {
                left: self.shape(),
                right: shape,
            })
        }
    }

    /// `self` 的每个区域内像素是否也都在 `other` 区域内?
    ///
    /// 形状不一致时返回 `BerryError::ShapeMismatch`.
    pub fn is_subset_of(&self, other: &Mask) -> BerryResult<bool> {
        self.check_shape(other.shape())?;
        Ok(self.iter().zip(other.iter()).all(|(a, b)| !*a || *b))
    }

    /// 区域的实际面积, 以平方毫米为单位. `spacing` 为像素间距 `(dx, dy)`.
    #[inline]
    pub fn area(&self, (dx, dy): (f64, f64)) -> f64 {
        self.count() as f64 * dx * dy
    }
}
