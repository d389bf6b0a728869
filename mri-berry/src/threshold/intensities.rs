//! 像素强度多重集.

use crate::{BerryError, BerryResult, DecodedImage, Mask};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// 掩膜下的像素强度多重集.
///
/// 以直方图 `强度 -> 出现次数` 存储: 顺序无关, 重复值通过计数保留
/// (重复值会影响混合模型拟合时的权重). 不接受 NaN 和 inf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Intensities {
    hist: BTreeMap<OrderedFloat<f64>, u64>,
    total: u64,
}

impl Intensities {
    /// 创建空多重集.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集 `image` 中位于 `mask` 区域内的所有像素强度.
    ///
    /// 形状不一致时返回 `BerryError::ShapeMismatch`.
    pub fn from_masked(image: &DecodedImage, mask: &Mask) -> BerryResult<Self> {
        mask.check_shape(image.shape())?;
        let mut ans = Self::new();
        for (pos, _) in mask.indexed_iter().filter(|&(_, &m)| m) {
            ans.push(image[pos] as f64)?;
        }
        Ok(ans)
    }

    /// 由任意强度序列创建.
    pub fn from_values<I: IntoIterator<Item = f64>>(it: I) -> BerryResult<Self> {
        let mut ans = Self::new();
        for v in it {
            ans.push(v)?;
        }
        Ok(ans)
    }

    /// 加入一个强度值. `v` 无意义 (NaN, inf) 时返回 `BerryError::InvalidInput`.
    pub fn push(&mut self, v: f64) -> BerryResult<()> {
        self.push_n(v, 1)
    }

    /// 加入 `n` 个相同的强度值.
    pub fn push_n(&mut self, v: f64, n: u64) -> BerryResult<()> {
        if !v.is_finite() {
            return Err(BerryError::InvalidInput(format!("intensity `{v}` is not finite")));
        }
        if n != 0 {
            *self.hist.entry(OrderedFloat(v)).or_default() += n;
            self.total += n;
        }
        Ok(())
    }

    /// 样本总数 (包括重复值).
    #[inline]
    pub fn len(&self) -> u64 {
        self.total
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// 不同强度值的个数.
    #[inline]
    pub fn distinct(&self) -> usize {
        self.hist.len()
    }

    /// 按强度升序迭代 `(强度, 次数)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (f64, u64)> + '_ {
        self.hist.iter().map(|(v, n)| (v.0, *n))
    }

    /// 最小强度. 为空时返回 `None`.
    #[inline]
    pub fn min(&self) -> Option<f64> {
        self.hist.keys().next().map(|v| v.0)
    }

    /// 最大强度. 为空时返回 `None`.
    #[inline]
    pub fn max(&self) -> Option<f64> {
        self.hist.keys().next_back().map(|v| v.0)
    }

    /// 平均强度. 为空时返回 `None`.
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| {
            self.iter().map(|(v, n)| v * n as f64).sum::<f64>() / self.total as f64
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Intensities;
    use crate::contour::{rasterize, Contour, Point};
    use crate::{BerryError, DecodedImage};
    use ndarray::Array2;

    #[test]
    fn test_intensities_multiset() {
        let it = Intensities::from_values([3.0, 1.0, 3.0, 2.0, 3.0]).unwrap();
        assert_eq!(it.len(), 5);
        assert_eq!(it.distinct(), 3);
        assert_eq!(it.iter().collect::<Vec<_>>(), vec![(1.0, 1), (2.0, 1), (3.0, 3)]);
        assert_eq!(it.min(), Some(1.0));
        assert_eq!(it.max(), Some(3.0));
        assert_eq!(it.mean(), Some(12.0 / 5.0));

        // 顺序无关.
        let other = Intensities::from_values([3.0, 3.0, 2.0, 3.0, 1.0]).unwrap();
        assert_eq!(it, other);
    }

    #[test]
    fn test_intensities_reject_nan() {
        assert!(matches!(
            Intensities::from_values([1.0, f64::NAN]).unwrap_err(),
            BerryError::InvalidInput(_)
        ));
        assert!(Intensities::new().mean().is_none());
    }

    #[test]
    fn test_intensities_from_masked() {
        let pixels = Array2::from_shape_fn((4, 4), |(h, w)| (h * 4 + w) as f32);
        let image = DecodedImage::new(pixels, (1.0, 1.0)).unwrap();
        let c: Contour = [(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]
            .into_iter()
            .map(Point::from)
            .collect();
        let mask = rasterize(&c, 4, 4).unwrap();
        let it = Intensities::from_masked(&image, &mask).unwrap();
        assert_eq!(
            it.iter().map(|(v, _)| v).collect::<Vec<_>>(),
            vec![5.0, 6.0, 9.0, 10.0]
        );

        let wrong = rasterize(&c, 5, 4).unwrap();
        assert!(matches!(
            Intensities::from_masked(&image, &wrong).unwrap_err(),
            BerryError::ShapeMismatch { .. }
        ));
    }
}
