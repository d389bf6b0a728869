//! 区域重叠度量.

use crate::{BerryResult, Mask};

/// 两个掩膜一次遍历得到的计数.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlapCounts {
    /// `|a ∧ b|`.
    pub intersection: usize,
    /// `|a ∨ b|`.
    pub union: usize,
    /// `|a|`.
    pub left: usize,
    /// `|b|`.
    pub right: usize,
}

impl OverlapCounts {
    /// 统计 `a`, `b` 的交集, 并集与各自的大小.
    ///
    /// 形状不一致时返回 `BerryError::ShapeMismatch`, 不做任何截断.
    pub fn new(a: &Mask, b: &Mask) -> BerryResult<Self> {
        a.check_shape(b.shape())?;
        let mut ans = Self::default();
        for (&p, &q) in a.iter().zip(b.iter()) {
            ans.intersection += (p && q) as usize;
            ans.union += (p || q) as usize;
            ans.left += p as usize;
            ans.right += q as usize;
        }
        Ok(ans)
    }

    /// Jaccard 系数. 并集为空时为 `0.0`.
    #[inline]
    pub fn jaccard(&self) -> f64 {
        match self.union {
            0 => 0.0,
            u => self.intersection as f64 / u as f64,
        }
    }

    /// Dice 系数. 两者均为空时为 `0.0`.
    #[inline]
    pub fn dice(&self) -> f64 {
        match self.left + self.right {
            0 => 0.0,
            s => 2.0 * self.intersection as f64 / s as f64,
        }
    }
}

/// Jaccard 系数 `|a ∧ b| / |a ∨ b|`, 取值 `[0, 1]`.
///
/// 两个掩膜均为空时约定为 `0.0` (而不是 NaN).
pub fn jaccard(a: &Mask, b: &Mask) -> BerryResult<f64> {
    Ok(OverlapCounts::new(a, b)?.jaccard())
}

/// Dice 系数 `2|a ∧ b| / (|a| + |b|)`, 取值 `[0, 1]`.
pub fn dice(a: &Mask, b: &Mask) -> BerryResult<f64> {
    Ok(OverlapCounts::new(a, b)?.dice())
}

#[cfg(test)]
mod tests {
    use super::{dice, jaccard, OverlapCounts};
    use crate::contour::{rasterize, Contour, Point};
    use crate::{BerryError, Mask};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64, w: usize, h: usize) -> Mask {
        let c: Contour = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
            .into_iter()
            .map(Point::from)
            .collect();
        rasterize(&c, w, h).unwrap()
    }

    #[test]
    fn test_jaccard_identity_and_symmetry() {
        let a = rect(1.0, 1.0, 4.0, 4.0, 10, 10);
        let b = rect(3.0, 2.0, 7.0, 5.0, 10, 10);
        assert_eq!(jaccard(&a, &a).unwrap(), 1.0);
        assert_eq!(jaccard(&a, &b).unwrap(), jaccard(&b, &a).unwrap());

        let counts = OverlapCounts::new(&a, &b).unwrap();
        // a: 16 像素, b: 20 像素, 交集为列 3..=4, 行 2..=4.
        assert_eq!(counts.left, 16);
        assert_eq!(counts.right, 20);
        assert_eq!(counts.intersection, 6);
        assert_eq!(counts.union, 30);
        assert_eq!(jaccard(&a, &b).unwrap(), 0.2);
        assert_eq!(dice(&a, &b).unwrap(), 12.0 / 36.0);
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = rect(0.0, 0.0, 2.0, 2.0, 8, 8);
        let b = rect(5.0, 5.0, 7.0, 7.0, 8, 8);
        assert_eq!(jaccard(&a, &b).unwrap(), 0.0);
        let big = rect(0.0, 0.0, 7.0, 7.0, 8, 8);
        let j = jaccard(&a, &big).unwrap();
        assert!(j > 0.0 && j < 1.0);
    }

    #[test]
    fn test_jaccard_empty_masks() {
        let e = Mask::background((6, 6));
        assert_eq!(jaccard(&e, &e).unwrap(), 0.0);
        assert_eq!(dice(&e, &e).unwrap(), 0.0);
    }

    #[test]
    fn test_jaccard_shape_mismatch() {
        let a = Mask::background((10, 10));
        let b = Mask::background((10, 11));
        assert_eq!(
            jaccard(&a, &b).unwrap_err(),
            BerryError::ShapeMismatch {
                left: (10, 10),
                right: (10, 11)
            }
        );
    }
}
