//! 二值形态学膨胀.

use crate::{Idx2d, Mask};

/// 半径为 `radius` 的圆盘结构元素 `{(dr, dc) : dr² + dc² <= radius²}`, 按行优先排列.
pub fn disk(radius: u32) -> Vec<(i64, i64)> {
    let r = radius as i64;
    let mut offsets = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r * r {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// 以圆盘结构元素膨胀 `mask`, 返回新掩膜.
///
/// 结果是原区域的超集, 形状不变. `radius` 为 0 时结果与输入相同.
pub fn dilate(mask: &Mask, radius: u32) -> Mask {
    if radius == 0 {
        return mask.clone();
    }
    let (height, width) = mask.shape();
    let offsets = disk(radius);
    let shift = |(h, w): Idx2d, (dr, dc): (i64, i64)| -> Option<Idx2d> {
        let (h, w) = (h as i64 + dr, w as i64 + dc);
        ((0..height as i64).contains(&h) && (0..width as i64).contains(&w))
            .then_some((h as usize, w as usize))
    };

    let mut ans = Mask::background(mask.shape());
    for pos in mask.positions::<Vec<_>>() {
        for off in offsets.iter() {
            if let Some(p) = shift(pos, *off).and_then(|q| ans.get_mut(q)) {
                *p = true;
            }
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::{dilate, disk};
    use crate::contour::{rasterize, Contour, Point};
    use crate::Mask;

    fn square(lo: f64, hi: f64, size: usize) -> Mask {
        let c: Contour = [(lo, lo), (hi, lo), (hi, hi), (lo, hi)]
            .into_iter()
            .map(Point::from)
            .collect();
        rasterize(&c, size, size).unwrap()
    }

    #[test]
    fn test_disk() {
        assert_eq!(disk(0), vec![(0, 0)]);
        assert_eq!(disk(1).len(), 5);
        assert_eq!(disk(2).len(), 13);
        assert_eq!(disk(3).len(), 29);
    }

    #[test]
    fn test_dilate_identity() {
        let m = square(3.0, 6.0, 12);
        assert_eq!(dilate(&m, 0), m);
    }

    #[test]
    fn test_dilate_single_pixel() {
        // 单个孤立像素膨胀后恰好是圆盘本身.
        let point = Contour::new(vec![
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.0),
        ]);
        let dot = rasterize(&point, 11, 11).unwrap();
        assert_eq!(dot.positions::<Vec<_>>(), vec![(5, 5)]);
        assert_eq!(dilate(&dot, 3).count(), disk(3).len());
    }

    #[test]
    fn test_dilate_monotone_and_clipped() {
        let m = square(0.0, 3.0, 10);
        let d1 = dilate(&m, 1);
        let d3 = dilate(&m, 3);
        assert_eq!(d1.shape(), m.shape());
        assert!(m.is_subset_of(&d1).unwrap());
        assert!(d1.is_subset_of(&d3).unwrap());
        // 4x4 方块半径 1 膨胀后, 在网格内只向右下扩展一圈.
        assert_eq!(d1.count(), 5 * 5 - 1);
        assert!(!d1[(4, 4)]);
        assert!(d1[(4, 3)]);
    }
}
