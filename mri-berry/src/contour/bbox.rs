use super::Contour;
use crate::{BerryError, BerryResult};
use itertools::{Itertools, MinMaxResult};
use std::ops::Range;

/// 轴对齐包围盒, 整数像素边界.
///
/// 边界可能超出图像范围. 用于索引图像之前, 调用者应当先 [`BoundingBox::clip`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    /// 最小列坐标.
    pub min_x: i64,
    /// 最大列坐标.
    pub max_x: i64,
    /// 最小行坐标.
    pub min_y: i64,
    /// 最大行坐标.
    pub max_y: i64,
}

/// 求 `contour` 外扩 `margin` 像素后的包围盒.
///
/// `min_x = floor(min x) - margin`, `max_x = ceil(max x) + margin`, y 方向同理.
/// 不会裁剪到图像范围内. 空轮廓返回 `BerryError::InvalidInput`.
pub fn bounding_box(contour: &Contour, margin: i64) -> BerryResult<BoundingBox> {
    let extent = |mm: MinMaxResult<f64>| match mm {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    };
    let points = contour.points();
    let empty = || BerryError::InvalidInput("bounding box of an empty contour".into());
    let (x0, x1) = extent(points.iter().map(|p| p.x).minmax_by(f64::total_cmp)).ok_or_else(empty)?;
    let (y0, y1) = extent(points.iter().map(|p| p.y).minmax_by(f64::total_cmp)).ok_or_else(empty)?;

    Ok(BoundingBox {
        min_x: x0.floor() as i64 - margin,
        max_x: x1.ceil() as i64 + margin,
        min_y: y0.floor() as i64 - margin,
        max_y: y1.ceil() as i64 + margin,
    })
}

impl BoundingBox {
    /// 列方向跨度 `max_x - min_x`.
    #[inline]
    pub fn width(&self) -> i64 {
        self.max_x - self.min_x
    }

    /// 行方向跨度 `max_y - min_y`.
    #[inline]
    pub fn height(&self) -> i64 {
        self.max_y - self.min_y
    }

    /// 裁剪到 `height` 行 `width` 列的图像内, 返回 `(行区间, 列区间)`.
    ///
    /// 区间为左闭右开的 `[min, max)`, 与切片语义一致. 当包围盒与图像不相交时,
    /// 返回的区间为空.
    pub fn clip(&self, height: usize, width: usize) -> (Range<usize>, Range<usize>) {
        #[inline]
        fn clamp(v: i64, len: usize) -> usize {
            v.clamp(0, len as i64) as usize
        }
        let rows = clamp(self.min_y, height)..clamp(self.max_y, height);
        let cols = clamp(self.min_x, width)..clamp(self.max_x, width);
        (rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::{bounding_box, BoundingBox};
    use crate::contour::{Contour, Point};
    use crate::BerryError;

    #[test]
    fn test_bounding_box_formula() {
        let c: Contour = [(10.5, 20.25), (30.0, 5.75), (12.2, 40.9)]
            .into_iter()
            .map(Point::from)
            .collect();
        let b = bounding_box(&c, 3).unwrap();
        assert_eq!(
            b,
            BoundingBox {
                min_x: 7,
                max_x: 33,
                min_y: 2,
                max_y: 44
            }
        );
        assert_eq!(b.width(), 26);
        assert_eq!(b.height(), 42);

        let b = bounding_box(&c, 0).unwrap();
        assert_eq!((b.min_x, b.max_x, b.min_y, b.max_y), (10, 30, 5, 41));
    }

    #[test]
    fn test_bounding_box_single_point() {
        let c = Contour::new(vec![Point::new(2.5, 2.5)]);
        let b = bounding_box(&c, 1).unwrap();
        assert_eq!((b.min_x, b.max_x, b.min_y, b.max_y), (1, 4, 1, 4));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(matches!(
            bounding_box(&Contour::default(), 30).unwrap_err(),
            BerryError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_bounding_box_clip() {
        let c = Contour::new(vec![Point::new(1.0, 1.0), Point::new(8.0, 9.0)]);
        let b = bounding_box(&c, 5).unwrap();
        assert_eq!(b.min_x, -4);
        let (rows, cols) = b.clip(10, 12);
        assert_eq!(rows, 0..10);
        assert_eq!(cols, 0..12);

        let far = BoundingBox {
            min_x: 50,
            max_x: 60,
            min_y: -20,
            max_y: -10,
        };
        let (rows, cols) = far.clip(10, 12);
        assert!(rows.is_empty());
        assert!(cols.is_empty());
    }
}
