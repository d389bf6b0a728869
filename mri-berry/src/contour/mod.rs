//! 手绘轮廓.
//!
//! 轮廓以像素坐标系下的有序点列给出, 首尾隐式相连. 点的 `x` 为列 (宽方向),
//! `y` 为行 (高方向), 二者均不要求为整数.

use crate::{BerryError, BerryResult};
use std::path::Path;
use std::str::FromStr;

mod bbox;
mod raster;

pub use bbox::{bounding_box, BoundingBox};
pub use raster::rasterize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 像素坐标系下的点 `(x, y)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    /// 列坐标.
    pub x: f64,
    /// 行坐标.
    pub y: f64,
}

impl Point {
    /// 直接初始化.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// 首尾隐式相连的有序点列.
///
/// 少于 3 个点的轮廓是合法的退化轮廓, 它不围成任何面积.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    points: Vec<Point>,
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl FromStr for Contour {
    type Err = BerryError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Contour {
    /// 由点列直接创建.
    #[inline]
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// 解析行格式的轮廓文本: 每行两个以空白分隔的浮点数 `x y`, 行序即点序.
    ///
    /// 空行被跳过. 其它无法解析的行返回 `BerryError::InvalidInput`, 并给出行号 (从 1 开始).
    pub fn parse(text: &str) -> BerryResult<Self> {
        let mut points = Vec::with_capacity(64);
        for (index, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };
            let parse_field = |field: Option<&str>| -> BerryResult<f64> {
                field
                    .and_then(|f| f.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        BerryError::InvalidInput(format!(
                            "line {}: expected two numbers, got `{line}`",
                            index + 1
                        ))
                    })
            };
            let x = parse_field(Some(first))?;
            let y = parse_field(fields.next())?;
            points.push(Point::new(x, y));
        }
        Ok(Self { points })
    }

    /// 读取并解析本地轮廓文件.
    pub fn open<P: AsRef<Path>>(path: P) -> BerryResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// 点列.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// 点的个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否为空轮廓?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 是否为不围成面积的退化轮廓 (少于 3 个点)?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// 以首尾相连的方式迭代所有边 `(起点, 终点)`.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points
            .iter()
            .copied()
            .zip(self.points.iter().copied().cycle().skip(1))
    }
}

/// 从轮廓文件名中获取切片编号.
///
/// 文件名 (目录部分会被去掉) 以 `-` 分隔, 第三个字段即切片编号. 例如
/// `IM-0001-0048-icontour-manual.txt` 对应的编号为 48. 不符合该约定时返回 `None`.
pub fn slice_number_from_filename(name: &str) -> Option<u32> {
    let file = name.rsplit(['/', '\\']).next()?;
    file.split('-').nth(2)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{slice_number_from_filename, Contour, Point};
    use crate::BerryError;

    #[test]
    fn test_contour_parse() {
        let c: Contour = "120.50 137.50\n121.50 137.50\n\n  122.00 138.25  \n"
            .parse()
            .unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.points()[2], Point::new(122.0, 138.25));
        assert!(!c.is_degenerate());

        let c = Contour::parse("").unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_contour_parse_error() {
        let BerryError::InvalidInput(msg) = Contour::parse("1 2\n3\n").unwrap_err() else {
            panic!("wrong error kind")
        };
        assert!(msg.starts_with("line 2"));
        assert!(Contour::parse("1 nan").is_err());
        assert!(Contour::parse("a b").is_err());
    }

    #[test]
    fn test_contour_edges_closed() {
        let c: Contour = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
            .into_iter()
            .map(Point::from)
            .collect();
        let edges: Vec<_> = c.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], (Point::new(1.0, 1.0), Point::new(0.0, 0.0)));
        assert_eq!(Contour::default().edges().count(), 0);
    }

    #[test]
    fn test_slice_number_from_filename() {
        assert_eq!(
            slice_number_from_filename(
                "data/contourfiles/SC-HF-I-1/i-contours/IM-0001-0048-icontour-manual.txt"
            ),
            Some(48)
        );
        assert_eq!(slice_number_from_filename("IM-0001-0139-ocontour-manual.txt"), Some(139));
        assert_eq!(slice_number_from_filename("IM-0001"), None);
        assert_eq!(slice_number_from_filename("IM-0001-abc-x.txt"), None);
    }
}
