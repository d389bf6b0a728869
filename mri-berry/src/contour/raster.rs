//! 多边形扫描转换.
//!
//! 像素 `(row, col)` 的采样点为 `(x = col, y = row)`. 填充规则为 even-odd:
//! 对每一行, 用半开规则 `(y0 <= y) != (y1 <= y)` 求出与各边的交点,
//! 排序后两两配对, 闭区间填充. 另外, 采样点恰好落在边上
//! (包括水平边和顶点) 的像素也计入区域, 即 "填充" 而非 "描边".

use super::{Contour, Point};
use crate::{BerryError, BerryResult, Mask};

/// 浮点比较容差.
const EPS: f64 = 1e-9;

/// 将 `contour` 栅格化为 `height` 行 `width` 列的掩膜.
///
/// # 返回值
///
/// - `width` 或 `height` 为 0 时返回 `BerryError::InvalidInput`;
/// - 少于 3 个点的退化轮廓得到全背景掩膜;
/// - 超出 `[0, width) x [0, height)` 的坐标照常参与几何计算,
///   但不会产生网格以外的像素, 也不会因此出错.
///
/// 同样的输入总是得到逐位相同的结果.
pub fn rasterize(contour: &Contour, width: usize, height: usize) -> BerryResult<Mask> {
    if width == 0 || height == 0 {
        return Err(BerryError::InvalidInput(format!(
            "mask dimensions must be positive, got {width}x{height}"
        )));
    }
    let mut mask = Mask::background((height, width));
    if contour.is_degenerate() {
        return Ok(mask);
    }

    let mut crossings = Vec::with_capacity(8);
    for row in 0..height {
        let y = row as f64;
        crossings.clear();
        crossings.extend(contour.edges().filter_map(|(a, b)| crossing_at(a, b, y)));
        crossings.sort_by(f64::total_cmp);
        debug_assert_eq!(crossings.len() % 2, 0);

        for span in crossings.chunks_exact(2) {
            fill_span(&mut mask, row, span[0], span[1]);
        }
    }

    for (a, b) in contour.edges() {
        stroke_edge(&mut mask, a, b);
    }
    Ok(mask)
}

/// 边 `a -> b` 与水平线 `y` 的交点横坐标. 按半开规则判定, 水平边永远不相交.
#[inline]
fn crossing_at(a: Point, b: Point, y: f64) -> Option<f64> {
    ((a.y <= y) != (b.y <= y)).then(|| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
}

/// 将第 `row` 行中 `[x0, x1]` 闭区间内的像素填充为区域内部.
fn fill_span(mask: &mut Mask, row: usize, x0: f64, x1: f64) {
    let Some((lo, hi)) = column_range(x0, x1, mask.width()) else {
        return;
    };
    for col in lo..=hi {
        if let Some(p) = mask.get_mut((row, col)) {
            *p = true;
        }
    }
}

/// `[x0, x1]` 覆盖的列区间, 已裁剪到 `[0, width)`. 空区间返回 `None`.
fn column_range(x0: f64, x1: f64, width: usize) -> Option<(usize, usize)> {
    let lo = (x0 - EPS).ceil().max(0.0);
    let hi = (x1 + EPS).floor().min(width as f64 - 1.0);
    (lo <= hi).then_some((lo as usize, hi as usize))
}

/// 将采样点恰好落在边 `a -> b` 上的所有像素标记为区域内部.
fn stroke_edge(mask: &mut Mask, a: Point, b: Point) {
    let height = mask.height() as f64;
    let (y_lo, y_hi) = if a.y <= b.y { (a.y, b.y) } else { (b.y, a.y) };
    let first = (y_lo - EPS).ceil().max(0.0);
    let last = (y_hi + EPS).floor().min(height - 1.0);
    if first > last {
        return;
    }

    for row in first as usize..=last as usize {
        let y = row as f64;
        if (b.y - a.y).abs() <= EPS {
            // 水平边: 整段落在该行上.
            let (x0, x1) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
            fill_span(mask, row, x0, x1);
            continue;
        }
        let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
        let col = x.round();
        if (x - col).abs() <= EPS && col >= 0.0 && col < mask.width() as f64 {
            if let Some(p) = mask.get_mut((row, col as usize)) {
                *p = true;
            }
        }
    }
}
