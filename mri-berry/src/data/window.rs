/// 强度窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// MRI 强度没有统一的物理标尺, 因此一般由图像自身的强度范围 ([`Self::from_range`]) 构建.
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct IntensityWindow {
    level: f32,
    width: f32,
}

impl IntensityWindow {
    /// 构建强度窗.
    ///
    /// `level` 必须是有限数, `width` 必须为正有限数, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<IntensityWindow> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 以 `[lo, hi]` 为上下限构建强度窗. 当 `lo >= hi` 或任一值无意义时返回 `None`.
    pub fn from_range(lo: f32, hi: f32) -> Option<IntensityWindow> {
        Self::new((lo + hi) / 2.0, hi - lo)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗设置下, 强度 `v` 对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if v <= lb {
            Some(u8::MIN)
        } else if v >= self.upper_bound() {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some((((v - lb) / self.width()) * 255.0) as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::IntensityWindow;

    #[test]
    fn test_window_invalid_input() {
        assert!(IntensityWindow::new(0.0, -1.0).is_none());
        assert!(IntensityWindow::new(0.0, 0.0).is_none());
        assert!(IntensityWindow::new(f32::NAN, 1.0).is_none());
        assert!(IntensityWindow::from_range(5.0, 5.0).is_none());
    }

    #[test]
    fn test_window_generic() {
        // [0, 400]
        let win = IntensityWindow::from_range(0.0, 400.0).unwrap();
        assert_eq!(win.level(), 200.0);
        assert_eq!(win.eval(f32::NAN), None);
        assert_eq!(win.eval(-10.0), Some(0));
        assert_eq!(win.eval(0.0), Some(0));
        assert_eq!(win.eval(100.0), Some((255.0 * 0.25) as u8));
        assert_eq!(win.eval(200.0), Some((255.0 * 0.5) as u8));
        assert_eq!(win.eval(399.99), Some(254));
        assert_eq!(win.eval(400.0), Some(255));
        assert_eq!(win.eval(f32::MAX), Some(255));
    }
}
