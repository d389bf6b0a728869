//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 叠加图使用的 RGB 颜色.
pub mod rgb {
    /// 真值区域 (内轮廓) 颜色: 绿色.
    pub const GROUND_TRUTH: [u8; 3] = [0, 255, 0];

    /// 预测区域颜色: 红色.
    pub const PREDICTED: [u8; 3] = [255, 0, 0];

    /// 真值与预测重合区域颜色: 黄色.
    pub const OVERLAP: [u8; 3] = [255, 255, 0];
}

/// 默认的高斯混合分量个数.
pub const DEFAULT_COMPONENTS: u32 = 2;

/// 默认的混合模型初始化随机种子.
pub const DEFAULT_SEED: u64 = 0;

/// EM 迭代次数上限.
pub const DEFAULT_MAX_ITER: u32 = 200;

/// EM 收敛门限 (平均对数似然的变化量).
pub const DEFAULT_TOL: f64 = 1e-3;

/// 加到每个分量方差上的正则项, 防止方差塌缩为 0.
pub const DEFAULT_REG_COVAR: f64 = 1e-6;

/// 默认的膨胀圆盘半径.
pub const DEFAULT_DILATION_RADIUS: u32 = 3;

/// 叠加图默认的包围盒外扩像素数.
pub const DEFAULT_OVERLAY_MARGIN: i64 = 30;

/// 密度曲线采样点个数上限.
pub const MAX_DENSITY_SAMPLES: usize = 1 << 16;
