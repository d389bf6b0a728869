//! 阈值分割运行统计.

use std::time::{Duration, Instant};

/// 分段累计的时钟: 每段以 `lap_start` 开始, 以 `lap_end` 结束并计入总时长.
#[derive(Clone, Debug)]
struct LapClock {
    total: Duration,
    lap: Instant,
}

impl LapClock {
    fn new() -> Self {
        Self {
            total: Duration::ZERO,
            lap: Instant::now(),
        }
    }

    #[inline]
    fn lap_start(&mut self) {
        self.lap = Instant::now();
    }

    /// 返回本段时长.
    #[inline]
    fn lap_end(&mut self) -> Duration {
        let d = self.lap.elapsed();
        self.total += d;
        d
    }

    #[inline]
    fn total_us(&self) -> u64 {
        self.total.as_micros() as u64
    }
}

/// 单个分割参数组合在整个数据集上的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 拟合或评估失败的切片个数.
    failed: u64,

    /// 成功评估的切片个数.
    evaluated: u64,

    /// 评估切片花费的总时间.
    eval_time: LapClock,

    /// 整个任务花费的总时间.
    real_time: LapClock,

    /// 最耗时的一次评估.
    most: Option<Duration>,

    /// Jaccard 系数之和.
    jaccard_sum: f64,

    /// Jaccard 系数最低的切片 `(切片编号, 系数)`.
    worst: Option<(Option<u32>, f64)>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            failed: 0,
            evaluated: 0,
            eval_time: LapClock::new(),
            real_time: LapClock::new(),
            most: None,
            jaccard_sum: 0.0,
            worst: None,
        }
    }

    /// 开始一次评估计时.
    #[inline]
    pub fn eval_start(&mut self) {
        self.eval_time.lap_start();
    }

    /// 结束一次评估计时.
    #[inline]
    pub fn eval_elapsed(&mut self) {
        let d = self.eval_time.lap_end();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一次失败的评估.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 记录一次成功的评估.
    pub fn count_jaccard(&mut self, slice_number: Option<u32>, jaccard: f64) {
        self.evaluated += 1;
        self.jaccard_sum += jaccard;
        if self.worst.map_or(true, |(_, j)| jaccard < j) {
            self.worst = Some((slice_number, jaccard));
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.lap_end();
        self
    }

    /// 失败个数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 成功个数.
    #[inline]
    pub fn get_evaluated(&self) -> u64 {
        self.evaluated
    }

    /// 以微秒为单位获得评估的总花费自然时间.
    #[inline]
    pub fn get_eval_time_us(&self) -> u64 {
        self.eval_time.total_us()
    }

    /// 以微秒为单位获得任务的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 平均 Jaccard 系数.
    #[inline]
    pub fn get_avg_jaccard(&self) -> Option<f64> {
        match self.evaluated {
            0 => None,
            n => Some(self.jaccard_sum / n as f64),
        }
    }

    /// Jaccard 系数最低的切片.
    #[inline]
    pub fn get_worst(&self) -> Option<(Option<u32>, f64)> {
        self.worst
    }

    /// 最耗时的一次评估.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
