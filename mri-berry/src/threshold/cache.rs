//! 拟合结果的共享缓存.

use super::{fit_mixture, Intensities, MixtureModel, ThresholdSpec};
use crate::BerryResult;
use log::debug;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// 缓存键: 强度多重集的完整内容, 以及所有影响拟合结果的参数.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FitKey {
    intensities: Intensities,
    components: u32,
    seed: u64,
    max_iter: u32,
    tol: u64,
    reg_covar: u64,
}

impl FitKey {
    fn new(intensities: &Intensities, spec: &ThresholdSpec) -> Self {
        Self {
            intensities: intensities.clone(),
            components: spec.components(),
            seed: spec.seed(),
            max_iter: spec.max_iter(),
            tol: spec.tol().to_bits(),
            reg_covar: spec.reg_covar().to_bits(),
        }
    }
}

type Slot = Arc<OnceCell<BerryResult<Arc<MixtureModel>>>>;

/// 多线程共享的拟合结果缓存.
///
/// 对同一个键, 至多只有一个线程在拟合, 其它线程阻塞等待并共享同一个结果
/// (包括错误). 后处理参数不影响拟合, 因此不参与缓存键.
#[derive(Debug, Default)]
pub struct FitCache {
    slots: Mutex<HashMap<FitKey, Slot>>,
    fits: AtomicUsize,
}

impl FitCache {
    /// 创建空缓存.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取缓存的模型; 没有时拟合并缓存.
    pub fn get_or_fit(
        &self,
        intensities: &Intensities,
        spec: &ThresholdSpec,
    ) -> BerryResult<Arc<MixtureModel>> {
        let key = FitKey::new(intensities, spec);
        let slot: Slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key).or_default().clone()
        };
        slot.get_or_init(|| {
            self.fits.fetch_add(1, Ordering::Relaxed);
            debug!(
                "fitting {} samples with {} components",
                intensities.len(),
                spec.components()
            );
            fit_mixture(intensities, spec).map(Arc::new)
        })
        .clone()
    }

    /// 缓存的键个数.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 缓存是否为空?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 实际执行过的拟合次数.
    #[inline]
    pub fn fit_count(&self) -> usize {
        self.fits.load(Ordering::Relaxed)
    }
}
