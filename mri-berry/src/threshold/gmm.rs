//! 一维高斯混合模型的 EM 拟合.
//!
//! 直方图中的每个不同强度值视为一个带权样本, 权重为其出现次数,
//! 这与在完整的多重集上运行 EM 等价.

use super::{Component, Intensities, MixtureModel, ThresholdSpec};
use crate::{BerryResult, FitError};
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// k-means 细化的迭代上限.
const LLOYD_MAX_ITER: u32 = 100;

/// 相对总样本数的质量下限, 低于此值的分量视为空分量.
const EMPTY_MASS: f64 = 1e-8;

pub(crate) struct GmmImp<'a> {
    /// 不同的强度值, 升序.
    xs: Array1<f64>,
    /// 每个强度值的出现次数.
    ws: Array1<f64>,
    total: f64,
    spec: &'a ThresholdSpec,
}

impl<'a> GmmImp<'a> {
    pub fn new(intensities: &Intensities, spec: &'a ThresholdSpec) -> BerryResult<Self> {
        let k = spec.components();
        if intensities.is_empty() {
            return Err(FitError::EmptyIntensities.into());
        }
        if k < 1 {
            return Err(FitError::InvalidComponents(k).into());
        }
        if intensities.len() < k as u64 {
            return Err(FitError::TooFewSamples(intensities.len(), k).into());
        }

        let (xs, ws): (Vec<f64>, Vec<f64>) =
            intensities.iter().map(|(v, n)| (v, n as f64)).unzip();
        Ok(Self {
            xs: Array1::from_vec(xs),
            ws: Array1::from_vec(ws),
            total: intensities.len() as f64,
            spec,
        })
    }

    #[inline]
    fn k(&self) -> usize {
        self.spec.components() as usize
    }

    pub fn fit(&self) -> BerryResult<MixtureModel> {
        let centers = self.lloyd(self.seed_centers());
        let mut comps = self.init_components(&centers);
        let mut prev = f64::NEG_INFINITY;

        for iter in 1..=self.spec.max_iter() {
            let (ll, resp) = self.e_step(&comps);
            comps = self.m_step(&resp, &comps);
            if !ll.is_finite() || !comps.iter().all(Component::is_finite) {
                return Err(FitError::Degenerate.into());
            }
            if (ll - prev).abs() < self.spec.tol() {
                let (ll, _) = self.e_step(&comps);
                debug!("EM converged after {iter} iterations, log-likelihood {ll:.6}");
                return Ok(MixtureModel::new(comps, iter, ll));
            }
            prev = ll;
        }

        warn!(
            "EM did not converge within {} iterations ({} samples, {} components)",
            self.spec.max_iter(),
            self.total,
            self.k()
        );
        Err(FitError::NotConverged(self.spec.max_iter()).into())
    }

    /// 带权 k-means++ 初始化.
    fn seed_centers(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.spec.seed());
        let mut centers = Vec::with_capacity(self.k());
        let counts = self.ws.to_vec();
        centers.push(self.xs[Self::pick(&mut rng, &counts)]);

        while centers.len() < self.k() {
            let d2 = self.xs.iter().zip(self.ws.iter()).map(|(&x, &w)| {
                let d = centers
                    .iter()
                    .map(|c| (x - c) * (x - c))
                    .fold(f64::INFINITY, f64::min);
                w * d
            });
            let d2: Vec<f64> = d2.collect();
            let next = if d2.iter().sum::<f64>() > 0.0 {
                Self::pick(&mut rng, &d2)
            } else {
                // 所有样本都已经是中心.
                Self::pick(&mut rng, &counts)
            };
            centers.push(self.xs[next]);
        }
        debug!("k-means++ seeds: {centers:?}");
        centers
    }

    /// 按照非负权重 `weights` 随机选取一个下标.
    fn pick(rng: &mut StdRng, weights: &[f64]) -> usize {
        let sum: f64 = weights.iter().sum();
        let mut target = rng.random::<f64>() * sum;
        let mut last = 0;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            last = i;
            if target < w {
                return i;
            }
            target -= w;
        }
        last
    }

    /// 下标最小的最近中心.
    #[inline]
    fn nearest(centers: &[f64], x: f64) -> usize {
        let mut best = 0;
        for (i, c) in centers.iter().enumerate().skip(1) {
            if (x - c).abs() < (x - centers[best]).abs() {
                best = i;
            }
        }
        best
    }

    /// Lloyd 细化. 空簇保留原中心.
    fn lloyd(&self, mut centers: Vec<f64>) -> Vec<f64> {
        let mut labels = vec![usize::MAX; self.xs.len()];
        for _ in 0..LLOYD_MAX_ITER {
            let mut changed = false;
            for (label, &x) in labels.iter_mut().zip(self.xs.iter()) {
                let l = Self::nearest(&centers, x);
                changed |= *label != l;
                *label = l;
            }
            if !changed {
                break;
            }

            let mut sums = vec![(0.0, 0.0); centers.len()];
            for ((&l, &x), &w) in labels.iter().zip(self.xs.iter()).zip(self.ws.iter()) {
                sums[l].0 += w * x;
                sums[l].1 += w;
            }
            for (c, (sx, sw)) in centers.iter_mut().zip(sums) {
                if sw > 0.0 {
                    *c = sx / sw;
                }
            }
        }
        centers
    }

    /// 由 k-means 的硬划分得到 EM 的初始参数.
    fn init_components(&self, centers: &[f64]) -> Vec<Component> {
        let mut resp = Array2::<f64>::zeros((self.xs.len(), self.k()));
        for (i, &x) in self.xs.iter().enumerate() {
            resp[(i, Self::nearest(centers, x))] = 1.0;
        }
        let mean = self.xs.dot(&self.ws) / self.total;
        let var = self
            .xs
            .iter()
            .zip(self.ws.iter())
            .map(|(&x, &w)| w * (x - mean) * (x - mean))
            .sum::<f64>()
            / self.total;
        let prior: Vec<Component> = centers
            .iter()
            .map(|&c| Component::new(c, var + self.spec.reg_covar(), 1.0))
            .collect();
        self.m_step(&resp, &prior)
    }

    /// 返回平均对数似然, 以及责任矩阵 (样本数 x 分量数).
    fn e_step(&self, comps: &[Component]) -> (f64, Array2<f64>) {
        let mut log_resp = Array2::<f64>::zeros((self.xs.len(), comps.len()));
        let mut ll = 0.0;
        for (i, (&x, &w)) in self.xs.iter().zip(self.ws.iter()).enumerate() {
            let mut row = log_resp.row_mut(i);
            for (j, c) in comps.iter().enumerate() {
                row[j] = c.weight.ln() + c.log_pdf(x);
            }
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let lse = max + row.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
            row.mapv_inplace(|v| (v - lse).exp());
            ll += w * lse;
        }
        (ll / self.total, log_resp)
    }

    fn m_step(&self, resp: &Array2<f64>, prev: &[Component]) -> Vec<Component> {
        let weighted = resp * &self.ws.view().insert_axis(Axis(1));
        let mut comps: Vec<Component> = weighted
            .columns()
            .into_iter()
            .zip(prev)
            .map(|(col, old)| {
                let mass = col.sum();
                let nk = mass + 10.0 * f64::EPSILON;
                // 空分量保留原均值和方差, 只更新权重.
                if mass <= EMPTY_MASS * self.total {
                    return Component::new(old.mean, old.variance, nk);
                }
                let mean = col.dot(&self.xs) / mass;
                let var = col
                    .iter()
                    .zip(self.xs.iter())
                    .map(|(&r, &x)| r * (x - mean) * (x - mean))
                    .sum::<f64>()
                    / nk
                    + self.spec.reg_covar();
                Component::new(mean, var, nk)
            })
            .collect();

        let norm: f64 = comps.iter().map(|c| c.weight).sum();
        for c in comps.iter_mut() {
            c.weight /= norm;
        }
        comps
    }
}

impl Component {
    #[inline]
    fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.variance.is_finite() && self.weight.is_finite()
    }

    /// 对数概率密度 `ln N(x; mean, variance)`.
    #[inline]
    pub(crate) fn log_pdf(&self, x: f64) -> f64 {
        let d = x - self.mean;
        -0.5 * ((2.0 * PI * self.variance).ln() + d * d / self.variance)
    }
}

#[cfg(test)]
mod tests {
    use super::GmmImp;
    use crate::threshold::{Intensities, ThresholdSpec};

    #[test]
    fn test_seed_centers_distinct_values() {
        let it = Intensities::from_values([10.0, 10.0, 100.0, 200.0, 200.0]).unwrap();
        let spec = ThresholdSpec::default().with_components(3);
        let imp = GmmImp::new(&it, &spec).unwrap();
        let mut centers = imp.seed_centers();
        centers.sort_by(f64::total_cmp);
        assert_eq!(centers, vec![10.0, 100.0, 200.0]);
    }

    #[test]
    fn test_lloyd_fixes_bad_seeds() {
        let values = (0..5).flat_map(|d| [48.0 + d as f64, 148.0 + d as f64]);
        let it = Intensities::from_values(values).unwrap();
        let spec = ThresholdSpec::default();
        let imp = GmmImp::new(&it, &spec).unwrap();
        let centers = imp.lloyd(vec![48.0, 49.0]);
        assert_eq!(centers, vec![50.0, 150.0]);
    }

    #[test]
    fn test_empty_component_keeps_center() {
        let it = Intensities::from_values([7.0; 10]).unwrap();
        let spec = ThresholdSpec::default();
        let imp = GmmImp::new(&it, &spec).unwrap();
        let comps = imp.init_components(&[7.0, 7.0]);
        assert_eq!(comps[0].mean, 7.0);
        assert_eq!(comps[1].mean, 7.0);

        let (_, resp) = imp.e_step(&comps);
        let comps = imp.m_step(&resp, &comps);
        assert!(comps.iter().all(|c| c.mean == 7.0));
        assert!(comps[1].weight < 1e-9);
    }

    #[test]
    fn test_nearest_tie_prefers_lower_index() {
        assert_eq!(GmmImp::nearest(&[0.0, 2.0], 1.0), 0);
        assert_eq!(GmmImp::nearest(&[0.0, 2.0, 1.5], 1.8), 2);
    }
}
