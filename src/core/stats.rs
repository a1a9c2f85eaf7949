use crate::utils::error::{Result, SpecError};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// `1/2 + erf(1/sqrt(2))/2`，即標準常態分布在 1 的 CDF
pub const ONE_SIGMA_QUANTILE: f64 = 0.841_344_746_068_542_9;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 線性內插的分位數
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 平均值的不確定度: `sqrt(sum(u^2)) / N`
pub fn avg_uncertainty(uncertainties: &[f64]) -> f64 {
    if uncertainties.is_empty() {
        return f64::NAN;
    }
    uncertainties.iter().map(|u| u * u).sum::<f64>().sqrt() / uncertainties.len() as f64
}

/// 以 Bernoulli 累加取樣 Binomial(trials, p)
pub fn sample_binomial<R: Rng + ?Sized>(rng: &mut R, trials: u64, p: f64) -> u64 {
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    if p == 0.0 {
        return 0;
    }
    if p == 1.0 {
        return trials;
    }
    (0..trials).filter(|_| rng.gen_bool(p)).count() as u64
}

/// Basic bootstrap interval at one standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn from_samples(samples: &[f64]) -> Self {
        let m = mean(samples);
        Self {
            lower: 2.0 * m - quantile(samples, ONE_SIGMA_QUANTILE),
            upper: 2.0 * m - quantile(samples, 1.0 - ONE_SIGMA_QUANTILE),
        }
    }

    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// 收集 bootstrap 擬合的 `[截距, 保真度]`，失敗的只計數
#[derive(Debug, Default)]
pub struct BootstrapFits {
    intercepts: Vec<f64>,
    fidelities: Vec<f64>,
    failed: usize,
}

impl BootstrapFits {
    pub fn with_capacity(resamples: usize) -> Self {
        Self {
            intercepts: Vec::with_capacity(resamples),
            fidelities: Vec::with_capacity(resamples),
            failed: 0,
        }
    }

    pub fn record(&mut self, fit: Result<[f64; 2]>) {
        match fit {
            Ok([intercept, fidelity]) if intercept.is_finite() && fidelity.is_finite() => {
                self.intercepts.push(intercept);
                self.fidelities.push(fidelity);
            }
            _ => self.failed += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.intercepts.len()
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// 至少要兩個成功的擬合才能估計區間
    pub fn finish(self) -> Result<(Interval, Interval)> {
        if self.failed > 0 {
            tracing::warn!(
                "{} of {} bootstrap fits failed",
                self.failed,
                self.failed + self.succeeded()
            );
        }
        if self.succeeded() < 2 {
            return Err(SpecError::analysis("too few successful bootstrap fits"));
        }
        Ok((
            Interval::from_samples(&self.intercepts),
            Interval::from_samples(&self.fidelities),
        ))
    }
}
