//! Bright-state decay under repeated measurement or reset (crosstalk).

use crate::core::analysis::{AnalysisOptions, AnalysisResult, GroupEstimate};
use crate::core::fit::{curve_fit, FitOptions, Model};
use crate::core::stats::{sample_binomial, BootstrapFits, Interval};
use crate::core::{ExperimentData, Survival};
use crate::domain::model::Counts;
use crate::utils::error::{Result, SpecError};
use rand::Rng;

const INITIAL_GUESS: [f64; 2] = [1.0, 0.001];

/// 帶量測串擾的亮態布居數，參數 `[spam, gamma]`
pub struct BrightStatePopulation;

impl Model for BrightStatePopulation {
    fn value(&self, m: f64, p: &[f64; 2]) -> f64 {
        let [spam, gamma] = *p;
        (2.0 - spam + (-3.0 * gamma * m).exp() * (-2.0 + 4.0 * spam)) / 3.0
    }

    fn gradient(&self, m: f64, p: &[f64; 2]) -> [f64; 2] {
        let [spam, gamma] = *p;
        let e = (-3.0 * gamma * m).exp();
        [(-1.0 + 4.0 * e) / 3.0, -m * e * (-2.0 + 4.0 * spam)]
    }
}

pub fn bright_state_population(m: f64, spam: f64, gamma: f64) -> f64 {
    BrightStatePopulation.value(m, &[spam, gamma])
}

/// `[spam, gamma]` 轉成 `[截距, 平均保真度]`
pub fn convert_params(params: [f64; 2]) -> [f64; 2] {
    [params[0], 1.0 - 5.0 * params[1] / 6.0]
}

pub fn convert_metrics(metrics: [f64; 2]) -> [f64; 2] {
    [metrics[0], 6.0 * (1.0 - metrics[1]) / 5.0]
}

pub fn decay_fit(xs: &[f64], ys: &[f64], options: &FitOptions) -> Result<[f64; 2]> {
    let params = curve_fit(&BrightStatePopulation, xs, ys, INITIAL_GUESS, options)?;
    Ok(convert_params(params))
}

fn points(qubits: &str, counts: &Counts, shots: u64) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut pairs = counts
        .iter()
        .map(|(m, &count)| -> Result<(f64, f64)> {
            let m: f64 = m.trim().parse().map_err(|_| {
                SpecError::analysis(format!(
                    "qubits {}: measurement count '{}' is not a number",
                    qubits, m
                ))
            })?;
            Ok((m, count as f64 / shots as f64))
        })
        .collect::<Result<Vec<_>>>()?;
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(pairs.into_iter().unzip())
}

pub fn decay_analysis(data: &ExperimentData, options: &AnalysisOptions) -> Result<AnalysisResult> {
    let Survival::Single(groups) = &data.survival else {
        return Err(SpecError::analysis(
            "decay data must map qubits -> measurements -> count",
        ));
    };

    let mut rng = options.rng();
    let mut result = AnalysisResult::default();

    for qubits in data.survival.qubit_groups() {
        let (xs, ys) = points(qubits, &groups[qubits], data.shots)?;
        let [intercept, fidelity] = decay_fit(&xs, &ys, &options.fit)?;
        let (intercept_interval, fidelity_interval) =
            bootstrap(&xs, &ys, data.shots, options, &mut rng)?;

        tracing::debug!(
            "Decay {}: intercept={:.4e} fidelity={:.6}",
            qubits,
            intercept,
            fidelity
        );

        result.groups.push(GroupEstimate {
            qubits: qubits.to_string(),
            intercept,
            fidelity,
            intercept_interval,
            fidelity_interval,
        });
    }

    Ok(result)
}

/// 參數 bootstrap: 每個點獨立做 binomial 重抽
fn bootstrap<R: Rng>(
    xs: &[f64],
    ys: &[f64],
    shots: u64,
    options: &AnalysisOptions,
    rng: &mut R,
) -> Result<(Interval, Interval)> {
    let mut fits = BootstrapFits::with_capacity(options.resamples);

    for _ in 0..options.resamples {
        let resampled: Vec<f64> = ys
            .iter()
            .map(|&p| sample_binomial(&mut *rng, shots, p) as f64 / shots as f64)
            .collect();
        fits.record(decay_fit(xs, &resampled, &options.fit));
    }

    fits.finish()
}
