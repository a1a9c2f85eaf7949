//! Randomized benchmarking: survival decays as `A * r^m + 1/2^n`.

use crate::core::analysis::{AnalysisOptions, AnalysisResult, GroupEstimate};
use crate::core::fit::{curve_fit, FitOptions, Model};
use crate::core::stats::{mean, sample_binomial, BootstrapFits, Interval};
use crate::core::{ExperimentData, Survival};
use crate::domain::model::{qubit_count, Counts};
use crate::utils::error::{Result, SpecError};
use rand::Rng;
use std::collections::BTreeMap;

pub struct RbModel {
    asymptote: f64,
}

impl RbModel {
    pub fn new(nqubits: u32) -> Self {
        Self {
            asymptote: asymptote(nqubits),
        }
    }
}

impl Model for RbModel {
    fn value(&self, m: f64, p: &[f64; 2]) -> f64 {
        p[0] * p[1].powf(m) + self.asymptote
    }

    fn gradient(&self, m: f64, p: &[f64; 2]) -> [f64; 2] {
        [p[1].powf(m), p[0] * m * p[1].powf(m - 1.0)]
    }
}

fn asymptote(nqubits: u32) -> f64 {
    1.0 / 2f64.powi(nqubits as i32)
}

/// 兩 qubit 的 Clifford 平均含 1.5 個兩 qubit 閘
fn gates_per_clifford(nqubits: u32) -> f64 {
    if nqubits == 2 {
        1.5
    } else {
        1.0
    }
}

/// 擬合參數 `[A, r]` 轉成 `[截距, 平均保真度]`
pub fn convert_params(params: [f64; 2], nqubits: u32) -> [f64; 2] {
    let dim = 2f64.powi(nqubits as i32);
    let k = gates_per_clifford(nqubits);
    [
        params[0] + 1.0 / dim,
        ((dim - 1.0) * params[1].powf(1.0 / k) + 1.0) / dim,
    ]
}

/// [`convert_params`] 的反函數
pub fn convert_metrics(metrics: [f64; 2], nqubits: u32) -> [f64; 2] {
    let dim = 2f64.powi(nqubits as i32);
    let k = gates_per_clifford(nqubits);
    [
        metrics[0] - 1.0 / dim,
        ((dim * metrics[1] - 1.0) / (dim - 1.0)).powf(k),
    ]
}

pub fn exponential_fit(
    seq_lengths: &[f64],
    survival_means: &[f64],
    nqubits: u32,
    initial_guess: Option<[f64; 2]>,
    options: &FitOptions,
) -> Result<[f64; 2]> {
    let initial = initial_guess.unwrap_or([1.0 - asymptote(nqubits), 0.99]);
    let params = curve_fit(
        &RbModel::new(nqubits),
        seq_lengths,
        survival_means,
        initial,
        options,
    )?;
    Ok(convert_params(params, nqubits))
}

/// 每個序列長度的各次重複的存活機率
struct LengthSamples {
    length: f64,
    probabilities: Vec<f64>,
}

fn length_samples(
    qubits: &str,
    by_length: &BTreeMap<String, Counts>,
    shots: u64,
) -> Result<Vec<LengthSamples>> {
    let mut samples = by_length
        .iter()
        .map(|(length, reps)| -> Result<LengthSamples> {
            let length: f64 = length.trim().parse().map_err(|_| {
                SpecError::analysis(format!(
                    "qubits {}: sequence length '{}' is not a number",
                    qubits, length
                ))
            })?;
            if reps.is_empty() {
                return Err(SpecError::analysis(format!(
                    "qubits {}: no repetitions for length {}",
                    qubits, length
                )));
            }
            Ok(LengthSamples {
                length,
                probabilities: reps.values().map(|&c| c as f64 / shots as f64).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    samples.sort_by(|a, b| a.length.total_cmp(&b.length));
    Ok(samples)
}

pub fn rb_analysis(data: &ExperimentData, options: &AnalysisOptions) -> Result<AnalysisResult> {
    analyze_survival(&data.survival, data.shots, options)
}

/// 使用 leakage 後選擇的計數，若資料沒有這個區塊回傳 None
pub fn rb_leakage_analysis(
    data: &ExperimentData,
    options: &AnalysisOptions,
) -> Result<Option<AnalysisResult>> {
    data.leakage_postselect
        .as_ref()
        .map(|survival| analyze_survival(survival, data.shots, options))
        .transpose()
}

fn analyze_survival(
    survival: &Survival,
    shots: u64,
    options: &AnalysisOptions,
) -> Result<AnalysisResult> {
    let Survival::Repeated(groups) = survival else {
        return Err(SpecError::analysis(
            "RB data must map qubits -> length -> repetition -> count",
        ));
    };

    let mut rng = options.rng();
    let mut result = AnalysisResult::default();

    for qubits in survival.qubit_groups() {
        let nqubits = qubit_count(qubits);
        let samples = length_samples(qubits, &groups[qubits], shots)?;

        let xs: Vec<f64> = samples.iter().map(|s| s.length).collect();
        let ys: Vec<f64> = samples.iter().map(|s| mean(&s.probabilities)).collect();
        let [intercept, fidelity] = exponential_fit(&xs, &ys, nqubits, None, &options.fit)?;

        let (intercept_interval, fidelity_interval) =
            bootstrap(&samples, shots, nqubits, options, &mut rng)?;

        tracing::debug!(
            "RB {}: intercept={:.4e} fidelity={:.6}",
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

/// 半參數 bootstrap: 先重抽重複次序，再對每個機率做 binomial 重抽
fn bootstrap<R: Rng>(
    samples: &[LengthSamples],
    shots: u64,
    nqubits: u32,
    options: &AnalysisOptions,
    rng: &mut R,
) -> Result<(Interval, Interval)> {
    let xs: Vec<f64> = samples.iter().map(|s| s.length).collect();
    let mut fits = BootstrapFits::with_capacity(options.resamples);

    for _ in 0..options.resamples {
        let ys: Vec<f64> = samples
            .iter()
            .map(|s| {
                let reps = s.probabilities.len();
                let draws: Vec<f64> = (0..reps)
                    .map(|_| {
                        let p = s.probabilities[rng.gen_range(0..reps)];
                        sample_binomial(&mut *rng, shots, p) as f64 / shots as f64
                    })
                    .collect();
                mean(&draws)
            })
            .collect();

        fits.record(exponential_fit(&xs, &ys, nqubits, None, &options.fit));
    }

    fits.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(nqubits: u32, a: f64, r: f64, shots: u64) -> ExperimentData {
        let key = if nqubits == 2 { "0, 1" } else { "0" };
        let mut by_length = BTreeMap::new();
        for m in [2u32, 4, 8, 16, 32, 64] {
            let p = a * r.powi(m as i32) + asymptote(nqubits);
            let count = (p * shots as f64).round() as u64;
            let reps: Counts = (0..5).map(|i| (i.to_string(), count)).collect();
            by_length.insert(m.to_string(), reps);
        }
        ExperimentData {
            shots,
            survival: Survival::Repeated([(key.to_string(), by_length)].into_iter().collect()),
            leakage_postselect: None,
            sequence_info: None,
        }
    }

    #[test]
    fn test_conversion_round_trip() {
        for nqubits in [1, 2] {
            let params = [0.45, 0.98];
            let back = convert_metrics(convert_params(params, nqubits), nqubits);
            assert!((back[0] - params[0]).abs() < 1e-12);
            assert!((back[1] - params[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_exponential_fit_recovers_parameters() {
        let xs: Vec<f64> = [1.0, 5.0, 10.0, 20.0, 50.0].to_vec();
        let ys: Vec<f64> = xs.iter().map(|m| 0.48 * 0.995f64.powf(*m) + 0.5).collect();
        let metrics = exponential_fit(&xs, &ys, 1, None, &FitOptions::default()).unwrap();
        let expected = convert_params([0.48, 0.995], 1);
        assert!((metrics[0] - expected[0]).abs() < 1e-6);
        assert!((metrics[1] - expected[1]).abs() < 1e-8);
    }

    #[test]
    fn test_rb_analysis_two_qubit() {
        let data = synthetic(2, 0.73, 0.99, 10_000);
        let options = AnalysisOptions::default().with_seed(11).with_resamples(20);
        let result = rb_analysis(&data, &options).unwrap();
        let group = result.get("0, 1").unwrap();

        let expected = convert_params([0.73, 0.99], 2);
        assert!((group.fidelity - expected[1]).abs() < 1e-3);
        assert!((group.intercept - expected[0]).abs() < 1e-2);
        assert!(group.fidelity_interval.lower <= group.fidelity_interval.upper);
    }

    #[test]
    fn test_bootstrap_is_reproducible_with_seed() {
        let data = synthetic(1, 0.48, 0.99, 200);
        let options = AnalysisOptions::default().with_seed(3).with_resamples(10);
        let first = rb_analysis(&data, &options).unwrap();
        let second = rb_analysis(&data, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_single_shape() {
        let data: ExperimentData =
            serde_json::from_str(r#"{"shots": 10, "survival": {"0": {"1": 9, "2": 8}}}"#).unwrap();
        assert!(rb_analysis(&data, &AnalysisOptions::default()).is_err());
        assert!(rb_leakage_analysis(&data, &AnalysisOptions::default())
            .unwrap()
            .is_none());
    }
}
