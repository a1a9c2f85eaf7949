use crate::core::{ExperimentData, Survival};
use crate::utils::error::{Result, SpecError};
use serde::{Deserialize, Serialize};

/// 一個 qubit group 的 SPAM 誤差
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamEstimate {
    pub qubits: String,
    pub zero_error: f64,
    pub one_error: f64,
    pub avg_error: f64,
    pub avg_uncertainty: f64,
}

pub fn spam_analysis(data: &ExperimentData) -> Result<Vec<SpamEstimate>> {
    let Survival::Single(groups) = &data.survival else {
        return Err(SpecError::analysis(
            "SPAM data must map qubits -> prepared state -> count",
        ));
    };
    let shots = data.shots as f64;

    data.survival
        .qubit_groups()
        .into_iter()
        .map(|qubits| -> Result<SpamEstimate> {
            let counts = &groups[qubits];
            let probability = |state: &str| {
                counts.get(state).map(|&c| c as f64 / shots).ok_or_else(|| {
                    SpecError::analysis(format!(
                        "qubits {}: missing counts for state '{}'",
                        qubits, state
                    ))
                })
            };
            let p0 = probability("0")?;
            let p1 = probability("1")?;

            Ok(SpamEstimate {
                qubits: qubits.to_string(),
                zero_error: 1.0 - p0,
                one_error: 1.0 - p1,
                avg_error: 1.0 - (p0 + p1) / 2.0,
                avg_uncertainty: (p0 * (1.0 - p0) + p1 * (1.0 - p1)).sqrt() / 2.0 / shots.sqrt(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spam_errors() {
        let data: ExperimentData = serde_json::from_str(
            r#"{"shots": 1000, "survival": {"0": {"0": 999, "1": 995}, "1": {"0": 1000, "1": 990}}}"#,
        )
        .unwrap();
        let estimates = spam_analysis(&data).unwrap();
        assert_eq!(estimates.len(), 2);

        let first = &estimates[0];
        assert_eq!(first.qubits, "0");
        assert!((first.zero_error - 0.001).abs() < 1e-12);
        assert!((first.one_error - 0.005).abs() < 1e-12);
        assert!((first.avg_error - 0.003).abs() < 1e-12);
        let expected = (0.999f64 * 0.001 + 0.995 * 0.005).sqrt() / 2.0 / 1000f64.sqrt();
        assert!((first.avg_uncertainty - expected).abs() < 1e-15);

        assert_eq!(estimates[1].zero_error, 0.0);
    }

    #[test]
    fn test_missing_state() {
        let data: ExperimentData =
            serde_json::from_str(r#"{"shots": 10, "survival": {"0": {"0": 9}}}"#).unwrap();
        assert!(spam_analysis(&data).is_err());
    }
}
