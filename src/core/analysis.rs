use crate::core::fit::FitOptions;
use crate::core::stats::Interval;
use crate::domain::ports::ConfigProvider;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RESAMPLES: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub resamples: usize,
    pub seed: Option<u64>,
    pub fit: FitOptions,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            resamples: DEFAULT_RESAMPLES,
            seed: None,
            fit: FitOptions::default(),
        }
    }
}

impl AnalysisOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        let mut fit = FitOptions::default();
        if let Some(max_iterations) = config.max_iterations() {
            fit.max_iterations = max_iterations;
        }
        Self {
            resamples: config.resamples(),
            seed: config.seed(),
            fit,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_resamples(mut self, resamples: usize) -> Self {
        self.resamples = resamples;
        self
    }

    /// 有 seed 時結果可重現
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// 單一 qubit group 的擬合結果與 bootstrap 區間
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEstimate {
    pub qubits: String,
    /// 截距 (SPAM 參數)
    pub intercept: f64,
    /// 平均保真度
    pub fidelity: f64,
    pub intercept_interval: Interval,
    pub fidelity_interval: Interval,
}

impl GroupEstimate {
    pub fn infidelity(&self) -> f64 {
        1.0 - self.fidelity
    }
}

/// 一次實驗所有 group 的結果，依 qubit 編號排序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub groups: Vec<GroupEstimate>,
}

impl AnalysisResult {
    pub fn get(&self, qubits: &str) -> Option<&GroupEstimate> {
        self.groups.iter().find(|g| g.qubits == qubits)
    }
}
