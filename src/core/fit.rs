//! Two-parameter nonlinear least squares (Levenberg–Marquardt).

use crate::utils::error::{Result, SpecError};

/// 兩個參數的模型，提供函數值與對參數的偏導數
pub trait Model {
    fn value(&self, x: f64, params: &[f64; 2]) -> f64;
    fn gradient(&self, x: f64, params: &[f64; 2]) -> [f64; 2];
}

/// `max_iterations` 設定值的上限
pub const MAX_ITERATIONS_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-10,
        }
    }
}

fn sum_of_squares<M: Model>(model: &M, xs: &[f64], ys: &[f64], params: &[f64; 2]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - model.value(x, params);
            r * r
        })
        .sum()
}

pub fn curve_fit<M: Model>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial: [f64; 2],
    options: &FitOptions,
) -> Result<[f64; 2]> {
    if xs.len() != ys.len() {
        return Err(SpecError::analysis(format!(
            "x has {} values but y has {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(SpecError::analysis(
            "at least two points are needed for a two-parameter fit",
        ));
    }

    let mut params = initial;
    let mut cost = sum_of_squares(model, xs, ys, &params);
    if !cost.is_finite() {
        return Err(SpecError::analysis("initial guess gives a non-finite residual"));
    }
    let mut lambda = 1e-3;

    for _ in 0..options.max_iterations {
        // J^T J 與 J^T r
        let mut jtj = [[0.0f64; 2]; 2];
        let mut jtr = [0.0f64; 2];
        for (&x, &y) in xs.iter().zip(ys) {
            let r = y - model.value(x, &params);
            let g = model.gradient(x, &params);
            for i in 0..2 {
                jtr[i] += g[i] * r;
                for j in 0..2 {
                    jtj[i][j] += g[i] * g[j];
                }
            }
        }

        let mut improved = false;
        while lambda < 1e16 {
            let a00 = jtj[0][0] + lambda * jtj[0][0].max(1e-12);
            let a11 = jtj[1][1] + lambda * jtj[1][1].max(1e-12);
            let a01 = jtj[0][1];
            let det = a00 * a11 - a01 * a01;
            if det == 0.0 || !det.is_finite() {
                return Err(SpecError::analysis("singular normal equations"));
            }

            let step = [
                (a11 * jtr[0] - a01 * jtr[1]) / det,
                (a00 * jtr[1] - a01 * jtr[0]) / det,
            ];
            let trial = [params[0] + step[0], params[1] + step[1]];
            let trial_cost = sum_of_squares(model, xs, ys, &trial);

            if trial_cost.is_finite() && trial_cost < cost {
                // 只有接近 Gauss-Newton 步長時才用殘差變化判斷收斂
                let converged =
                    lambda <= 1e-2 && (cost - trial_cost) <= options.tolerance * cost;
                params = trial;
                cost = trial_cost;
                lambda = (lambda / 10.0).max(1e-12);
                improved = true;
                if converged || cost == 0.0 {
                    return Ok(params);
                }
                break;
            }
            lambda *= 10.0;
        }

        if !improved {
            // 無法再降低殘差，已在極小值
            return Ok(params);
        }
    }

    Err(SpecError::analysis(format!(
        "no convergence after {} iterations",
        options.max_iterations
    )))
}
