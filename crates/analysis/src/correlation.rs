//! Pearson correlation with a two-sided Student t test.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use terrastat_core::{Table, Value};

use crate::error::AnalysisError;

pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Fewest complete pairs for which a coefficient is reported.
pub const MIN_OBSERVATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    Computed {
        coefficient: f64,
        p_value: f64,
        significant: bool,
        observations: usize,
    },
    InsufficientData {
        observations: usize,
    },
    ComputationError {
        cause: String,
    },
}

impl CorrelationOutcome {
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub column_a: String,
    pub column_b: String,
    pub significance_level: f64,
    #[serde(flatten)]
    pub outcome: CorrelationOutcome,
}

/// Test the linear association between two columns.
///
/// Rows missing either value, or holding a non-finite one, are dropped
/// pairwise. Data problems (too few
/// pairs, text, constant input) are reported in the outcome; only an absent
/// column or an invalid significance level is an error.
pub fn correlation_test(
    table: &Table,
    column_a: &str,
    column_b: &str,
    significance_level: f64,
) -> Result<CorrelationResult, AnalysisError> {
    if !(significance_level > 0.0 && significance_level < 1.0) {
        return Err(AnalysisError::InvalidSignificance(significance_level));
    }
    let a = table.column_index(column_a).ok_or_else(|| AnalysisError::MissingColumn {
        column: column_a.to_string(),
    })?;
    let b = table.column_index(column_b).ok_or_else(|| AnalysisError::MissingColumn {
        column: column_b.to_string(),
    })?;

    let outcome = match paired_values(table, (a, column_a), (b, column_b)) {
        Ok((xs, ys)) => pearson(&xs, &ys, significance_level),
        Err(cause) => CorrelationOutcome::ComputationError { cause },
    };

    match &outcome {
        CorrelationOutcome::Computed { coefficient, p_value, .. } => {
            log::info!("correlation {column_a} ~ {column_b}: r={coefficient:.4} p={p_value:.4}")
        }
        CorrelationOutcome::InsufficientData { observations } => {
            log::warn!("correlation {column_a} ~ {column_b}: only {observations} complete pair(s)")
        }
        CorrelationOutcome::ComputationError { cause } => {
            log::warn!("correlation {column_a} ~ {column_b}: {cause}")
        }
    }

    Ok(CorrelationResult {
        column_a: column_a.to_string(),
        column_b: column_b.to_string(),
        significance_level,
        outcome,
    })
}

fn paired_values(table: &Table, a: (usize, &str), b: (usize, &str)) -> Result<(Vec<f64>, Vec<f64>), String> {
    let numeric = |v: &Value, column: &str| {
        v.as_f64().ok_or_else(|| format!("non-numeric value '{v}' in column '{column}'"))
    };
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for row in table.rows() {
        let (x, y) = (&row[a.0], &row[b.0]);
        if x.is_missing() || y.is_missing() {
            continue;
        }
        let (x, y) = (numeric(x, a.1)?, numeric(y, b.1)?);
        if x.is_finite() && y.is_finite() {
            xs.push(x);
            ys.push(y);
        }
    }
    Ok((xs, ys))
}

/// Pearson r and its two-sided p-value with `n - 2` degrees of freedom.
pub fn pearson(xs: &[f64], ys: &[f64], significance_level: f64) -> CorrelationOutcome {
    let n = xs.len().min(ys.len());
    if n < MIN_OBSERVATIONS {
        return CorrelationOutcome::InsufficientData { observations: n };
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return CorrelationOutcome::ComputationError {
            cause: "constant input; correlation is undefined".into(),
        };
    }
    let r = (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0);
    if !r.is_finite() {
        return CorrelationOutcome::ComputationError {
            cause: "non-finite correlation coefficient".into(),
        };
    }

    let df = nf - 2.0;
    let one_minus_r2 = 1.0 - r * r;
    let p_value = if one_minus_r2 <= 0.0 {
        0.0
    } else {
        let t = r * (df / one_minus_r2).sqrt();
        let dist = match StudentsT::new(0.0, 1.0, df) {
            Ok(d) => d,
            Err(e) => return CorrelationOutcome::ComputationError { cause: e.to_string() },
        };
        (2.0 * dist.sf(t.abs())).min(1.0)
    };
    if !p_value.is_finite() {
        return CorrelationOutcome::ComputationError {
            cause: "non-finite p-value".into(),
        };
    }

    CorrelationOutcome::Computed {
        coefficient: r,
        p_value,
        significant: p_value < significance_level,
        observations: n,
    }
}
