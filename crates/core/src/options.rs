use crate::math::RealNumber;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which PDHG variant the driver loop runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Method {
    /// Restarted averaged PDHG: maintains a step-size-weighted average iterate.
    RaPdhg,
    /// Halpern-anchored PDHG: convex-combines with the restart anchor instead.
    R2hPdhg,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OptimalityNorm {
    L2,
    LInf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RestartScheme {
    NoRestarts,
    FixedFrequency,
    AdaptiveKkt,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RestartToCurrentMetric {
    KktGreedy,
    NoSetAverage,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },
    #[error("{field} must lie in (0, 1], got {value}")]
    NotInUnitInterval { field: &'static str, value: String },
    #[error("sufficient_reduction_for_restart ({sufficient}) must be <= necessary_reduction_for_restart ({necessary})")]
    ReductionThresholdOrder { sufficient: String, necessary: String },
    #[error("pock_chambolle_alpha must lie in [0, 2], got {0}")]
    PockChambolleAlphaOutOfRange(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOptions<T: RealNumber> {
    pub method: Method,
    pub optimality_norm: OptimalityNorm,

    // Tolerances.
    pub eps_abs: T,
    pub eps_rel: T,
    pub eps_primal_infeasible: T,
    pub eps_dual_infeasible: T,

    // Limits.
    pub iteration_limit: usize,
    pub kkt_matrix_pass_limit: usize,
    pub time_sec_limit: T,

    // Cadence.
    pub termination_evaluation_frequency: usize,
    pub display_frequency: usize,

    // Preconditioning.
    pub l_inf_ruiz_iterations: usize,
    pub l2_norm_rescaling: bool,
    pub pock_chambolle_alpha: Option<T>,

    // Step-size.
    pub adaptive_step_size: bool,
    pub adaptive_step_size_reduction_exponent: T,
    pub adaptive_step_size_growth_exponent: T,
    pub adaptive_step_size_limit_coef: T,

    // Restart.
    pub restart_scheme: RestartScheme,
    pub restart_to_current_metric: RestartToCurrentMetric,
    pub restart_frequency_if_fixed: usize,
    pub artificial_restart_threshold: T,
    pub sufficient_reduction_for_restart: T,
    pub necessary_reduction_for_restart: T,

    // Weighting.
    pub primal_importance: T,
    pub scale_invariant_initial_primal_weight: bool,
    pub primal_weight_update_smoothing: T,
}

impl<T> SolveOptions<T>
where
    T: RealNumber,
{
    pub fn eps_ratio(&self) -> T {
        self.eps_abs / self.eps_rel
    }

    pub fn with_tolerance(eps_abs: T, eps_rel: T) -> Self {
        Self {
            eps_abs,
            eps_rel,
            ..Self::default()
        }
    }

    /// Mirrors the assertions the reference driver makes before starting to
    /// iterate: malformed configuration is a construction-time error, not a
    /// numerical one discovered mid-solve.
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = |field: &'static str, value: T| -> ConfigResult<()> {
            if value <= T::zero() {
                return Err(ConfigError::NotPositive {
                    field,
                    value: format!("{:?}", value.to_f64()),
                });
            }
            Ok(())
        };
        positive("eps_abs", self.eps_abs)?;
        positive("eps_rel", self.eps_rel)?;
        positive("eps_primal_infeasible", self.eps_primal_infeasible)?;
        positive("eps_dual_infeasible", self.eps_dual_infeasible)?;
        positive("time_sec_limit", self.time_sec_limit)?;
        positive(
            "adaptive_step_size_limit_coef",
            self.adaptive_step_size_limit_coef,
        )?;
        positive("primal_importance", self.primal_importance)?;

        let in_unit_interval = |field: &'static str, value: T| -> ConfigResult<()> {
            if value <= T::zero() || value > T::one() {
                return Err(ConfigError::NotInUnitInterval {
                    field,
                    value: format!("{:?}", value.to_f64()),
                });
            }
            Ok(())
        };
        in_unit_interval("artificial_restart_threshold", self.artificial_restart_threshold)?;
        in_unit_interval(
            "sufficient_reduction_for_restart",
            self.sufficient_reduction_for_restart,
        )?;
        in_unit_interval(
            "necessary_reduction_for_restart",
            self.necessary_reduction_for_restart,
        )?;
        if self.primal_weight_update_smoothing < T::zero()
            || self.primal_weight_update_smoothing > T::one()
        {
            return Err(ConfigError::NotInUnitInterval {
                field: "primal_weight_update_smoothing",
                value: format!("{:?}", self.primal_weight_update_smoothing.to_f64()),
            });
        }
        if self.sufficient_reduction_for_restart > self.necessary_reduction_for_restart {
            return Err(ConfigError::ReductionThresholdOrder {
                sufficient: format!("{:?}", self.sufficient_reduction_for_restart.to_f64()),
                necessary: format!("{:?}", self.necessary_reduction_for_restart.to_f64()),
            });
        }
        if let Some(alpha) = self.pock_chambolle_alpha {
            if alpha < T::zero() || alpha > T::from_f64(2.0).unwrap() {
                return Err(ConfigError::PockChambolleAlphaOutOfRange(format!(
                    "{:?}",
                    alpha.to_f64()
                )));
            }
        }
        if self.termination_evaluation_frequency == 0 {
            return Err(ConfigError::NotPositive {
                field: "termination_evaluation_frequency",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

impl<T> Default for SolveOptions<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self {
            method: Method::RaPdhg,
            optimality_norm: OptimalityNorm::L2,
            eps_abs: T::from_f64(1e-6).unwrap(),
            eps_rel: T::from_f64(1e-6).unwrap(),
            eps_primal_infeasible: T::from_f64(1e-8).unwrap(),
            eps_dual_infeasible: T::from_f64(1e-8).unwrap(),
            iteration_limit: 100_000,
            kkt_matrix_pass_limit: usize::MAX,
            time_sec_limit: T::from_f64(3600.0).unwrap(),
            termination_evaluation_frequency: 64,
            display_frequency: 1,
            l_inf_ruiz_iterations: 10,
            l2_norm_rescaling: false,
            pock_chambolle_alpha: Some(T::one()),
            adaptive_step_size: true,
            adaptive_step_size_reduction_exponent: T::from_f64(0.3).unwrap(),
            adaptive_step_size_growth_exponent: T::from_f64(0.6).unwrap(),
            adaptive_step_size_limit_coef: T::from_f64(0.5).unwrap(),
            restart_scheme: RestartScheme::AdaptiveKkt,
            restart_to_current_metric: RestartToCurrentMetric::KktGreedy,
            restart_frequency_if_fixed: 40,
            artificial_restart_threshold: T::from_f64(0.5).unwrap(),
            sufficient_reduction_for_restart: T::from_f64(0.1).unwrap(),
            necessary_reduction_for_restart: T::from_f64(0.9).unwrap(),
            primal_importance: T::one(),
            scale_invariant_initial_primal_weight: true,
            primal_weight_update_smoothing: T::from_f64(0.5).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;

    #[test]
    fn default_options_are_valid() {
        let options: SolveOptions<Scalar> = SolveOptions::default();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_reduction_thresholds() {
        let mut options: SolveOptions<Scalar> = SolveOptions::default();
        options.sufficient_reduction_for_restart = 0.95;
        options.necessary_reduction_for_restart = 0.9;
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let mut options: SolveOptions<Scalar> = SolveOptions::default();
        options.eps_abs = 0.0;
        assert!(options.validate().is_err());
    }
}
