//! Exponential-dose transmission driven by shared area.
//!
//! For a contact of `duration` hours, every ill person present contributes the ramp
//! infectiousness of their time since exposure, and each susceptible person present is exposed
//! with probability `1 - exp(-beta * contagiousness * duration * sum / (sigma_T * area))`.
use log::{error, trace};
use serde::Deserialize;

use crate::context::Context;
use crate::disease::conditional::HOURS_PER_DAY;
use crate::disease::Phase;
use crate::error::ContagionError;
use crate::people::ContextPeopleExt;
use crate::random::ContextRandomExt;
use crate::transmission::infectiousness::{InfectiousnessCurve, RampCurve};
use crate::transmission::location::LocationSnapshot;
use crate::transmission::{InfectionRecord, TransmissionModel, TransmissionRng, SECONDS_PER_HOUR};

/// Area model parameters as configured: the infectiousness ramp in days and the calculation
/// threshold in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AreaParameters {
    pub contagiousness: f64,
    pub beta: f64,
    pub t_e_min: f64,
    pub t_e_mode: f64,
    pub t_e_max: f64,
    pub calculation_threshold: f64,
}

impl Default for AreaParameters {
    fn default() -> Self {
        AreaParameters {
            contagiousness: 0.5,
            beta: 1.0,
            t_e_min: 3.0,
            t_e_mode: 7.0,
            t_e_max: 14.0,
            calculation_threshold: 60.0,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64, ContagionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ContagionError::ConfigError(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

pub struct AreaTransmission<C = RampCurve> {
    contagiousness: f64,
    beta: f64,
    /// Hours.
    calculation_threshold: f64,
    curve: C,
}

impl AreaTransmission<RampCurve> {
    /// # Errors
    /// Returns `ContagionError::ConfigError` for negative or non-finite values, or a ramp with
    /// `t_e_min <= t_e_mode <= t_e_max` and `t_e_min < t_e_max` violated.
    pub fn new(parameters: &AreaParameters) -> Result<Self, ContagionError> {
        let t_min = non_negative("t_e_min", parameters.t_e_min)?;
        let t_mode = non_negative("t_e_mode", parameters.t_e_mode)?;
        let t_max = non_negative("t_e_max", parameters.t_e_max)?;
        if !(t_min <= t_mode && t_mode <= t_max && t_min < t_max) {
            return Err(ContagionError::ConfigError(format!(
                "area model needs t_e_min <= t_e_mode <= t_e_max with t_e_min < t_e_max, got \
                 {t_min}, {t_mode}, {t_max}"
            )));
        }
        let curve = RampCurve {
            t_min: t_min * HOURS_PER_DAY,
            t_mode: t_mode * HOURS_PER_DAY,
            t_max: t_max * HOURS_PER_DAY,
        };
        Self::with_curve(parameters, curve)
    }
}

impl<C: InfectiousnessCurve> AreaTransmission<C> {
    /// Uses `curve` in place of the configured ramp.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` for negative or non-finite scalar parameters.
    pub fn with_curve(parameters: &AreaParameters, curve: C) -> Result<Self, ContagionError> {
        Ok(AreaTransmission {
            contagiousness: non_negative("contagiousness", parameters.contagiousness)?,
            beta: non_negative("beta", parameters.beta)?,
            calculation_threshold: non_negative(
                "calculation_threshold",
                parameters.calculation_threshold,
            )? / SECONDS_PER_HOUR,
            curve,
        })
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// The dose scaling `-beta * contagiousness * duration / (area_correction * area)`.
    #[must_use]
    pub fn exposure_factor(&self, area_correction: f64, effective_area: f64, duration: f64) -> f64 {
        -self.beta * self.contagiousness * duration / (area_correction * effective_area)
    }
}

/// `1 - exp(factor * sum)` for a (non-positive) exposure factor and summed infectiousness.
#[must_use]
pub fn infection_probability(factor: f64, infectiousness_sum: f64) -> f64 {
    1.0 - (factor * infectiousness_sum).exp()
}

impl<C: InfectiousnessCurve> TransmissionModel for AreaTransmission<C> {
    #[allow(clippy::float_cmp)]
    fn infect(
        &self,
        context: &mut Context,
        snapshot: &LocationSnapshot,
        duration: f64,
    ) -> InfectionRecord {
        let mut record = InfectionRecord::default();
        if duration < self.calculation_threshold {
            return record;
        }
        record.calculated = true;

        let now = context.get_current_time();
        let mut sum = 0.0;
        let mut most_infectious = 0.0;
        for &person_id in snapshot.present {
            if context.get_person_phase(person_id).is_ill() {
                let contribution = self
                    .curve
                    .infectiousness(now - context.get_exposure_time(person_id));
                sum += contribution;
                if contribution > most_infectious {
                    most_infectious = contribution;
                    record.most_infectious = Some(person_id);
                }
                record.infectious.push(person_id);
            }
        }
        if sum == 0.0 {
            return record;
        }

        // A room with no area gives an infinite dose, so everyone present is exposed.
        let factor = self.exposure_factor(
            snapshot.location_type.area_correction,
            snapshot.effective_area(),
            duration,
        );
        if factor == 0.0 || factor.is_nan() {
            return record;
        }

        let p_infection = infection_probability(factor, sum);
        for &person_id in snapshot.present {
            if context.get_person_phase(person_id) == Phase::Susceptible
                && context.sample_uniform(TransmissionRng) < p_infection
            {
                record.newly_exposed.push(person_id);
            }
        }
        trace!(
            "t={now:.3}: location {} p={p_infection:.5}, {} of {} present exposed",
            snapshot.location_id.0,
            record.newly_exposed.len(),
            snapshot.present.len()
        );
        record
    }

    fn set_parameter(&mut self, name: &str, _value: f64) -> Result<(), ContagionError> {
        error!("the area transmission model has no settable parameter {name}");
        Err(ContagionError::UnknownParameter(name.to_string()))
    }

    fn name(&self) -> &'static str {
        "area"
    }

    fn applies_exposures(&self) -> bool {
        false
    }
}
