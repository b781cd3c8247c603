//! Transmission driven by the average distance between the people present.
//!
//! The mean spacing `sqrt(area / n)`, floored by the social distancing parameter `psi`, is
//! passed through a sigmoid that is near one at zero distance, one half at 1.5 m and near zero
//! by 3 m. It is scaled by the calibration constant `alpha` and by `(1 - mu)^2` for masking.
//! Each ill person present adds `factor * duration * P(t)`, with `P` the logistic dose-response
//! of their viral load, and each susceptible person is exposed with probability `1 - exp(-sum)`.
//!
//! Unlike the area engine, this engine applies the exposures it draws.
use log::{error, trace};
use serde::Deserialize;

use crate::context::Context;
use crate::disease::conditional::HOURS_PER_DAY;
use crate::disease::Phase;
use crate::error::ContagionError;
use crate::people::ContextPeopleExt;
use crate::random::ContextRandomExt;
use crate::transmission::infectiousness::{InfectiousnessCurve, ViralLoadCurve};
use crate::transmission::location::LocationSnapshot;
use crate::transmission::{
    apply_exposure, InfectionRecord, TransmissionModel, TransmissionRng, SECONDS_PER_HOUR,
};

/// Distance model parameters as configured: viral load periods in days and the calculation
/// threshold in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DistanceParameters {
    /// Latent period before the viral load starts to rise.
    #[serde(rename = "L")]
    pub latent_period: f64,
    /// Time from exposure to peak viral load.
    #[serde(rename = "I")]
    pub incubation_period: f64,
    /// Time from peak viral load back to zero.
    #[serde(rename = "C")]
    pub contagious_period: f64,
    pub v_max: f64,
    pub v_0: f64,
    pub r: f64,
    pub psi: f64,
    pub alpha: f64,
    pub mu: f64,
    pub calculation_threshold: f64,
}

impl Default for DistanceParameters {
    fn default() -> Self {
        DistanceParameters {
            latent_period: 2.0,
            incubation_period: 3.4,
            contagious_period: 3.0,
            v_max: 7.23,
            v_0: 4.0,
            r: 2.294,
            psi: 3.0,
            alpha: 5.0,
            mu: 0.0,
            calculation_threshold: 60.0,
        }
    }
}

fn check(name: &str, value: f64, valid: bool) -> Result<f64, ContagionError> {
    if value.is_finite() && valid {
        Ok(value)
    } else {
        Err(ContagionError::ConfigError(format!(
            "invalid distance model parameter {name}: {value}"
        )))
    }
}

/// The distancing sigmoid `1 - 1 / (1 + exp(-3 (d - 1.5)))`.
#[must_use]
pub fn distance_attenuation(distance: f64) -> f64 {
    1.0 - 1.0 / (1.0 + (-3.0 * (distance - 1.5)).exp())
}

pub struct DistanceTransmission<C = ViralLoadCurve> {
    psi: f64,
    alpha: f64,
    mu: f64,
    /// Hours.
    calculation_threshold: f64,
    curve: C,
}

impl DistanceTransmission<ViralLoadCurve> {
    /// # Errors
    /// Returns `ContagionError::ConfigError` unless `0 <= L < I`, `C > 0`, `mu` is in `[0, 1]`
    /// and the remaining parameters are finite, with `psi`, `alpha`, `v_max` and the threshold
    /// non-negative.
    pub fn new(parameters: &DistanceParameters) -> Result<Self, ContagionError> {
        let p = parameters;
        let latent = check("L", p.latent_period, p.latent_period >= 0.0)?;
        let incubation = check("I", p.incubation_period, p.incubation_period > latent)?;
        let contagious = check("C", p.contagious_period, p.contagious_period > 0.0)?;
        let curve = ViralLoadCurve {
            latent: latent * HOURS_PER_DAY,
            incubation: incubation * HOURS_PER_DAY,
            contagious: contagious * HOURS_PER_DAY,
            v_max: check("v_max", p.v_max, p.v_max >= 0.0)?,
            r: check("r", p.r, true)?,
            v0: check("v_0", p.v_0, true)?,
        };
        Self::with_curve(parameters, curve)
    }
}

impl<C: InfectiousnessCurve> DistanceTransmission<C> {
    /// Uses `curve` in place of the configured viral load curve.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` for invalid `psi`, `alpha`, `mu` or threshold.
    pub fn with_curve(parameters: &DistanceParameters, curve: C) -> Result<Self, ContagionError> {
        let p = parameters;
        Ok(DistanceTransmission {
            psi: check("psi", p.psi, p.psi >= 0.0)?,
            alpha: check("alpha", p.alpha, p.alpha >= 0.0)?,
            mu: check("mu", p.mu, (0.0..=1.0).contains(&p.mu))?,
            calculation_threshold: check(
                "calculation_threshold",
                p.calculation_threshold,
                p.calculation_threshold >= 0.0,
            )? / SECONDS_PER_HOUR,
            curve,
        })
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    #[must_use]
    pub fn psi(&self) -> f64 {
        self.psi
    }

    #[must_use]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// The per-hour, per-unit-dose factor for `people` sharing `effective_area`.
    #[must_use]
    pub fn exposure_factor(&self, effective_area: f64, people: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let spacing = (effective_area / people as f64).sqrt();
        let distance = spacing.max(self.psi);
        distance_attenuation(distance) * self.alpha * (1.0 - self.mu) * (1.0 - self.mu)
    }
}

impl<C: InfectiousnessCurve> TransmissionModel for DistanceTransmission<C> {
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
        if snapshot.present.is_empty() {
            return record;
        }

        let factor = self.exposure_factor(snapshot.effective_area(), snapshot.present.len());
        if factor == 0.0 || factor.is_nan() {
            return record;
        }

        let now = context.get_current_time();
        let mut sum = 0.0;
        let mut max_viral_load = 0.0;
        for &person_id in snapshot.present {
            if !context.get_person_phase(person_id).is_ill() {
                continue;
            }
            let t = now - context.get_exposure_time(person_id);
            let viral_load = self.curve.viral_load(t);
            if viral_load > 0.0 {
                sum += factor * duration * self.curve.infectiousness(t);
                record.infectious.push(person_id);
                if viral_load > max_viral_load {
                    max_viral_load = viral_load;
                    record.most_infectious = Some(person_id);
                }
            }
        }
        if sum == 0.0 {
            return record;
        }

        let p_infection = 1.0 - (-sum).exp();
        for &person_id in snapshot.present {
            if context.get_person_phase(person_id) == Phase::Susceptible
                && context.sample_uniform(TransmissionRng) < p_infection
            {
                apply_exposure(context, person_id, snapshot, record.most_infectious);
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

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ContagionError> {
        let invalid = || ContagionError::InvalidParameterValue {
            name: name.to_string(),
            value,
        };
        match name {
            "psi" if value.is_finite() && value >= 0.0 => self.psi = value,
            "mu" if (0.0..=1.0).contains(&value) => self.mu = value,
            "psi" | "mu" => {
                error!("rejected {name} = {value} for the distance transmission model");
                return Err(invalid());
            }
            _ => {
                error!("the distance transmission model has no settable parameter {name}");
                return Err(ContagionError::UnknownParameter(name.to_string()));
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "distance"
    }

    fn applies_exposures(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use crate::disease::{
        ContextProgressionExt, PhaseChangeEvent, ProgressionModel, ProgressionParameters,
    };
    use crate::people::PersonId;
    use crate::transmission::location::{
        LocationId, LocationType, LocationTypeConfig, LocationTypeRegistry,
    };
    use crate::transmission::InfectionEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn room() -> LocationType {
        let registry = LocationTypeRegistry::from_configs(&[LocationTypeConfig {
            name: "room".to_string(),
            infect_in_sublocation: false,
            area_correction: 1.0,
        }])
        .unwrap();
        registry.resolve("room").unwrap().clone()
    }

    fn setup() -> Context {
        let mut context = Context::new();
        context.init_random(99);
        context.set_progression_model(
            ProgressionModel::from_parameters(&ProgressionParameters::default()).unwrap(),
        );
        context
    }

    /// Infectors exposed `elapsed` hours before now, followed by `susceptible` others.
    fn populate(
        context: &mut Context,
        elapsed: &[f64],
        susceptible: usize,
    ) -> Vec<PersonId> {
        let mut present = Vec::new();
        for hours in elapsed {
            let infector = context.add_person(30);
            context.expose(infector).unwrap();
            context.set_exposure_time(infector, -hours);
            present.push(infector);
        }
        present.extend((0..susceptible).map(|_| context.add_person(30)));
        present
    }

    #[test]
    fn sigmoid_shape() {
        assert_almost_eq!(distance_attenuation(1.5), 0.5, 1e-12);
        assert!(distance_attenuation(0.0) > 0.98);
        assert!(distance_attenuation(3.0) < 0.02);
    }

    #[test]
    fn spacing_is_floored_by_psi() {
        let parameters = DistanceParameters {
            psi: 1.0,
            ..DistanceParameters::default()
        };
        let model = DistanceTransmission::new(&parameters).unwrap();
        // sqrt(1 / 100) = 0.1, below psi.
        assert_almost_eq!(
            model.exposure_factor(1.0, 100),
            distance_attenuation(1.0) * 5.0,
            1e-12
        );
        // sqrt(16 / 1) = 4, above psi.
        assert_almost_eq!(
            model.exposure_factor(16.0, 1),
            distance_attenuation(4.0) * 5.0,
            1e-12
        );
    }

    #[test]
    fn perfect_masking_blocks_transmission() {
        let mut context = setup();
        let parameters = DistanceParameters {
            mu: 1.0,
            alpha: 1000.0,
            psi: 0.0,
            ..DistanceParameters::default()
        };
        let model = DistanceTransmission::new(&parameters).unwrap();
        assert_eq!(model.exposure_factor(1.0, 10), 0.0);

        let present = populate(&mut context, &[81.6], 50);
        let room = room();
        let snapshot = LocationSnapshot {
            location_id: LocationId(2),
            location_type: &room,
            total_area: 1.0,
            sub_locations: 1,
            present: &present,
        };
        let record = model.infect(&mut context, &snapshot, 10.0);
        assert!(record.calculated);
        assert!(record.newly_exposed.is_empty());
        assert!(context
            .query_people_in_phase(Phase::Exposed)
            .iter()
            .eq([present[0]].iter()));
    }

    // The distance engine itself writes the exposure time, reports the infection naming the
    // most infectious person and starts progression.
    #[test]
    fn engine_applies_exposures() {
        let mut context = setup();
        let parameters = DistanceParameters {
            alpha: 1000.0,
            psi: 0.0,
            ..DistanceParameters::default()
        };
        let model = DistanceTransmission::new(&parameters).unwrap();
        // The second infector is at peak viral load (I = 3.4 days).
        let present = populate(&mut context, &[60.0, 81.6], 10);
        let room = room();

        let infections = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&infections);
        context.subscribe_to_event(move |_, event: InfectionEvent| {
            recorder.borrow_mut().push(event);
        });
        let phase_changes = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&phase_changes);
        context.subscribe_to_event(move |_, event: PhaseChangeEvent| {
            if event.current == Phase::Exposed {
                *counter.borrow_mut() += 1;
            }
        });

        let snapshot = LocationSnapshot {
            location_id: LocationId(2),
            location_type: &room,
            total_area: 12.0,
            sub_locations: 1,
            present: &present,
        };
        let record = model.infect(&mut context, &snapshot, 2.0);
        assert_eq!(record.infectious, vec![present[0], present[1]]);
        assert_eq!(record.most_infectious, Some(present[1]));
        assert_eq!(record.newly_exposed, present[2..].to_vec());
        for person_id in &present[2..] {
            assert_eq!(context.get_person_phase(*person_id), Phase::Exposed);
            assert_eq!(context.get_exposure_time(*person_id), 0.0);
        }

        // Deliver the queued events without running the progression plans.
        context.add_plan(0.0, Context::shutdown);
        context.execute();
        let infections = infections.borrow();
        assert_eq!(infections.len(), 10);
        assert!(infections
            .iter()
            .all(|event| event.infected_by == Some(present[1])));
        // The infectors were exposed before anyone subscribed.
        assert_eq!(*phase_changes.borrow(), 10);
    }

    #[test]
    fn infectors_outside_viral_window_do_not_count() {
        let mut context = setup();
        let model = DistanceTransmission::new(&DistanceParameters {
            alpha: 1000.0,
            ..DistanceParameters::default()
        })
        .unwrap();
        // Before L = 2 days and after I + C = 6.4 days.
        let present = populate(&mut context, &[24.0, 200.0], 5);
        let room = room();
        let snapshot = LocationSnapshot {
            location_id: LocationId(2),
            location_type: &room,
            total_area: 10.0,
            sub_locations: 1,
            present: &present,
        };
        let record = model.infect(&mut context, &snapshot, 5.0);
        assert!(record.calculated);
        assert!(record.infectious.is_empty());
        assert!(record.newly_exposed.is_empty());
        assert_eq!(record.most_infectious, None);
    }

    #[test]
    fn short_contact_and_empty_location() {
        let mut context = setup();
        let model = DistanceTransmission::new(&DistanceParameters::default()).unwrap();
        let room = room();
        let snapshot = LocationSnapshot {
            location_id: LocationId(2),
            location_type: &room,
            total_area: 10.0,
            sub_locations: 1,
            present: &[],
        };
        assert!(!model.infect(&mut context, &snapshot, 0.01).calculated);
        let record = model.infect(&mut context, &snapshot, 1.0);
        assert!(record.calculated);
        assert!(record.infectious.is_empty());
    }

    #[test]
    fn set_parameter_accepts_psi_and_mu_only() {
        let mut model = DistanceTransmission::new(&DistanceParameters::default()).unwrap();
        model.set_parameter("psi", 1.5).unwrap();
        model.set_parameter("mu", 0.3).unwrap();
        assert_eq!(model.psi(), 1.5);
        assert_eq!(model.mu(), 0.3);

        assert!(matches!(
            model.set_parameter("alpha", 2.0),
            Err(ContagionError::UnknownParameter(_))
        ));
        assert!(matches!(
            model.set_parameter("mu", 1.5),
            Err(ContagionError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            model.set_parameter("psi", -1.0),
            Err(ContagionError::InvalidParameterValue { .. })
        ));
        assert_eq!(model.psi(), 1.5);
        assert_eq!(model.mu(), 0.3);
    }

    #[test]
    fn rejects_bad_parameters() {
        for parameters in [
            DistanceParameters {
                incubation_period: 1.0,
                ..DistanceParameters::default()
            },
            DistanceParameters {
                contagious_period: 0.0,
                ..DistanceParameters::default()
            },
            DistanceParameters {
                mu: 1.1,
                ..DistanceParameters::default()
            },
            DistanceParameters {
                psi: -0.5,
                ..DistanceParameters::default()
            },
        ] {
            assert!(DistanceTransmission::new(&parameters).is_err(), "{parameters:?}");
        }
    }

    #[test]
    fn deserializes_single_letter_names() {
        let parameters: DistanceParameters =
            serde_json::from_str(r#"{"L": 1.0, "I": 2.0, "C": 4.0, "mu": 0.2}"#).unwrap();
        assert_eq!(parameters.latent_period, 1.0);
        assert_eq!(parameters.incubation_period, 2.0);
        assert_eq!(parameters.contagious_period, 4.0);
        assert_eq!(parameters.mu, 0.2);
        assert_eq!(parameters.psi, 3.0);
    }
}
