//! The per-person disease state machine.
//!
//! A `ProgressionModel` is a table of branches per source phase. When a person enters a phase,
//! its branches are tried in order: every branch but the last carries a probability and consumes
//! one uniform draw, selected when `draw < probability`; the last branch is taken when no earlier
//! one was. The chosen branch's duration is then sampled and the move is scheduled on the
//! `Context`. Plans are never cancelled, so a scheduled move always fires.
use std::rc::Rc;

use log::{error, trace, warn};
use serde::Deserialize;

use crate::context::{Context, SimEvent};
use crate::define_data_plugin;
use crate::define_rng;
use crate::disease::conditional::{
    deserialize_spec_text, ConditionalDuration, ConditionalProbability, DurationFn, ProbabilityFn,
};
use crate::disease::phase::Phase;
use crate::error::ContagionError;
use crate::people::{set_person_phase, ContextPeopleExt, PersonAttributes, PersonId};
use crate::random::ContextRandomExt;

define_rng!(ProgressionRng);

/// Emitted on every phase change, including the initial move to Exposed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhaseChangeEvent {
    pub person_id: PersonId,
    pub previous: Phase,
    pub current: Phase,
}
impl SimEvent for PhaseChangeEvent {}

/// Emitted exactly once per person, when they enter `Phase::Dead`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PersonDiedEvent {
    pub person_id: PersonId,
}
impl SimEvent for PersonDiedEvent {}

/// One possible successor of a phase.
pub struct Branch {
    pub target: Phase,
    /// `None` only for the last branch of a phase.
    pub probability: Option<Box<dyn ProbabilityFn>>,
    pub duration: Box<dyn DurationFn>,
}

impl Branch {
    pub fn new(
        target: Phase,
        probability: impl ProbabilityFn + 'static,
        duration: impl DurationFn + 'static,
    ) -> Self {
        Branch {
            target,
            probability: Some(Box::new(probability)),
            duration: Box::new(duration),
        }
    }

    /// The branch taken when no earlier branch was selected.
    pub fn otherwise(target: Phase, duration: impl DurationFn + 'static) -> Self {
        Branch {
            target,
            probability: None,
            duration: Box::new(duration),
        }
    }
}

/// The textual configuration of the transition table. Probabilities and durations use the
/// formats described in `crate::disease::conditional`; durations are in days.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressionParameters {
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub fraction_asymptomatic: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub incubation_period_asymptomatic: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub incubation_period_symptomatic: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_asymptomatic_to_recovered: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub fraction_symptomatic_to_hospitalized: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_symptomatic_to_hospitalized: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_symptomatic_to_recovered: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub fraction_hospitalized_to_icu: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub fraction_hospitalized_to_dead: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_hospitalized_to_icu: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_hospitalized_to_dead: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_hospitalized_to_recovered: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub fraction_icu_to_dead: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_icu_to_dead: String,
    #[serde(deserialize_with = "deserialize_spec_text")]
    pub period_icu_to_recovered: String,
}

impl Default for ProgressionParameters {
    fn default() -> Self {
        ProgressionParameters {
            fraction_asymptomatic: "0.46".to_string(),
            incubation_period_asymptomatic: "Triangular(2.5, 3.4, 3.8)".to_string(),
            incubation_period_symptomatic: "Triangular(2.5, 3.4, 3.8)".to_string(),
            period_asymptomatic_to_recovered: "Triangular(7, 12, 14)".to_string(),
            fraction_symptomatic_to_hospitalized:
                "age{0-29: 0.02, 30-49: 0.1, 50-59: 0.3, 60-80: 0.6, 80-100: 0.2}".to_string(),
            period_symptomatic_to_hospitalized: "Triangular(5, 7.5, 10)".to_string(),
            period_symptomatic_to_recovered: "Triangular(5, 7.5, 10)".to_string(),
            fraction_hospitalized_to_icu:
                "age{0-29: 0.05, 30-49: 0.02, 50-59: 0.05, 60-80: 0.15, 80-100: 0.0}".to_string(),
            fraction_hospitalized_to_dead: "0.0".to_string(),
            period_hospitalized_to_icu: "Triangular(3, 8, 14)".to_string(),
            period_hospitalized_to_dead: "Triangular(3, 8, 14)".to_string(),
            period_hospitalized_to_recovered: "Triangular(3, 8, 14)".to_string(),
            fraction_icu_to_dead:
                "age{0-49: 0, 50-59: 0.015, 60-69: 0.08, 70-79: 0.4, 80-100: 0.6}".to_string(),
            period_icu_to_dead: "Triangular(1, 14, 30)".to_string(),
            period_icu_to_recovered: "Triangular(10, 14, 30)".to_string(),
        }
    }
}

fn probability(field: &str, text: &str) -> Result<ConditionalProbability, ContagionError> {
    text.parse().map_err(|e| {
        ContagionError::ConfigError(format!("progression parameter {field}: {e}"))
    })
}

fn duration(field: &str, text: &str) -> Result<ConditionalDuration, ContagionError> {
    text.parse().map_err(|e| {
        ContagionError::ConfigError(format!("progression parameter {field}: {e}"))
    })
}

/// The transition table: for each source phase, its branches in draw order.
#[derive(Default)]
pub struct ProgressionModel {
    branches: [Vec<Branch>; Phase::ALL.len()],
}

impl ProgressionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a branch to `from`. Branches are drawn in the order they are added.
    pub fn add_branch(&mut self, from: Phase, branch: Branch) -> &mut Self {
        self.branches[from as usize].push(branch);
        self
    }

    /// Builds and validates the standard table from textual parameters.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` naming the first specification that does not parse.
    pub fn from_parameters(parameters: &ProgressionParameters) -> Result<Self, ContagionError> {
        let p = parameters;
        let mut model = ProgressionModel::new();
        model
            .add_branch(
                Phase::Exposed,
                Branch::new(
                    Phase::InfectedAsymptomatic,
                    probability("fraction_asymptomatic", &p.fraction_asymptomatic)?,
                    duration(
                        "incubation_period_asymptomatic",
                        &p.incubation_period_asymptomatic,
                    )?,
                ),
            )
            .add_branch(
                Phase::Exposed,
                Branch::otherwise(
                    Phase::InfectedSymptomatic,
                    duration(
                        "incubation_period_symptomatic",
                        &p.incubation_period_symptomatic,
                    )?,
                ),
            )
            .add_branch(
                Phase::InfectedAsymptomatic,
                Branch::otherwise(
                    Phase::Recovered,
                    duration(
                        "period_asymptomatic_to_recovered",
                        &p.period_asymptomatic_to_recovered,
                    )?,
                ),
            )
            .add_branch(
                Phase::InfectedSymptomatic,
                Branch::new(
                    Phase::Hospitalized,
                    probability(
                        "fraction_symptomatic_to_hospitalized",
                        &p.fraction_symptomatic_to_hospitalized,
                    )?,
                    duration(
                        "period_symptomatic_to_hospitalized",
                        &p.period_symptomatic_to_hospitalized,
                    )?,
                ),
            )
            .add_branch(
                Phase::InfectedSymptomatic,
                Branch::otherwise(
                    Phase::Recovered,
                    duration(
                        "period_symptomatic_to_recovered",
                        &p.period_symptomatic_to_recovered,
                    )?,
                ),
            )
            .add_branch(
                Phase::Hospitalized,
                Branch::new(
                    Phase::Icu,
                    probability(
                        "fraction_hospitalized_to_icu",
                        &p.fraction_hospitalized_to_icu,
                    )?,
                    duration("period_hospitalized_to_icu", &p.period_hospitalized_to_icu)?,
                ),
            )
            .add_branch(
                Phase::Hospitalized,
                Branch::new(
                    Phase::Dead,
                    probability(
                        "fraction_hospitalized_to_dead",
                        &p.fraction_hospitalized_to_dead,
                    )?,
                    duration(
                        "period_hospitalized_to_dead",
                        &p.period_hospitalized_to_dead,
                    )?,
                ),
            )
            .add_branch(
                Phase::Hospitalized,
                Branch::otherwise(
                    Phase::Recovered,
                    duration(
                        "period_hospitalized_to_recovered",
                        &p.period_hospitalized_to_recovered,
                    )?,
                ),
            )
            .add_branch(
                Phase::Icu,
                Branch::new(
                    Phase::Dead,
                    probability("fraction_icu_to_dead", &p.fraction_icu_to_dead)?,
                    duration("period_icu_to_dead", &p.period_icu_to_dead)?,
                ),
            )
            .add_branch(
                Phase::Icu,
                Branch::otherwise(
                    Phase::Recovered,
                    duration("period_icu_to_recovered", &p.period_icu_to_recovered)?,
                ),
            );
        model.validate()?;
        Ok(model)
    }

    #[must_use]
    pub fn branches(&self, from: Phase) -> &[Branch] {
        &self.branches[from as usize]
    }

    #[must_use]
    pub fn has_branch(&self, from: Phase, to: Phase) -> bool {
        self.branches(from).iter().any(|branch| branch.target == to)
    }

    /// Checks that the table describes a terminating illness: every ill phase has branches
    /// ending in an unconditional one, no other phase has branches, nothing leads back to
    /// Susceptible or Exposed, and every path from Exposed ends in Recovered or Dead.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` describing the first violation found.
    pub fn validate(&self) -> Result<(), ContagionError> {
        for phase in Phase::ALL {
            let branches = self.branches(phase);
            if !phase.is_ill() {
                if !branches.is_empty() {
                    return Err(ContagionError::ConfigError(format!(
                        "{phase} cannot have outgoing transitions"
                    )));
                }
                continue;
            }
            let Some((last, rest)) = branches.split_last() else {
                return Err(ContagionError::ConfigError(format!(
                    "{phase} has no outgoing transitions"
                )));
            };
            if last.probability.is_some() || rest.iter().any(|b| b.probability.is_none()) {
                return Err(ContagionError::ConfigError(format!(
                    "only the last transition out of {phase} may be unconditional"
                )));
            }
            if let Some(branch) = branches
                .iter()
                .find(|b| matches!(b.target, Phase::Susceptible | Phase::Exposed))
            {
                return Err(ContagionError::ConfigError(format!(
                    "{phase} cannot move to {}",
                    branch.target
                )));
            }
        }
        // Every path must terminate, which also rules out cycles.
        self.paths_from(Phase::Exposed, &mut vec![]).map(|_| ())
    }

    /// Every phase sequence a person can follow from Exposed to an absorbing phase.
    ///
    /// # Errors
    /// Returns `ContagionError::ConfigError` if the table contains a cycle.
    pub fn terminal_paths(&self) -> Result<Vec<Vec<Phase>>, ContagionError> {
        self.paths_from(Phase::Exposed, &mut vec![])
    }

    fn paths_from(
        &self,
        phase: Phase,
        prefix: &mut Vec<Phase>,
    ) -> Result<Vec<Vec<Phase>>, ContagionError> {
        if prefix.contains(&phase) {
            return Err(ContagionError::ConfigError(format!(
                "transition cycle through {phase}"
            )));
        }
        prefix.push(phase);
        let mut paths = Vec::new();
        if phase.is_absorbing() {
            paths.push(prefix.clone());
        } else {
            for branch in self.branches(phase) {
                paths.extend(self.paths_from(branch.target, prefix)?);
            }
        }
        prefix.pop();
        Ok(paths)
    }

    /// Draws the branch a person in `from` takes next. `None` if the phase has no branches.
    fn select_branch(
        &self,
        context: &Context,
        from: Phase,
        attributes: &PersonAttributes,
    ) -> Option<&Branch> {
        let branches = self.branches(from);
        for branch in branches {
            match &branch.probability {
                Some(probability) => {
                    let draw = context.sample_uniform(ProgressionRng);
                    if draw < probability.probability(attributes) {
                        return Some(branch);
                    }
                }
                None => return Some(branch),
            }
        }
        branches.last()
    }
}

define_data_plugin!(
    ProgressionPlugin,
    Option<Rc<ProgressionModel>>,
    None
);

fn progression_model(context: &Context) -> Result<Rc<ProgressionModel>, ContagionError> {
    context
        .get_data_container(ProgressionPlugin)
        .and_then(Option::clone)
        .ok_or_else(|| ContagionError::ContagionError("no progression model is set".to_string()))
}

/// Moves the person, emits events, and schedules the next move if the new phase is not
/// absorbing.
fn enter_phase(
    context: &mut Context,
    model: &ProgressionModel,
    person_id: PersonId,
    phase: Phase,
) -> Result<(), ContagionError> {
    let previous = set_person_phase(context, person_id, phase);
    trace!(
        "t={:.3}: person {person_id} {previous} -> {phase}",
        context.get_current_time()
    );
    context.emit_event(PhaseChangeEvent {
        person_id,
        previous,
        current: phase,
    });
    if phase == Phase::Dead {
        context.emit_event(PersonDiedEvent { person_id });
    }
    if phase.is_absorbing() {
        return Ok(());
    }

    let attributes = context.get_person_attributes(person_id);
    let Some(branch) = model.select_branch(context, phase, &attributes) else {
        return Ok(());
    };
    let delay: f64 =
        context.sample_distr(ProgressionRng, branch.duration.distribution(&attributes));
    let target = branch.target;
    context.try_add_plan(context.get_current_time() + delay, move |context| {
        // Rejections are logged by `advance`.
        let _ = context.advance(person_id, target);
    })
}

pub trait ContextProgressionExt {
    /// Installs the transition table used by `expose` and `advance`.
    fn set_progression_model(&mut self, model: ProgressionModel);

    /// Moves a Susceptible person to Exposed, records the current time as their exposure time
    /// and schedules their next phase.
    ///
    /// # Errors
    /// Returns `ContagionError::InvalidTransition` (and changes nothing) if the person is not
    /// Susceptible, or an error if no model is set or the next move cannot be scheduled.
    fn expose(&mut self, person_id: PersonId) -> Result<(), ContagionError>;

    /// Moves a person to `target` and schedules their next phase. Called by scheduled plans.
    ///
    /// A target of Exposed is redirected to `expose`. A target that is not a successor of the
    /// person's current phase in the model is logged and rejected without any change.
    ///
    /// # Errors
    /// Returns `ContagionError::InvalidTransition` for a rejected move.
    fn advance(&mut self, person_id: PersonId, target: Phase) -> Result<(), ContagionError>;
}

impl ContextProgressionExt for Context {
    fn set_progression_model(&mut self, model: ProgressionModel) {
        *self.get_data_container_mut(ProgressionPlugin) = Some(Rc::new(model));
    }

    fn expose(&mut self, person_id: PersonId) -> Result<(), ContagionError> {
        let current = self.get_person_phase(person_id);
        if current != Phase::Susceptible {
            warn!("person {person_id} is {current} and cannot be exposed");
            return Err(ContagionError::InvalidTransition {
                person_id,
                from: current,
                to: Phase::Exposed,
            });
        }
        let model = progression_model(self)?;
        let now = self.get_current_time();
        self.set_exposure_time(person_id, now);
        enter_phase(self, &model, person_id, Phase::Exposed)
    }

    fn advance(&mut self, person_id: PersonId, target: Phase) -> Result<(), ContagionError> {
        if target == Phase::Exposed {
            warn!("advance called with Exposed for person {person_id}; using expose instead");
            return self.expose(person_id);
        }
        let current = self.get_person_phase(person_id);
        let model = progression_model(self)?;
        if !model.has_branch(current, target) {
            error!("ignoring transition of person {person_id} from {current} to {target}");
            return Err(ContagionError::InvalidTransition {
                person_id,
                from: current,
                to: target,
            });
        }
        enter_phase(self, &model, person_id, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::phase::ContextPhaseCountsExt;
    use crate::hashing::HashMap;
    use std::cell::RefCell;

    fn constant(text: &str) -> ConditionalProbability {
        text.parse().unwrap()
    }

    fn days(text: &str) -> ConditionalDuration {
        text.parse().unwrap()
    }

    fn setup(parameters: &ProgressionParameters, seed: u64) -> Context {
        let mut context = Context::new();
        context.init_random(seed);
        context.set_progression_model(ProgressionModel::from_parameters(parameters).unwrap());
        context
    }

    #[test]
    fn default_parameters_build() {
        let model = ProgressionModel::from_parameters(&ProgressionParameters::default()).unwrap();
        assert_eq!(model.branches(Phase::Hospitalized).len(), 3);
        assert!(model.has_branch(Phase::Icu, Phase::Dead));
        assert!(!model.has_branch(Phase::InfectedAsymptomatic, Phase::Hospitalized));
    }

    #[test]
    fn garbled_parameter_fails_fast() {
        let parameters = ProgressionParameters {
            fraction_icu_to_dead: "age{0-49 0.1}".to_string(),
            ..ProgressionParameters::default()
        };
        let error = ProgressionModel::from_parameters(&parameters)
            .err()
            .unwrap()
            .to_string();
        assert!(error.contains("fraction_icu_to_dead"), "{error}");
    }

    #[test]
    fn every_path_terminates() {
        let model = ProgressionModel::from_parameters(&ProgressionParameters::default()).unwrap();
        let paths = model.terminal_paths().unwrap();
        assert_eq!(paths.len(), 6);
        for path in &paths {
            assert_eq!(path[0], Phase::Exposed);
            assert!(path.last().unwrap().is_absorbing());
        }
        assert!(paths.contains(&vec![
            Phase::Exposed,
            Phase::InfectedSymptomatic,
            Phase::Hospitalized,
            Phase::Icu,
            Phase::Dead
        ]));
    }

    #[test]
    fn validation_rejects_cycles_and_dead_ends() {
        let mut model = ProgressionModel::new();
        model
            .add_branch(
                Phase::Exposed,
                Branch::otherwise(Phase::InfectedSymptomatic, days("1")),
            )
            .add_branch(
                Phase::InfectedSymptomatic,
                Branch::otherwise(Phase::Hospitalized, days("1")),
            )
            .add_branch(
                Phase::Hospitalized,
                Branch::otherwise(Phase::InfectedSymptomatic, days("1")),
            );
        assert!(model.validate().is_err());

        let mut model = ProgressionModel::new();
        model.add_branch(
            Phase::Exposed,
            Branch::new(Phase::InfectedSymptomatic, constant("0.5"), days("1")),
        );
        assert!(model.validate().is_err());

        let mut model = ProgressionModel::new();
        model.add_branch(Phase::Recovered, Branch::otherwise(Phase::Dead, days("1")));
        assert!(model.validate().is_err());
    }

    #[test]
    fn expose_then_run_to_absorbing_phase() {
        let mut context = setup(&ProgressionParameters::default(), 8675309);
        let people: Vec<PersonId> = (0..200).map(|i| context.add_person(i % 100)).collect();
        for person_id in &people {
            context.expose(*person_id).unwrap();
        }
        assert_eq!(context.get_phase_count(Phase::Exposed), 200);
        context.execute();

        let counts = context.get_phase_counts();
        assert_eq!(counts.total(), 200);
        assert_eq!(
            counts.get(Phase::Recovered) + counts.get(Phase::Dead),
            200
        );
        for person_id in people {
            assert!(context.get_person_phase(person_id).is_absorbing());
        }
    }

    #[test]
    fn expose_requires_susceptible() {
        let mut context = setup(&ProgressionParameters::default(), 1);
        let person_id = context.add_person(40);
        context.expose(person_id).unwrap();
        let result = context.expose(person_id);
        assert!(matches!(
            result,
            Err(ContagionError::InvalidTransition {
                from: Phase::Exposed,
                to: Phase::Exposed,
                ..
            })
        ));
        assert_eq!(context.get_phase_count(Phase::Exposed), 1);
        assert_eq!(context.get_phase_count(Phase::Susceptible), 0);
    }

    #[test]
    fn expose_without_model_fails() {
        let mut context = Context::new();
        context.init_random(1);
        let person_id = context.add_person(40);
        assert!(context.expose(person_id).is_err());
        assert_eq!(context.get_person_phase(person_id), Phase::Susceptible);
    }

    #[test]
    fn advance_rejects_illegal_targets() {
        let mut context = setup(&ProgressionParameters::default(), 2);
        let person_id = context.add_person(40);
        for target in [Phase::Susceptible, Phase::Recovered, Phase::Icu] {
            assert!(context.advance(person_id, target).is_err());
        }
        assert_eq!(context.get_person_phase(person_id), Phase::Susceptible);
        assert_eq!(context.get_phase_count(Phase::Susceptible), 1);
    }

    #[test]
    fn advance_to_exposed_redirects_to_expose() {
        let mut context = setup(&ProgressionParameters::default(), 3);
        let person_id = context.add_person(40);
        context.add_plan(10.0, move |context| {
            context.advance(person_id, Phase::Exposed).unwrap();
            assert_eq!(context.get_person_phase(person_id), Phase::Exposed);
            assert_eq!(context.get_phase_count(Phase::Exposed), 1);
            assert_eq!(context.get_exposure_time(person_id), 10.0);
        });
        context.execute();
        assert!(context.get_person_phase(person_id).is_absorbing());
        assert_eq!(context.get_exposure_time(person_id), 10.0);
    }

    #[test]
    fn absorbing_phases_reject_advance() {
        let parameters = ProgressionParameters {
            fraction_asymptomatic: "1".to_string(),
            ..ProgressionParameters::default()
        };
        let mut context = setup(&parameters, 4);
        let person_id = context.add_person(40);
        context.expose(person_id).unwrap();
        context.execute();
        assert_eq!(context.get_person_phase(person_id), Phase::Recovered);
        for target in Phase::ALL {
            if target != Phase::Exposed {
                assert!(context.advance(person_id, target).is_err());
            }
        }
        assert!(context.advance(person_id, Phase::Exposed).is_err());
        assert_eq!(context.get_person_phase(person_id), Phase::Recovered);
    }

    #[test]
    fn zero_hospitalization_always_recovers() {
        let parameters = ProgressionParameters {
            fraction_asymptomatic: "0".to_string(),
            fraction_symptomatic_to_hospitalized: "age{0-29: 0, 30-100: 1}".to_string(),
            ..ProgressionParameters::default()
        };
        let mut context = setup(&parameters, 5);
        let reached_hospital = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&reached_hospital);
        context.subscribe_to_event(move |_, event: PhaseChangeEvent| {
            if event.current == Phase::Hospitalized {
                *counter.borrow_mut() += 1;
            }
        });
        for _ in 0..1000 {
            let person_id = context.add_person(20);
            context.expose(person_id).unwrap();
        }
        context.execute();
        assert_eq!(*reached_hospital.borrow(), 0);
        assert_eq!(context.get_phase_count(Phase::Recovered), 1000);
    }

    #[test]
    fn death_is_reported_once() {
        let parameters = ProgressionParameters {
            fraction_asymptomatic: "0".to_string(),
            fraction_symptomatic_to_hospitalized: "1".to_string(),
            fraction_hospitalized_to_icu: "1".to_string(),
            fraction_icu_to_dead: "1".to_string(),
            ..ProgressionParameters::default()
        };
        let mut context = setup(&parameters, 6);
        let deaths: Rc<RefCell<HashMap<PersonId, (usize, f64)>>> = Rc::default();
        let recorder = Rc::clone(&deaths);
        context.subscribe_to_event(move |context, event: PersonDiedEvent| {
            let mut deaths = recorder.borrow_mut();
            let entry = deaths.entry(event.person_id).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 = context.get_current_time();
        });
        let person_id = context.add_person(85);
        context.expose(person_id).unwrap();
        // Nobody has died at scheduling time.
        assert!(deaths.borrow().is_empty());
        context.execute();

        let deaths = deaths.borrow();
        let (count, time) = deaths[&person_id];
        assert_eq!(count, 1);
        assert!(time > 0.0);
        assert_eq!(context.get_person_phase(person_id), Phase::Dead);
        assert_eq!(context.get_phase_count(Phase::Dead), 1);
    }

    #[test]
    fn branch_draw_uses_strict_comparison() {
        // A probability of zero can never be selected, even by a draw of exactly zero.
        let parameters = ProgressionParameters {
            fraction_asymptomatic: "0".to_string(),
            ..ProgressionParameters::default()
        };
        let mut context = setup(&parameters, 7);
        let phases = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&phases);
        context.subscribe_to_event(move |_, event: PhaseChangeEvent| {
            if event.previous == Phase::Exposed {
                recorder.borrow_mut().push(event.current);
            }
        });
        for _ in 0..500 {
            let person_id = context.add_person(50);
            context.expose(person_id).unwrap();
        }
        context.execute();
        assert_eq!(phases.borrow().len(), 500);
        assert!(phases
            .borrow()
            .iter()
            .all(|phase| *phase == Phase::InfectedSymptomatic));
    }
}
