//! Phases of illness, the coarse disease state each belongs to, and the per-run table counting
//! how many people currently occupy each phase.
use std::fmt::{self, Display};

use serde::Serialize;

use crate::context::Context;
use crate::define_data_plugin;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Susceptible,
    Exposed,
    InfectedAsymptomatic,
    InfectedSymptomatic,
    Hospitalized,
    Icu,
    Recovered,
    Dead,
}

/// The category a phase belongs to, used to decide who can infect and who can be infected.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum DiseaseState {
    Susceptible,
    Ill,
    Recovered,
    Dead,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Susceptible,
        Phase::Exposed,
        Phase::InfectedAsymptomatic,
        Phase::InfectedSymptomatic,
        Phase::Hospitalized,
        Phase::Icu,
        Phase::Recovered,
        Phase::Dead,
    ];

    #[must_use]
    pub fn disease_state(self) -> DiseaseState {
        match self {
            Phase::Susceptible => DiseaseState::Susceptible,
            Phase::Exposed
            | Phase::InfectedAsymptomatic
            | Phase::InfectedSymptomatic
            | Phase::Hospitalized
            | Phase::Icu => DiseaseState::Ill,
            Phase::Recovered => DiseaseState::Recovered,
            Phase::Dead => DiseaseState::Dead,
        }
    }

    /// No transition ever leaves an absorbing phase.
    #[must_use]
    pub fn is_absorbing(self) -> bool {
        matches!(self, Phase::Recovered | Phase::Dead)
    }

    #[must_use]
    pub fn is_ill(self) -> bool {
        self.disease_state() == DiseaseState::Ill
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Phase::Susceptible => "Susceptible",
            Phase::Exposed => "Exposed",
            Phase::InfectedAsymptomatic => "Infected-Asymptomatic",
            Phase::InfectedSymptomatic => "Infected-Symptomatic",
            Phase::Hospitalized => "Hospitalized",
            Phase::Icu => "ICU",
            Phase::Recovered => "Recovered",
            Phase::Dead => "Dead",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of people in each phase. Owned by the `Context`, so every run starts from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    counts: [usize; Phase::ALL.len()],
}

impl PhaseCounts {
    #[must_use]
    pub fn get(&self, phase: Phase) -> usize {
        self.counts[phase.index()]
    }

    /// Sum over all phases; always equal to the population size.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, usize)> + '_ {
        Phase::ALL.iter().map(|phase| (*phase, self.get(*phase)))
    }

    pub(crate) fn record_entry(&mut self, phase: Phase) {
        self.counts[phase.index()] += 1;
    }

    pub(crate) fn record_transition(&mut self, from: Phase, to: Phase) {
        let from_count = &mut self.counts[from.index()];
        *from_count = from_count.saturating_sub(1);
        self.counts[to.index()] += 1;
    }
}

define_data_plugin!(
    pub(crate) PhaseCountsPlugin,
    PhaseCounts,
    PhaseCounts::default()
);

pub trait ContextPhaseCountsExt {
    fn get_phase_count(&self, phase: Phase) -> usize;

    /// A snapshot of the whole table.
    fn get_phase_counts(&self) -> PhaseCounts;
}

impl ContextPhaseCountsExt for Context {
    fn get_phase_count(&self, phase: Phase) -> usize {
        self.get_data_container(PhaseCountsPlugin)
            .map_or(0, |counts| counts.get(phase))
    }

    fn get_phase_counts(&self) -> PhaseCounts {
        self.get_data_container(PhaseCountsPlugin)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disease_states() {
        assert_eq!(Phase::Susceptible.disease_state(), DiseaseState::Susceptible);
        for phase in [
            Phase::Exposed,
            Phase::InfectedAsymptomatic,
            Phase::InfectedSymptomatic,
            Phase::Hospitalized,
            Phase::Icu,
        ] {
            assert!(phase.is_ill(), "{phase} should be ill");
            assert!(!phase.is_absorbing());
        }
        assert!(Phase::Recovered.is_absorbing());
        assert!(Phase::Dead.is_absorbing());
        assert_eq!(Phase::Dead.disease_state(), DiseaseState::Dead);
    }

    #[test]
    fn display_names() {
        assert_eq!(Phase::Icu.to_string(), "ICU");
        assert_eq!(Phase::InfectedAsymptomatic.to_string(), "Infected-Asymptomatic");
    }

    #[test]
    fn counts_track_transitions() {
        let mut counts = PhaseCounts::default();
        counts.record_entry(Phase::Susceptible);
        counts.record_entry(Phase::Susceptible);
        counts.record_transition(Phase::Susceptible, Phase::Exposed);
        assert_eq!(counts.get(Phase::Susceptible), 1);
        assert_eq!(counts.get(Phase::Exposed), 1);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.iter().count(), 8);
    }

    #[test]
    fn context_counts_default_to_zero() {
        let context = Context::new();
        assert_eq!(context.get_phase_count(Phase::Dead), 0);
        assert_eq!(context.get_phase_counts().total(), 0);
    }
}
