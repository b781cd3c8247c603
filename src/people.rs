//! The population store: every person's age, location, phase and exposure time.
//!
//! People are created Susceptible. Phase writes go through `set_person_phase`, which keeps the
//! phase-count table in step with the population and is reserved to the disease engine.
use std::fmt::{self, Display};

use serde::Serialize;

use crate::context::Context;
use crate::define_data_plugin;
use crate::disease::phase::{PhaseCountsPlugin, Phase};
use crate::transmission::LocationId;

/// Identifies a person within one `Context`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PersonId(usize);

impl PersonId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The attributes conditional probabilities and durations are evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersonAttributes {
    pub age: u8,
}

#[derive(Debug)]
struct PersonRecord {
    age: u8,
    location: Option<LocationId>,
    phase: Phase,
    exposure_time: f64,
}

#[derive(Default)]
struct PeopleData {
    people: Vec<PersonRecord>,
}

define_data_plugin!(PeoplePlugin, PeopleData, PeopleData::default());

fn person(context: &Context, person_id: PersonId) -> &PersonRecord {
    context
        .get_data_container(PeoplePlugin)
        .and_then(|data| data.people.get(person_id.0))
        .unwrap_or_else(|| panic!("Person {person_id} does not exist"))
}

fn person_mut(context: &mut Context, person_id: PersonId) -> &mut PersonRecord {
    context
        .get_data_container_mut(PeoplePlugin)
        .people
        .get_mut(person_id.0)
        .unwrap_or_else(|| panic!("Person {person_id} does not exist"))
}

/// Moves a person into `phase`, updating the phase counts. Returns the previous phase.
pub(crate) fn set_person_phase(context: &mut Context, person_id: PersonId, phase: Phase) -> Phase {
    let previous = std::mem::replace(&mut person_mut(context, person_id).phase, phase);
    context
        .get_data_container_mut(PhaseCountsPlugin)
        .record_transition(previous, phase);
    previous
}

/// Accessors for the population. Every method taking a `PersonId` panics if the id was not
/// handed out by `add_person` on this `Context`.
pub trait ContextPeopleExt {
    /// Adds a Susceptible person with the given age.
    fn add_person(&mut self, age: u8) -> PersonId;

    fn get_current_population(&self) -> usize;

    fn get_person_age(&self, person_id: PersonId) -> u8;

    fn get_person_attributes(&self, person_id: PersonId) -> PersonAttributes;

    fn get_person_phase(&self, person_id: PersonId) -> Phase;

    /// The time the person last became Exposed, or `f64::NEG_INFINITY` if never.
    fn get_exposure_time(&self, person_id: PersonId) -> f64;

    fn set_exposure_time(&mut self, person_id: PersonId, time: f64);

    fn get_person_location(&self, person_id: PersonId) -> Option<LocationId>;

    fn set_person_location(&mut self, person_id: PersonId, location: Option<LocationId>);

    /// All people currently in `phase`, in id order.
    fn query_people_in_phase(&self, phase: Phase) -> Vec<PersonId>;
}

impl ContextPeopleExt for Context {
    fn add_person(&mut self, age: u8) -> PersonId {
        let people = &mut self.get_data_container_mut(PeoplePlugin).people;
        let person_id = PersonId(people.len());
        people.push(PersonRecord {
            age,
            location: None,
            phase: Phase::Susceptible,
            exposure_time: f64::NEG_INFINITY,
        });
        self.get_data_container_mut(PhaseCountsPlugin)
            .record_entry(Phase::Susceptible);
        person_id
    }

    fn get_current_population(&self) -> usize {
        self.get_data_container(PeoplePlugin)
            .map_or(0, |data| data.people.len())
    }

    fn get_person_age(&self, person_id: PersonId) -> u8 {
        person(self, person_id).age
    }

    fn get_person_attributes(&self, person_id: PersonId) -> PersonAttributes {
        PersonAttributes {
            age: person(self, person_id).age,
        }
    }

    fn get_person_phase(&self, person_id: PersonId) -> Phase {
        person(self, person_id).phase
    }

    fn get_exposure_time(&self, person_id: PersonId) -> f64 {
        person(self, person_id).exposure_time
    }

    fn set_exposure_time(&mut self, person_id: PersonId, time: f64) {
        person_mut(self, person_id).exposure_time = time;
    }

    fn get_person_location(&self, person_id: PersonId) -> Option<LocationId> {
        person(self, person_id).location
    }

    fn set_person_location(&mut self, person_id: PersonId, location: Option<LocationId>) {
        person_mut(self, person_id).location = location;
    }

    fn query_people_in_phase(&self, phase: Phase) -> Vec<PersonId> {
        self.get_data_container(PeoplePlugin)
            .map(|data| {
                data.people
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| record.phase == phase)
                    .map(|(index, _)| PersonId(index))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::disease::ContextPhaseCountsExt;

    #[test]
    fn empty_population() {
        let context = Context::new();
        assert_eq!(context.get_current_population(), 0);
        assert!(context.query_people_in_phase(Phase::Susceptible).is_empty());
    }

    #[test]
    fn add_person_starts_susceptible() {
        let mut context = Context::new();
        let person_id = context.add_person(42);
        assert_eq!(person_id.index(), 0);
        assert_eq!(context.get_current_population(), 1);
        assert_eq!(context.get_person_age(person_id), 42);
        assert_eq!(context.get_person_phase(person_id), Phase::Susceptible);
        assert_eq!(context.get_exposure_time(person_id), f64::NEG_INFINITY);
        assert_eq!(context.get_person_location(person_id), None);
        assert_eq!(context.get_phase_count(Phase::Susceptible), 1);
    }

    #[test]
    fn set_phase_moves_counts() {
        let mut context = Context::new();
        let first = context.add_person(10);
        let second = context.add_person(20);
        let previous = set_person_phase(&mut context, first, Phase::Exposed);
        assert_eq!(previous, Phase::Susceptible);
        assert_eq!(context.get_phase_count(Phase::Susceptible), 1);
        assert_eq!(context.get_phase_count(Phase::Exposed), 1);
        assert_eq!(context.query_people_in_phase(Phase::Exposed), vec![first]);
        assert_eq!(context.query_people_in_phase(Phase::Susceptible), vec![second]);
    }

    #[test]
    fn exposure_time_and_location_round_trip() {
        let mut context = Context::new();
        let person_id = context.add_person(30);
        context.set_exposure_time(person_id, 12.5);
        context.set_person_location(person_id, Some(LocationId(3)));
        assert_eq!(context.get_exposure_time(person_id), 12.5);
        assert_eq!(context.get_person_location(person_id), Some(LocationId(3)));
        assert_eq!(
            context.get_person_attributes(person_id),
            PersonAttributes { age: 30 }
        );
    }

    #[test]
    #[should_panic(expected = "Person 5 does not exist")]
    fn unknown_person_panics() {
        let mut context = Context::new();
        context.add_person(1);
        let _ = context.get_person_age(PersonId(5));
    }
}
