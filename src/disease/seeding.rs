//! Initial infections placed at the start of a run.
use log::info;
use rand::seq::index;

use crate::context::Context;
use crate::define_rng;
use crate::disease::phase::Phase;
use crate::disease::progression::ContextProgressionExt;
use crate::error::ContagionError;
use crate::people::{ContextPeopleExt, PersonId};
use crate::random::ContextRandomExt;
use crate::transmission::InfectionEvent;

define_rng!(SeedingRng);

/// Exposes `number` distinct Susceptible people aged `min_age..=max_age`, chosen uniformly at
/// random. Each is reported as an `InfectionEvent` with no location or infector. Returns them in
/// id order.
///
/// # Errors
/// Returns `ContagionError::ConfigError` if there are fewer than `number` candidates, and
/// propagates errors from `expose`.
pub fn seed_infections(
    context: &mut Context,
    number: usize,
    min_age: u8,
    max_age: u8,
) -> Result<Vec<PersonId>, ContagionError> {
    let candidates: Vec<PersonId> = context
        .query_people_in_phase(Phase::Susceptible)
        .into_iter()
        .filter(|person_id| (min_age..=max_age).contains(&context.get_person_age(*person_id)))
        .collect();
    if candidates.len() < number {
        return Err(ContagionError::ConfigError(format!(
            "cannot seed {number} infections: only {} susceptible people aged {min_age}-{max_age}",
            candidates.len()
        )));
    }

    let mut chosen: Vec<PersonId> = context
        .sample(SeedingRng, |rng| index::sample(rng, candidates.len(), number))
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    chosen.sort_unstable();

    let now = context.get_current_time();
    for &person_id in &chosen {
        context.emit_event(InfectionEvent {
            person_id,
            location_id: None,
            location_type: None,
            infected_by: None,
        });
        context.expose(person_id)?;
    }
    info!("seeded {number} infections at t={now}");
    Ok(chosen)
}
