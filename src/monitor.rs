//! Observes infections, deaths and phase changes: keeps running tallies and, optionally, writes
//! them to CSV reports.
use std::path::Path;

use log::{error, info};
use serde::Serialize;

use crate::context::{Context, ExecutionPhase};
use crate::create_report_trait;
use crate::define_data_plugin;
use crate::disease::{ContextPhaseCountsExt, PersonDiedEvent, Phase, PhaseChangeEvent};
use crate::error::ContagionError;
use crate::hashing::HashMap;
use crate::people::{ContextPeopleExt, PersonId};
use crate::report::ContextReportExt;
use crate::transmission::{ContextTransmissionExt, InfectionEvent, LocationId, LocationTypeId};

#[derive(Default)]
struct MonitorData {
    initialized: bool,
    infections: usize,
    infections_by_location_type: HashMap<LocationTypeId, usize>,
    infections_by_infector: HashMap<PersonId, usize>,
    phase_entries: HashMap<Phase, usize>,
    deaths: usize,
}

define_data_plugin!(MonitorPlugin, MonitorData, MonitorData::default());

#[derive(Serialize)]
struct InfectionReportItem {
    time: f64,
    person_id: PersonId,
    location_id: Option<LocationId>,
    location_type: String,
    infected_by: Option<PersonId>,
}
create_report_trait!(InfectionReportItem);

#[derive(Serialize)]
struct DeathReportItem {
    time: f64,
    person_id: PersonId,
    age: u8,
}
create_report_trait!(DeathReportItem);

#[derive(Serialize)]
struct PhaseCountsReportItem {
    time: f64,
    #[serde(rename = "Susceptible")]
    susceptible: usize,
    #[serde(rename = "Exposed")]
    exposed: usize,
    #[serde(rename = "Infected-Asymptomatic")]
    infected_asymptomatic: usize,
    #[serde(rename = "Infected-Symptomatic")]
    infected_symptomatic: usize,
    #[serde(rename = "Hospitalized")]
    hospitalized: usize,
    #[serde(rename = "ICU")]
    icu: usize,
    #[serde(rename = "Recovered")]
    recovered: usize,
    #[serde(rename = "Dead")]
    dead: usize,
}
create_report_trait!(PhaseCountsReportItem);

fn send_phase_counts(context: &mut Context) {
    let counts = context.get_phase_counts();
    let item = PhaseCountsReportItem {
        time: context.get_current_time(),
        susceptible: counts.get(Phase::Susceptible),
        exposed: counts.get(Phase::Exposed),
        infected_asymptomatic: counts.get(Phase::InfectedAsymptomatic),
        infected_symptomatic: counts.get(Phase::InfectedSymptomatic),
        hospitalized: counts.get(Phase::Hospitalized),
        icu: counts.get(Phase::Icu),
        recovered: counts.get(Phase::Recovered),
        dead: counts.get(Phase::Dead),
    };
    if let Err(e) = context.send_report(item) {
        error!("failed to write phase counts: {e}");
    }
}

pub trait ContextMonitorExt {
    /// Starts counting infections and deaths. Calling it again has no effect.
    fn init_monitor(&mut self);

    /// Writes `infections.csv`, `deaths.csv` and, every `period` hours, `phase_counts.csv` to
    /// `output_dir`.
    ///
    /// # Errors
    /// Returns an error if a report file cannot be created or `period` is not positive.
    fn add_monitor_reports(&mut self, output_dir: &Path, period: f64)
        -> Result<(), ContagionError>;

    fn get_infection_count(&self) -> usize;

    fn get_infection_count_at_location_type(&self, location_type: LocationTypeId) -> usize;

    /// Infections attributed to `person_id` as the most infectious person present.
    fn get_infection_count_by_infector(&self, person_id: PersonId) -> usize;

    /// How many times anyone has entered `phase`, e.g. the cumulative number of
    /// hospitalizations.
    fn get_phase_entry_count(&self, phase: Phase) -> usize;

    fn get_death_count(&self) -> usize;
}

impl ContextMonitorExt for Context {
    fn init_monitor(&mut self) {
        let data = self.get_data_container_mut(MonitorPlugin);
        if data.initialized {
            return;
        }
        data.initialized = true;

        self.subscribe_to_event(|context, event: InfectionEvent| {
            let data = context.get_data_container_mut(MonitorPlugin);
            data.infections += 1;
            if let Some(location_type) = event.location_type {
                *data
                    .infections_by_location_type
                    .entry(location_type)
                    .or_insert(0) += 1;
            }
            if let Some(infector) = event.infected_by {
                *data.infections_by_infector.entry(infector).or_insert(0) += 1;
            }
        });
        self.subscribe_to_event(|context, event: PhaseChangeEvent| {
            *context
                .get_data_container_mut(MonitorPlugin)
                .phase_entries
                .entry(event.current)
                .or_insert(0) += 1;
        });
        self.subscribe_to_event(|context, _event: PersonDiedEvent| {
            context.get_data_container_mut(MonitorPlugin).deaths += 1;
        });
    }

    fn add_monitor_reports(
        &mut self,
        output_dir: &Path,
        period: f64,
    ) -> Result<(), ContagionError> {
        self.add_report::<InfectionReportItem>(&output_dir.join("infections.csv"))?;
        self.add_report::<DeathReportItem>(&output_dir.join("deaths.csv"))?;
        self.add_report::<PhaseCountsReportItem>(&output_dir.join("phase_counts.csv"))?;

        self.subscribe_to_event(|context, event: InfectionEvent| {
            // Seeded infections have no location and leave the column empty.
            let location_type = event
                .location_type
                .and_then(|id| {
                    context
                        .get_location_types()
                        .get(id)
                        .map(|location_type| location_type.name.clone())
                })
                .unwrap_or_default();
            let item = InfectionReportItem {
                time: context.get_current_time(),
                person_id: event.person_id,
                location_id: event.location_id,
                location_type,
                infected_by: event.infected_by,
            };
            if let Err(e) = context.send_report(item) {
                error!("failed to write infection: {e}");
            }
        });
        self.subscribe_to_event(|context, event: PersonDiedEvent| {
            let item = DeathReportItem {
                time: context.get_current_time(),
                person_id: event.person_id,
                age: context.get_person_age(event.person_id),
            };
            if let Err(e) = context.send_report(item) {
                error!("failed to write death: {e}");
            }
        });
        self.add_periodic_plan_with_phase(period, send_phase_counts, ExecutionPhase::Last)?;
        info!("writing reports to {}", output_dir.display());
        Ok(())
    }

    fn get_infection_count(&self) -> usize {
        self.get_data_container(MonitorPlugin)
            .map_or(0, |data| data.infections)
    }

    fn get_infection_count_at_location_type(&self, location_type: LocationTypeId) -> usize {
        self.get_data_container(MonitorPlugin)
            .and_then(|data| data.infections_by_location_type.get(&location_type))
            .copied()
            .unwrap_or(0)
    }

    fn get_infection_count_by_infector(&self, person_id: PersonId) -> usize {
        self.get_data_container(MonitorPlugin)
            .and_then(|data| data.infections_by_infector.get(&person_id))
            .copied()
            .unwrap_or(0)
    }

    fn get_phase_entry_count(&self, phase: Phase) -> usize {
        self.get_data_container(MonitorPlugin)
            .and_then(|data| data.phase_entries.get(&phase))
            .copied()
            .unwrap_or(0)
    }

    fn get_death_count(&self) -> usize {
        self.get_data_container(MonitorPlugin)
            .map_or(0, |data| data.deaths)
    }
}
