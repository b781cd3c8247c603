//! Wires a configured run together.
use log::info;

use crate::context::Context;
use crate::disease::{seed_infections, ContextProgressionExt, ProgressionModel};
use crate::error::ContagionError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::monitor::ContextMonitorExt;
use crate::parameters::Parameters;
use crate::report::ContextReportExt;
use crate::transmission::{ContextTransmissionExt, LocationTypeRegistry};

/// Hours between phase count rows when no `report_period` is configured.
pub const DEFAULT_REPORT_PERIOD: f64 = 24.0;

/// Builds the progression and transmission engines and the location type registry from the
/// loaded `Parameters`, starts the monitor (and its reports, if an output directory is set),
/// and exposes the configured number of initial infections.
///
/// The population must already be in place.
///
/// # Errors
/// Returns an error if no parameters were loaded, any engine fails to build, a report cannot
/// be created, or there are too few people to seed.
pub fn init(context: &mut Context) -> Result<(), ContagionError> {
    let parameters = context
        .get_global_property_value(Parameters)
        .cloned()
        .ok_or_else(|| ContagionError::ConfigError("parameters have not been loaded".into()))?;

    context.set_progression_model(ProgressionModel::from_parameters(&parameters.progression)?);
    context.set_transmission_model(
        parameters
            .transmission_model
            .build(&parameters.area, &parameters.distance)?,
    );
    context.set_location_types(LocationTypeRegistry::from_configs(
        &parameters.location_types,
    )?);

    context.init_monitor();
    if let Some(output_dir) = context.get_output_dir() {
        let period = parameters.report_period.unwrap_or(DEFAULT_REPORT_PERIOD);
        context.add_monitor_reports(&output_dir, period)?;
    }

    let seeding = &parameters.seeding;
    let seeded = seed_infections(
        context,
        seeding.number_infected,
        seeding.min_age_infected,
        seeding.max_age_infected,
    )?;
    info!(
        "{} transmission model, {} initial infections",
        parameters.transmission_model,
        seeded.len()
    );
    Ok(())
}
