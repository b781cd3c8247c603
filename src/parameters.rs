use std::path::Path;

use serde::Deserialize;

use crate::context::Context;
use crate::define_global_property;
use crate::disease::{ProgressionModel, ProgressionParameters};
use crate::error::ContagionError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::transmission::{
    AreaParameters, DistanceParameters, LocationTypeConfig, LocationTypeRegistry,
    TransmissionModelKind,
};

/// Which people are exposed at the start of a run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SeedingParameters {
    pub number_infected: usize,
    pub min_age_infected: u8,
    pub max_age_infected: u8,
}

impl Default for SeedingParameters {
    fn default() -> Self {
        SeedingParameters {
            number_infected: 0,
            min_age_infected: 0,
            max_age_infected: 100,
        }
    }
}

/// Everything a run of the disease model is configured with.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiseaseParameters {
    pub transmission_model: TransmissionModelKind,
    pub area: AreaParameters,
    pub distance: DistanceParameters,
    pub progression: ProgressionParameters,
    pub seeding: SeedingParameters,
    pub location_types: Vec<LocationTypeConfig>,
    /// Hours between rows of the phase count report.
    pub report_period: Option<f64>,
}

fn validate_parameters(parameters: &DiseaseParameters) -> Result<(), ContagionError> {
    ProgressionModel::from_parameters(&parameters.progression)?;
    parameters
        .transmission_model
        .build(&parameters.area, &parameters.distance)?;
    LocationTypeRegistry::from_configs(&parameters.location_types)?;
    let seeding = &parameters.seeding;
    if seeding.min_age_infected > seeding.max_age_infected {
        return Err(ContagionError::ConfigError(format!(
            "seeding age range {}-{} is empty",
            seeding.min_age_infected, seeding.max_age_infected
        )));
    }
    if let Some(period) = parameters.report_period {
        if !(period.is_finite() && period > 0.0) {
            return Err(ContagionError::ConfigError(format!(
                "report_period must be positive, got {period}"
            )));
        }
    }
    Ok(())
}

define_global_property!(Parameters, DiseaseParameters, validate_parameters);

/// Loads the parameters from a JSON file and stores them on the context. Invalid parameters are
/// rejected here, before anything runs.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or a parameter is invalid.
pub fn load_parameters_from_json(context: &mut Context, path: &Path) -> Result<(), ContagionError> {
    context.load_global_property_from_json(Parameters, path)
}
