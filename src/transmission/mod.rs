//! Force of infection: given who shared a location and for how long, decide who becomes
//! exposed.
//!
//! Two engines implement `TransmissionModel`. The area engine only reports who should be
//! exposed and leaves applying the exposure to `ContextTransmissionExt::infect_location`; the
//! distance engine writes the exposure time, emits the `InfectionEvent` and calls `expose`
//! itself. Either way, a caller going through `infect_location` sees the same effect.
pub mod area;
pub mod distance;
pub mod infectiousness;
pub mod location;

use std::cell::RefCell;
use std::fmt::{self, Display};
use std::rc::Rc;
use std::str::FromStr;

use log::{debug, warn};
use serde::Deserialize;

pub use area::{AreaParameters, AreaTransmission};
pub use distance::{DistanceParameters, DistanceTransmission};
pub use infectiousness::{InfectiousnessCurve, RampCurve, ViralLoadCurve};
pub use location::{
    LocationId, LocationSnapshot, LocationType, LocationTypeConfig, LocationTypeId,
    LocationTypeRegistry,
};

use crate::context::{Context, SimEvent};
use crate::define_data_plugin;
use crate::define_rng;
use crate::disease::ContextProgressionExt;
use crate::error::ContagionError;
use crate::people::PersonId;

define_rng!(TransmissionRng);

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Emitted when a person is infected, either at a location or by seeding. Seeded infections
/// have no location.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InfectionEvent {
    pub person_id: PersonId,
    pub location_id: Option<LocationId>,
    pub location_type: Option<LocationTypeId>,
    /// The most infectious person present, if any contributed.
    pub infected_by: Option<PersonId>,
}
impl SimEvent for InfectionEvent {}

/// What one contact interval computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfectionRecord {
    /// False when the interval was too short to be worth computing.
    pub calculated: bool,
    /// Ill people present.
    pub infectious: Vec<PersonId>,
    /// Susceptible people whose draw succeeded.
    pub newly_exposed: Vec<PersonId>,
    pub most_infectious: Option<PersonId>,
}

pub trait TransmissionModel {
    /// Resolves one contact interval of `duration` hours.
    fn infect(
        &self,
        context: &mut Context,
        snapshot: &LocationSnapshot,
        duration: f64,
    ) -> InfectionRecord;

    /// Changes a named parameter during a run.
    ///
    /// # Errors
    /// Returns `ContagionError::UnknownParameter` or `ContagionError::InvalidParameterValue`;
    /// the model is unchanged in either case.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ContagionError>;

    fn name(&self) -> &'static str;

    /// Whether `infect` already exposed the people it reports.
    fn applies_exposures(&self) -> bool;
}

/// The configured choice of transmission engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionModelKind {
    #[default]
    Area,
    Distance,
}

impl TransmissionModelKind {
    /// # Errors
    /// Returns the validation error of the selected engine's parameters.
    pub fn build(
        self,
        area: &AreaParameters,
        distance: &DistanceParameters,
    ) -> Result<Box<dyn TransmissionModel>, ContagionError> {
        Ok(match self {
            TransmissionModelKind::Area => Box::new(AreaTransmission::new(area)?),
            TransmissionModelKind::Distance => Box::new(DistanceTransmission::new(distance)?),
        })
    }
}

impl FromStr for TransmissionModelKind {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "area" => Ok(TransmissionModelKind::Area),
            "distance" => Ok(TransmissionModelKind::Distance),
            _ => Err(ContagionError::ConfigError(format!(
                "unknown transmission model '{s}'"
            ))),
        }
    }
}

impl Display for TransmissionModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmissionModelKind::Area => f.write_str("area"),
            TransmissionModelKind::Distance => f.write_str("distance"),
        }
    }
}

/// Reports the infection and starts the person's progression.
pub(crate) fn apply_exposure(
    context: &mut Context,
    person_id: PersonId,
    snapshot: &LocationSnapshot,
    infected_by: Option<PersonId>,
) {
    context.emit_event(InfectionEvent {
        person_id,
        location_id: Some(snapshot.location_id),
        location_type: Some(snapshot.location_type.id),
        infected_by,
    });
    if let Err(e) = context.expose(person_id) {
        warn!("could not expose person {person_id}: {e}");
    }
}

struct TransmissionData {
    model: Option<Rc<RefCell<Box<dyn TransmissionModel>>>>,
    location_types: Rc<LocationTypeRegistry>,
}

define_data_plugin!(
    TransmissionPlugin,
    TransmissionData,
    TransmissionData {
        model: None,
        location_types: Rc::default(),
    }
);

fn transmission_model(
    context: &Context,
) -> Result<Rc<RefCell<Box<dyn TransmissionModel>>>, ContagionError> {
    context
        .get_data_container(TransmissionPlugin)
        .and_then(|data| data.model.clone())
        .ok_or_else(|| ContagionError::ContagionError("no transmission model is set".to_string()))
}

pub trait ContextTransmissionExt {
    fn set_transmission_model(&mut self, model: Box<dyn TransmissionModel>);

    /// Name of the installed engine, if any.
    fn get_transmission_model_name(&self) -> Option<&'static str>;

    fn set_location_types(&mut self, registry: LocationTypeRegistry);

    /// The registered location types; empty until `set_location_types` is called.
    fn get_location_types(&self) -> Rc<LocationTypeRegistry>;

    /// Runs the installed engine for one contact interval and makes sure everyone it reports
    /// as newly exposed has been exposed.
    ///
    /// # Errors
    /// Returns an error if no transmission model is set.
    fn infect_location(
        &mut self,
        snapshot: &LocationSnapshot,
        duration: f64,
    ) -> Result<InfectionRecord, ContagionError>;

    /// Forwards a parameter change to the installed engine. A rejected change is logged and
    /// returned; the run continues.
    ///
    /// # Errors
    /// Returns the engine's rejection, or an error if no transmission model is set.
    fn set_transmission_parameter(&mut self, name: &str, value: f64)
        -> Result<(), ContagionError>;
}

impl ContextTransmissionExt for Context {
    fn set_transmission_model(&mut self, model: Box<dyn TransmissionModel>) {
        debug!("using the {} transmission model", model.name());
        self.get_data_container_mut(TransmissionPlugin).model = Some(Rc::new(RefCell::new(model)));
    }

    fn get_transmission_model_name(&self) -> Option<&'static str> {
        transmission_model(self).ok().map(|model| model.borrow().name())
    }

    fn set_location_types(&mut self, registry: LocationTypeRegistry) {
        self.get_data_container_mut(TransmissionPlugin).location_types = Rc::new(registry);
    }

    fn get_location_types(&self) -> Rc<LocationTypeRegistry> {
        self.get_data_container(TransmissionPlugin)
            .map(|data| Rc::clone(&data.location_types))
            .unwrap_or_default()
    }

    fn infect_location(
        &mut self,
        snapshot: &LocationSnapshot,
        duration: f64,
    ) -> Result<InfectionRecord, ContagionError> {
        let model = transmission_model(self)?;
        let model = model.borrow();
        let record = model.infect(self, snapshot, duration);
        if !model.applies_exposures() {
            for person_id in &record.newly_exposed {
                apply_exposure(self, *person_id, snapshot, record.most_infectious);
            }
        }
        Ok(record)
    }

    fn set_transmission_parameter(
        &mut self,
        name: &str,
        value: f64,
    ) -> Result<(), ContagionError> {
        let model = transmission_model(self)?;
        let result = model.borrow_mut().set_parameter(name, value);
        if let Err(e) = &result {
            warn!("t={}: {e}", self.get_current_time());
        }
        result
    }
}
