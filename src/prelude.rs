pub use crate::context::{Context, ExecutionPhase, SimEvent};
pub use crate::disease::{
    seed_infections, ContextPhaseCountsExt, ContextProgressionExt, DiseaseState, Phase,
    PersonDiedEvent, PhaseChangeEvent, ProgressionModel, ProgressionParameters,
};
pub use crate::error::ContagionError;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::monitor::ContextMonitorExt;
pub use crate::parameters::{load_parameters_from_json, DiseaseParameters, Parameters};
pub use crate::people::{ContextPeopleExt, PersonAttributes, PersonId};
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::transmission::{
    ContextTransmissionExt, InfectionEvent, InfectionRecord, LocationId, LocationSnapshot,
    LocationTypeConfig, LocationTypeRegistry, TransmissionModel, TransmissionModelKind,
};
pub use crate::{create_report_trait, define_data_plugin, define_global_property, define_rng};
