//! Disease progression and location-based transmission for agent-based models
//!
//! Contagion provides the infection machinery of an agent-based epidemic
//! simulation. It is driven by a discrete-event `Context` that owns simulated
//! time (in hours), the queue of scheduled transitions, and the data of every
//! module. On top of that it provides:
//! * A population of people with an age, a location and a disease phase.
//! * A disease progression state machine over eight phases: Susceptible,
//!   Exposed, Infected-Asymptomatic, Infected-Symptomatic, Hospitalized, ICU,
//!   Recovered and Dead. Branch probabilities and dwell times can depend on
//!   age.
//! * Two interchangeable transmission engines that decide who gets exposed
//!   when people share a location for a while: an area-density model and a
//!   distance/viral-load model.
//! * Seeding of initial infections, phase counts, and CSV reports.
//!
//! The activity model that moves people between locations lives outside this
//! crate. It calls `ContextTransmissionExt::infect_location` for every
//! location it visits on each time step.
pub mod context;
pub mod disease;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod log;
pub mod model;
pub mod monitor;
pub mod numeric;
pub mod parameters;
pub mod people;
pub mod plan;
pub mod random;
pub mod report;
pub mod runner;
pub mod transmission;

pub mod prelude;

pub use context::{Context, ExecutionPhase};
pub use error::ContagionError;

// Re-exports used by the exported macros.
pub use rand;
