//! Disease progression: the phases a person moves through once exposed, the probabilities and
//! durations that drive those moves, and the seeding of initial infections.
pub mod conditional;
pub mod phase;
pub mod progression;
pub mod seeding;

pub use conditional::{
    ConditionalDuration, ConditionalProbability, DurationDistribution, DurationFn, ProbabilityFn,
};
pub use phase::{ContextPhaseCountsExt, DiseaseState, Phase, PhaseCounts};
pub use progression::{
    Branch, ContextProgressionExt, PersonDiedEvent, PhaseChangeEvent, ProgressionModel,
    ProgressionParameters, ProgressionRng,
};
pub use seeding::{seed_infections, SeedingRng};
