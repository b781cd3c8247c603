//! Locations as the transmission engines see them: a type from a fixed registry, a usable
//! area, a number of sub-locations, and the people present for one contact interval.
use serde::{Deserialize, Serialize};

use crate::error::ContagionError;
use crate::hashing::HashMap;
use crate::people::PersonId;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationId(pub usize);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationTypeId(usize);

#[derive(Clone, Debug, PartialEq)]
pub struct LocationType {
    pub id: LocationTypeId,
    pub name: String,
    /// Compute contacts per sub-location rather than over the whole location.
    pub infect_in_sublocation: bool,
    /// Ventilation and distancing correction applied to the area (sigma_T).
    pub area_correction: f64,
}

/// How a location type is written in the parameters file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocationTypeConfig {
    pub name: String,
    #[serde(default)]
    pub infect_in_sublocation: bool,
    #[serde(default = "default_area_correction")]
    pub area_correction: f64,
}

fn default_area_correction() -> f64 {
    1.0
}

/// The closed set of location types known to a run. Names are resolved once, when locations
/// are loaded; an unknown name is an error, never a silent default.
#[derive(Clone, Debug, Default)]
pub struct LocationTypeRegistry {
    types: Vec<LocationType>,
    by_name: HashMap<String, LocationTypeId>,
}

impl LocationTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `ContagionError::ConfigError` for a duplicate name or a non-positive correction.
    pub fn register(&mut self, config: &LocationTypeConfig) -> Result<LocationTypeId, ContagionError> {
        if self.by_name.contains_key(&config.name) {
            return Err(ContagionError::ConfigError(format!(
                "location type '{}' is defined twice",
                config.name
            )));
        }
        if !(config.area_correction.is_finite() && config.area_correction > 0.0) {
            return Err(ContagionError::ConfigError(format!(
                "location type '{}' has area correction {}; it must be positive",
                config.name, config.area_correction
            )));
        }
        let id = LocationTypeId(self.types.len());
        self.types.push(LocationType {
            id,
            name: config.name.clone(),
            infect_in_sublocation: config.infect_in_sublocation,
            area_correction: config.area_correction,
        });
        self.by_name.insert(config.name.clone(), id);
        Ok(id)
    }

    /// # Errors
    /// Returns the first registration error.
    pub fn from_configs(configs: &[LocationTypeConfig]) -> Result<Self, ContagionError> {
        let mut registry = Self::new();
        for config in configs {
            registry.register(config)?;
        }
        Ok(registry)
    }

    /// # Errors
    /// Returns `ContagionError::ConfigError` if no type with this name was registered.
    pub fn resolve(&self, name: &str) -> Result<&LocationType, ContagionError> {
        self.by_name
            .get(name)
            .map(|id| &self.types[id.0])
            .ok_or_else(|| ContagionError::ConfigError(format!("unknown location type '{name}'")))
    }

    #[must_use]
    pub fn get(&self, id: LocationTypeId) -> Option<&LocationType> {
        self.types.get(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Who shared a location (or one of its sub-locations) during one contact interval.
#[derive(Clone, Copy, Debug)]
pub struct LocationSnapshot<'a> {
    pub location_id: LocationId,
    pub location_type: &'a LocationType,
    /// Total usable area in square meters.
    pub total_area: f64,
    pub sub_locations: usize,
    /// The people in the sub-location, or in the whole location when it is computed as one unit.
    pub present: &'a [PersonId],
}

impl LocationSnapshot<'_> {
    /// Whether contacts are computed within a single sub-location. Locations with fewer than two
    /// sub-locations are always computed this way.
    #[must_use]
    pub fn per_sublocation(&self) -> bool {
        self.location_type.infect_in_sublocation || self.sub_locations < 2
    }

    /// The area the present people share: one sub-location's share of the total when computing
    /// per sub-location, else the whole area.
    #[must_use]
    pub fn effective_area(&self) -> f64 {
        if self.per_sublocation() {
            #[allow(clippy::cast_precision_loss)]
            let sub_locations = self.sub_locations.max(1) as f64;
            self.total_area / sub_locations
        } else {
            self.total_area
        }
    }
}
