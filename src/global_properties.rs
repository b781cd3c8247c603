//! Run-wide configuration values stored on the `Context`.
//!
//! A global property is a unit type naming a value of some type. Properties are defined with
//! `define_global_property!`, optionally with a validation function that is run every time the
//! value is set, and are read back with `ContextGlobalPropertiesExt::get_global_property_value`.
//!
//! ```ignore
//! define_global_property!(ReportPeriod, f64, |period: &f64| {
//!     if *period > 0.0 { Ok(()) } else { Err(ContagionError::ConfigError("period".into())) }
//! });
//! context.set_global_property_value(ReportPeriod, 24.0)?;
//! ```
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::ContagionError;
use crate::hashing::HashMap;

/// Defines a global property with the following parameters:
/// * `$global_property`: Name for the identifier type of the global property
/// * `$value`: The type of the property's value
/// * `$validate`: A function (or closure) that checks the validity of the property (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate: expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn validate(val: &$value) -> Result<(), $crate::error::ContagionError> {
                $validate(val)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    /// # Errors
    /// Returns a `ContagionError` describing why `value` is unacceptable.
    fn validate(value: &Self::Value) -> Result<(), ContagionError>;
}

struct GlobalPropertiesDataContainer {
    global_property_container: HashMap<TypeId, Box<dyn Any>>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer {
        global_property_container: HashMap::default(),
    }
);

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores `value`, replacing any previous value.
    ///
    /// # Errors
    /// Returns the error produced by the property's validation function.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), ContagionError>;

    /// Returns the value of the property, or `None` if it was never set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Reads a JSON file, deserializes it as the property's value and stores it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, does not parse, or fails validation.
    fn load_global_property_from_json<T: GlobalProperty>(
        &mut self,
        property: T,
        path: &Path,
    ) -> Result<(), ContagionError>
    where
        T::Value: DeserializeOwned;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), ContagionError> {
        T::validate(&value)?;
        let data_container = self.get_data_container_mut(GlobalPropertiesPlugin);
        data_container
            .global_property_container
            .insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data_container(GlobalPropertiesPlugin)?
            .global_property_container
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_global_property_from_json<T: GlobalProperty>(
        &mut self,
        property: T,
        path: &Path,
    ) -> Result<(), ContagionError>
    where
        T::Value: DeserializeOwned,
    {
        let data = fs::read_to_string(path)?;
        let value: T::Value = serde_json::from_str(&data)?;
        self.set_global_property_value(property, value)
    }
}
