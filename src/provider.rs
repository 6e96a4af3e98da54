//! Custom option providers and their registry.
//!
//! Options outside the built-in type enumeration delegate coercion, default
//! values and display titles to a provider registered under the custom
//! option's identifier. The registry is an explicit object built at startup
//! and handed to the engine, so tests can inject fakes.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CoercionError;
use crate::repository::OptionRepository;

/// Coercion, default-value and title logic for one custom option kind.
pub trait CustomOptionProvider: Send + Sync {
    /// Coerce a raw stored string to the provider-defined value.
    fn convert_value(&self, raw: &str) -> Result<Value, CoercionError>;

    /// The value an option of this kind resolves to when nothing is stored.
    fn default_value(&self) -> Option<Value> {
        None
    }

    /// Resolve human-readable titles for a batch of distinct raw values.
    /// Values without a title may be omitted from the result.
    fn titles_for_values(
        &self,
        values: &[String],
        repository: &dyn OptionRepository,
    ) -> HashMap<String, String> {
        let _ = (values, repository);
        HashMap::new()
    }
}

/// Identifier -> provider lookup, built once at startup.
#[derive(Default)]
pub struct CustomOptionRegistry {
    providers: HashMap<String, Arc<dyn CustomOptionProvider>>,
}

impl CustomOptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        provider: Arc<dyn CustomOptionProvider>,
    ) {
        let identifier = identifier.into();
        log::debug!("Registering custom option provider '{}'", identifier);
        self.providers.insert(identifier, provider);
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<dyn CustomOptionProvider>> {
        self.providers.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.providers.contains_key(identifier)
    }
}
