use serde::{Deserialize, Serialize};

/// Engine configuration. All fields have defaults, so hosts can deserialize
/// a partial section from their own config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionServiceConfig {
    /// strftime pattern used to display DateTime option values in the edit
    /// UI. Stored values always use the ISO `%Y-%m-%d` wire format.
    #[serde(default = "default_edit_date_format")]
    pub edit_date_format: String,

    /// TTL for the cached list of custom option kinds. The cache is advisory;
    /// staleness causes at most a redundant reload.
    #[serde(default = "default_custom_options_cache_ttl_secs")]
    pub custom_options_cache_ttl_secs: u64,
}

fn default_edit_date_format() -> String {
    "%m/%d/%Y".to_string()
}

fn default_custom_options_cache_ttl_secs() -> u64 {
    30
}

impl Default for OptionServiceConfig {
    fn default() -> Self {
        Self {
            edit_date_format: default_edit_date_format(),
            custom_options_cache_ttl_secs: default_custom_options_cache_ttl_secs(),
        }
    }
}
