#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use cms_options::{
    CoercionError, CustomOption, CustomOptionProvider, CustomOptionRegistry, CustomOptionView,
    OptionDefinition, OptionRepository, OptionService, OptionServiceConfig, OptionType,
    OptionValueEdit, OptionValueRow,
};

pub fn definition(key: &str, option_type: OptionType, default: Option<&str>) -> OptionDefinition {
    OptionDefinition {
        id: Uuid::new_v4(),
        key: key.to_string(),
        option_type,
        default_value: default.map(str::to_string),
        is_deletable: true,
        custom_option: None,
    }
}

pub fn value_row(key: &str, option_type: OptionType, value: Option<&str>) -> OptionValueRow {
    OptionValueRow {
        id: Uuid::new_v4(),
        key: key.to_string(),
        option_type,
        value: value.map(str::to_string),
        custom_option: None,
    }
}

pub fn edit(key: &str, option_type: OptionType, value: Option<&str>) -> OptionValueEdit {
    OptionValueEdit {
        key: key.to_string(),
        option_type,
        value: value.map(str::to_string),
        default_value: None,
        use_default_value: false,
        can_edit_key: false,
        custom_option: None,
        custom_value_title: None,
        custom_default_title: None,
    }
}

pub fn default_edit(key: &str, option_type: OptionType) -> OptionValueEdit {
    OptionValueEdit {
        use_default_value: true,
        ..edit(key, option_type, None)
    }
}

pub fn custom_option(identifier: &str, title: &str) -> CustomOption {
    CustomOption {
        id: Uuid::new_v4(),
        identifier: identifier.to_string(),
        title: title.to_string(),
    }
}

pub fn custom_view(identifier: &str) -> CustomOptionView {
    CustomOptionView {
        identifier: identifier.to_string(),
        title: None,
    }
}

/// Row factory scoped to one parent entity, the way command handlers bind
/// new value rows to the page or widget being edited.
pub fn row_factory() -> impl FnMut() -> OptionValueRow {
    || OptionValueRow {
        id: Uuid::new_v4(),
        key: String::new(),
        option_type: OptionType::Text,
        value: None,
        custom_option: None,
    }
}

/// Tag-list provider: comma-separated raw values become JSON arrays, and a
/// fixed title table backs the display-title lookups.
pub struct TagProvider;

impl CustomOptionProvider for TagProvider {
    fn convert_value(&self, raw: &str) -> Result<Value, CoercionError> {
        Ok(Value::Array(
            raw.split(',')
                .map(|tag| Value::String(tag.trim().to_string()))
                .collect(),
        ))
    }

    fn default_value(&self) -> Option<Value> {
        Some(Value::Array(Vec::new()))
    }

    fn titles_for_values(
        &self,
        values: &[String],
        _repository: &dyn OptionRepository,
    ) -> HashMap<String, String> {
        let known = [("sports", "Sports"), ("tech", "Technology")];
        values
            .iter()
            .filter_map(|value| {
                known
                    .iter()
                    .find(|(raw, _)| raw == value)
                    .map(|(_, title)| (value.clone(), title.to_string()))
            })
            .collect()
    }
}

/// Service with an empty provider registry and default configuration.
pub fn service() -> OptionService {
    OptionService::new(
        OptionServiceConfig::default(),
        Arc::new(CustomOptionRegistry::new()),
    )
}

/// Service with the `tags` provider registered.
pub fn tags_service() -> OptionService {
    let mut registry = CustomOptionRegistry::new();
    registry.register("tags", Arc::new(TagProvider));
    OptionService::new(OptionServiceConfig::default(), Arc::new(registry))
}
