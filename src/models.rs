use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of built-in option types. `Custom` defers coercion, defaults
/// and display titles to a registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Text,
    Integer,
    Float,
    DateTime,
    Boolean,
    JavaScriptUrl,
    CssUrl,
    Custom,
}

impl OptionType {
    /// Human-readable type name used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            OptionType::Text => "text",
            OptionType::Integer => "integer",
            OptionType::Float => "floating point number",
            OptionType::DateTime => "date",
            OptionType::Boolean => "boolean",
            OptionType::JavaScriptUrl => "JavaScript URL",
            OptionType::CssUrl => "CSS URL",
            OptionType::Custom => "custom",
        }
    }
}

/// A registered custom option kind, persisted by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOption {
    pub id: Uuid,
    pub identifier: String,
    pub title: String,
}

/// Reference to a custom option carried by definitions and edit requests.
///
/// Collaborators hand the engine either a fully loaded row or a by-identifier
/// reference; the engine never inspects lazy placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomOptionRef {
    Loaded(CustomOption),
    Reference { identifier: String },
}

impl CustomOptionRef {
    pub fn identifier(&self) -> &str {
        match self {
            CustomOptionRef::Loaded(option) => &option.identifier,
            CustomOptionRef::Reference { identifier } => identifier,
        }
    }

    pub fn loaded(&self) -> Option<&CustomOption> {
        match self {
            CustomOptionRef::Loaded(option) => Some(option),
            CustomOptionRef::Reference { .. } => None,
        }
    }

    pub fn view(&self) -> CustomOptionView {
        match self {
            CustomOptionRef::Loaded(option) => CustomOptionView {
                identifier: option.identifier.clone(),
                title: Some(option.title.clone()),
            },
            CustomOptionRef::Reference { identifier } => CustomOptionView {
                identifier: identifier.clone(),
                title: None,
            },
        }
    }
}

/// Display projection of a custom option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOptionView {
    pub identifier: String,
    pub title: Option<String>,
}

/// A named, typed configurable slot declared by a template or layout.
///
/// Read-only input for the merge operations; mutated only through
/// [`crate::service::OptionService::set_options`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub id: Uuid,
    pub key: String,
    pub option_type: OptionType,
    pub default_value: Option<String>,
    pub is_deletable: bool,
    pub custom_option: Option<CustomOptionRef>,
}

/// A persisted per-instance override of a definition's default, owned by one
/// parent entity (a page, a widget instance). Loaded rows always carry
/// resolved custom options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValueRow {
    pub id: Uuid,
    pub key: String,
    pub option_type: OptionType,
    pub value: Option<String>,
    pub custom_option: Option<CustomOption>,
}

/// Edit view model: one row of the option editing grid.
///
/// Produced by merging definitions with stored values, and accepted back as
/// the authoritative full edit set on save. Values are display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValueEdit {
    pub key: String,
    pub option_type: OptionType,
    pub value: Option<String>,
    pub default_value: Option<String>,
    pub use_default_value: bool,
    /// Set when the override has no backing definition, so the UI must let
    /// the user rename or remove it.
    pub can_edit_key: bool,
    pub custom_option: Option<CustomOptionView>,
    pub custom_value_title: Option<String>,
    pub custom_default_title: Option<String>,
}

/// One requested definition row for [`crate::service::OptionService::set_options`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionUpdate {
    pub key: String,
    pub option_type: OptionType,
    pub value: Option<String>,
    pub custom_option: Option<CustomOptionRef>,
}

/// Runtime view model: a merged option with its value coerced to the native
/// type, for rendering code that consumes the option as a real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOptionValue {
    pub key: String,
    pub option_type: OptionType,
    pub value: ResolvedValue,
    pub custom_option: Option<CustomOptionView>,
}

/// A coerced option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedValue {
    None,
    Text(String),
    Url(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Boolean(bool),
    Custom(serde_json::Value),
}

impl ResolvedValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ResolvedValue::None)
    }
}

/// Option keys are compared trimmed and case-insensitively.
pub(crate) fn keys_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub(crate) fn normalized_key(key: &str) -> String {
    key.trim().to_lowercase()
}
