//! String <-> typed value coercion for option values.
//!
//! Stored option values are strings; these routines turn them into native
//! values and normalize them between the ISO wire format and the edit-side
//! display format. Coercion returns a result instead of throwing: failure is
//! an expected outcome on user input.

use chrono::NaiveDate;

use crate::error::{CoercionError, ValidationError};
use crate::models::{OptionType, ResolvedValue};
use crate::provider::CustomOptionRegistry;

/// ISO 8601 date-only wire format for stored DateTime option values.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Coerce a stored string value to its declared native type.
///
/// Empty input yields the type's default (see [`default_value_for`]).
/// `Custom` values delegate to the provider registered for the identifier;
/// with no provider registered the raw string passes through unchanged.
pub fn convert_value(
    value: Option<&str>,
    option_type: OptionType,
    custom_identifier: Option<&str>,
    registry: &CustomOptionRegistry,
) -> Result<ResolvedValue, CoercionError> {
    let raw = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(default_value_for(option_type, custom_identifier, registry)),
    };

    match option_type {
        OptionType::Text => Ok(ResolvedValue::Text(raw.to_string())),

        OptionType::JavaScriptUrl | OptionType::CssUrl => {
            Ok(ResolvedValue::Url(url_path_encode(raw)))
        }

        OptionType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ResolvedValue::Integer)
            .map_err(|_| CoercionError::InvalidInteger(raw.to_string())),

        OptionType::Float => {
            let normalized = raw.replace(',', ".");
            normalized
                .trim()
                .parse::<f64>()
                .map(ResolvedValue::Float)
                .map_err(|_| CoercionError::InvalidFloat(raw.to_string()))
        }

        OptionType::DateTime => NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
            .map(ResolvedValue::Date)
            .map_err(|_| CoercionError::InvalidDate(raw.to_string())),

        OptionType::Boolean => match raw.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(ResolvedValue::Boolean(true)),
            v if v.eq_ignore_ascii_case("false") => Ok(ResolvedValue::Boolean(false)),
            _ => Err(CoercionError::InvalidBoolean(raw.to_string())),
        },

        OptionType::Custom => match custom_identifier.and_then(|id| registry.get(id)) {
            Some(provider) => provider.convert_value(raw).map(ResolvedValue::Custom),
            None => Ok(ResolvedValue::Text(raw.to_string())),
        },
    }
}

/// The value an option of the given type resolves to when no value is stored.
pub fn default_value_for(
    option_type: OptionType,
    custom_identifier: Option<&str>,
    registry: &CustomOptionRegistry,
) -> ResolvedValue {
    match option_type {
        OptionType::Boolean => ResolvedValue::Boolean(false),
        OptionType::Custom => custom_identifier
            .and_then(|id| registry.get(id))
            .and_then(|provider| provider.default_value())
            .map(ResolvedValue::Custom)
            .unwrap_or(ResolvedValue::None),
        _ => ResolvedValue::None,
    }
}

/// Coerce for the read path: never fails, degrading to `None` so browsing is
/// not blocked by a malformed stored value.
pub fn convert_value_safe(
    value: Option<&str>,
    option_type: OptionType,
    custom_identifier: Option<&str>,
    registry: &CustomOptionRegistry,
) -> ResolvedValue {
    convert_value(value, option_type, custom_identifier, registry)
        .unwrap_or(ResolvedValue::None)
}

/// Normalize a submitted value for persistence.
///
/// Whitespace-only input becomes `None`. DateTime values are reformatted from
/// the edit-side display format to the ISO wire format, strictly: failure is
/// a [`ValidationError`] naming the option's key and type.
pub fn normalize_for_save(
    key: &str,
    option_type: OptionType,
    value: Option<&str>,
    edit_date_format: &str,
) -> Result<Option<String>, ValidationError> {
    let raw = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(None),
    };

    match option_type {
        OptionType::DateTime => parse_date_flexible(raw.trim(), edit_date_format)
            .map(|date| Some(date.format(ISO_DATE_FORMAT).to_string()))
            .ok_or_else(|| ValidationError::invalid_value(key, option_type)),
        _ => Ok(Some(raw.to_string())),
    }
}

/// Normalize a stored value for display in the edit UI.
///
/// Whitespace-only input becomes `None`. DateTime values are reformatted from
/// the ISO wire format to the display format; on failure the stored string is
/// shown unchanged rather than blocking the edit screen.
pub fn normalize_for_edit(
    option_type: OptionType,
    value: Option<&str>,
    edit_date_format: &str,
) -> Option<String> {
    let raw = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return None,
    };

    match option_type {
        OptionType::DateTime => match NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT) {
            Ok(date) => Some(date.format(edit_date_format).to_string()),
            Err(_) => Some(raw.to_string()),
        },
        _ => Some(raw.to_string()),
    }
}

/// Parse a date as submitted from the edit UI: the configured display format
/// first, the ISO wire format as a fallback.
fn parse_date_flexible(raw: &str, edit_date_format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, edit_date_format)
        .or_else(|_| NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT))
        .ok()
}

/// Percent-encode the path portion of a URL, leaving the query string and
/// reserved path characters untouched.
fn url_path_encode(value: &str) -> String {
    let (path, query) = match value.find('?') {
        Some(index) => value.split_at(index),
        None => (value, ""),
    };

    let mut encoded = String::with_capacity(value.len());
    for ch in path.chars() {
        if ch == ' ' || ch.is_ascii_control() || !ch.is_ascii() {
            let mut buf = [0u8; 4];
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        } else {
            encoded.push(ch);
        }
    }
    encoded.push_str(query);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CustomOptionRegistry;

    fn registry() -> CustomOptionRegistry {
        CustomOptionRegistry::new()
    }

    #[test]
    fn empty_input_resolves_to_type_default() {
        let reg = registry();
        assert_eq!(
            convert_value(None, OptionType::Text, None, &reg),
            Ok(ResolvedValue::None)
        );
        assert_eq!(
            convert_value(Some(""), OptionType::Integer, None, &reg),
            Ok(ResolvedValue::None)
        );
        assert_eq!(
            convert_value(None, OptionType::Boolean, None, &reg),
            Ok(ResolvedValue::Boolean(false))
        );
    }

    #[test]
    fn integer_accepts_values_beyond_32_bits() {
        let reg = registry();
        assert_eq!(
            convert_value(Some("42"), OptionType::Integer, None, &reg),
            Ok(ResolvedValue::Integer(42))
        );
        assert_eq!(
            convert_value(Some("4294967296"), OptionType::Integer, None, &reg),
            Ok(ResolvedValue::Integer(4_294_967_296))
        );
        assert!(convert_value(Some("forty"), OptionType::Integer, None, &reg).is_err());
    }

    #[test]
    fn float_accepts_comma_decimal_separator() {
        let reg = registry();
        assert_eq!(
            convert_value(Some("1,5"), OptionType::Float, None, &reg),
            Ok(ResolvedValue::Float(1.5))
        );
        assert_eq!(
            convert_value(Some("1.5"), OptionType::Float, None, &reg),
            Ok(ResolvedValue::Float(1.5))
        );
    }

    #[test]
    fn date_parses_iso_wire_format_only() {
        let reg = registry();
        assert_eq!(
            convert_value(Some("2020-01-31"), OptionType::DateTime, None, &reg),
            Ok(ResolvedValue::Date(
                NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()
            ))
        );
        assert!(convert_value(Some("31/01/2020"), OptionType::DateTime, None, &reg).is_err());
    }

    #[test]
    fn boolean_parses_tokens_case_insensitively() {
        let reg = registry();
        assert_eq!(
            convert_value(Some("True"), OptionType::Boolean, None, &reg),
            Ok(ResolvedValue::Boolean(true))
        );
        assert_eq!(
            convert_value(Some(" false "), OptionType::Boolean, None, &reg),
            Ok(ResolvedValue::Boolean(false))
        );
        assert!(convert_value(Some("yes"), OptionType::Boolean, None, &reg).is_err());
    }

    #[test]
    fn url_types_path_encode_spaces_but_keep_query() {
        let reg = registry();
        assert_eq!(
            convert_value(
                Some("/scripts/my plugin.js?v=1 2"),
                OptionType::JavaScriptUrl,
                None,
                &reg
            ),
            Ok(ResolvedValue::Url(
                "/scripts/my%20plugin.js?v=1 2".to_string()
            ))
        );
    }

    #[test]
    fn custom_without_provider_passes_string_through() {
        let reg = registry();
        assert_eq!(
            convert_value(Some("a,b"), OptionType::Custom, Some("tags"), &reg),
            Ok(ResolvedValue::Text("a,b".to_string()))
        );
        assert_eq!(
            default_value_for(OptionType::Custom, Some("tags"), &reg),
            ResolvedValue::None
        );
    }

    #[test]
    fn safe_conversion_degrades_to_none() {
        let reg = registry();
        assert_eq!(
            convert_value_safe(Some("not a date"), OptionType::DateTime, None, &reg),
            ResolvedValue::None
        );
    }

    #[test]
    fn save_normalization_reformats_dates_to_iso() {
        let saved = normalize_for_save("Start", OptionType::DateTime, Some("01/31/2020"), "%m/%d/%Y");
        assert_eq!(saved.unwrap(), Some("2020-01-31".to_string()));

        // ISO input is accepted as-is on save
        let saved = normalize_for_save("Start", OptionType::DateTime, Some("2020-01-31"), "%m/%d/%Y");
        assert_eq!(saved.unwrap(), Some("2020-01-31".to_string()));

        let err = normalize_for_save("Start", OptionType::DateTime, Some("garbage"), "%m/%d/%Y")
            .unwrap_err();
        assert!(err.message().contains("Start"));
    }

    #[test]
    fn edit_normalization_swallows_bad_stored_dates() {
        assert_eq!(
            normalize_for_edit(OptionType::DateTime, Some("2020-01-31"), "%m/%d/%Y"),
            Some("01/31/2020".to_string())
        );
        assert_eq!(
            normalize_for_edit(OptionType::DateTime, Some("not-a-date"), "%m/%d/%Y"),
            Some("not-a-date".to_string())
        );
        assert_eq!(normalize_for_edit(OptionType::Text, Some("   "), "%m/%d/%Y"), None);
    }

    #[test]
    fn date_round_trip_is_stable() {
        let edited = normalize_for_edit(OptionType::DateTime, Some("2020-01-31"), "%m/%d/%Y");
        let saved =
            normalize_for_save("Start", OptionType::DateTime, edited.as_deref(), "%m/%d/%Y")
                .unwrap();
        assert_eq!(saved, Some("2020-01-31".to_string()));
    }
}
