//! The option resolution engine.
//!
//! Merges template/layout option definitions with per-instance override
//! values, coerces string-encoded values into typed ones, and persists edit
//! sets as an additive/deletive diff against previously stored rows.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::cache::TimedCache;
use crate::coerce;
use crate::config::OptionServiceConfig;
use crate::error::{OptionError, OptionResult, ValidationError};
use crate::models::{
    keys_equal, normalized_key, CustomOption, CustomOptionView, OptionDefinition, OptionType,
    OptionUpdate, OptionValueEdit, OptionValueRow, ResolvedOptionValue,
};
use crate::provider::CustomOptionRegistry;
use crate::repository::OptionRepository;

/// A custom option reference found in a submitted edit set, tracked for the
/// batched load-and-validate pass.
struct CustomRef<'a> {
    key: &'a str,
    identifier: Option<&'a str>,
    loaded: Option<&'a CustomOption>,
}

pub struct OptionService {
    config: OptionServiceConfig,
    registry: Arc<CustomOptionRegistry>,
    custom_options_cache: TimedCache<Vec<CustomOptionView>>,
}

impl OptionService {
    pub fn new(config: OptionServiceConfig, registry: Arc<CustomOptionRegistry>) -> Self {
        let ttl = Duration::from_secs(config.custom_options_cache_ttl_secs);
        Self {
            config,
            registry,
            custom_options_cache: TimedCache::new(ttl),
        }
    }

    pub fn config(&self) -> &OptionServiceConfig {
        &self.config
    }

    /// Merge definitions and override values into one edit view model list.
    ///
    /// Values stay display strings; only DateTime values are reformatted to
    /// the configured display format (leniently - a malformed stored date is
    /// shown unchanged). Overrides without a backing definition are marked
    /// `can_edit_key` so the UI lets the user rename or remove them. The
    /// result is sorted by key, case-insensitively, and Custom entries carry
    /// provider-resolved display titles.
    pub fn merge_for_edit(
        &self,
        definitions: &[OptionDefinition],
        values: &[OptionValueRow],
        repository: &dyn OptionRepository,
    ) -> Vec<OptionValueEdit> {
        let mut merged: Vec<OptionValueEdit> = Vec::new();

        for value in distinct(values) {
            let definition = definitions
                .iter()
                .find(|d| keys_equal(&d.key, &value.key) && d.option_type == value.option_type);

            merged.push(OptionValueEdit {
                key: value.key.trim().to_string(),
                option_type: value.option_type,
                value: self.normalize_for_edit(value.option_type, value.value.as_deref()),
                default_value: definition.and_then(|d| {
                    self.normalize_for_edit(d.option_type, d.default_value.as_deref())
                }),
                use_default_value: false,
                can_edit_key: definition.is_none(),
                custom_option: value.custom_option.as_ref().map(custom_option_view),
                custom_value_title: None,
                custom_default_title: None,
            });
        }

        for definition in definitions {
            if merged.iter().any(|m| keys_equal(&m.key, &definition.key)) {
                continue;
            }
            let display =
                self.normalize_for_edit(definition.option_type, definition.default_value.as_deref());
            merged.push(OptionValueEdit {
                key: definition.key.trim().to_string(),
                option_type: definition.option_type,
                value: display.clone(),
                default_value: display,
                use_default_value: true,
                can_edit_key: false,
                custom_option: definition.custom_option.as_ref().map(|c| c.view()),
                custom_value_title: None,
                custom_default_title: None,
            });
        }

        self.set_custom_option_titles(&mut merged, repository);

        merged.sort_by(|a, b| a.key.to_lowercase().cmp(&b.key.to_lowercase()));
        debug!(
            "Merged {} definitions and {} values into {} edit entries",
            definitions.len(),
            values.len(),
            merged.len()
        );
        merged
    }

    /// Merge definitions and override values into typed runtime values.
    ///
    /// Same matching policy as [`merge_for_edit`](Self::merge_for_edit), but
    /// every value is coerced to its native type immediately. Coercion
    /// failure on a stored value degrades to `ResolvedValue::None` rather
    /// than failing the read.
    pub fn merge_for_runtime(
        &self,
        definitions: &[OptionDefinition],
        values: &[OptionValueRow],
    ) -> Vec<ResolvedOptionValue> {
        let mut merged: Vec<ResolvedOptionValue> = Vec::new();

        for value in distinct(values) {
            let identifier = value.custom_option.as_ref().map(|c| c.identifier.as_str());
            merged.push(ResolvedOptionValue {
                key: value.key.trim().to_string(),
                option_type: value.option_type,
                value: coerce::convert_value_safe(
                    value.value.as_deref(),
                    value.option_type,
                    identifier,
                    &self.registry,
                ),
                custom_option: value.custom_option.as_ref().map(custom_option_view),
            });
        }

        for definition in definitions {
            if merged.iter().any(|m| keys_equal(&m.key, &definition.key)) {
                continue;
            }
            let identifier = definition.custom_option.as_ref().map(|c| c.identifier());
            merged.push(ResolvedOptionValue {
                key: definition.key.trim().to_string(),
                option_type: definition.option_type,
                value: coerce::convert_value_safe(
                    definition.default_value.as_deref(),
                    definition.option_type,
                    identifier,
                    &self.registry,
                ),
                custom_option: definition.custom_option.as_ref().map(|c| c.view()),
            });
        }

        merged.sort_by(|a, b| a.key.to_lowercase().cmp(&b.key.to_lowercase()));
        merged
    }

    /// Persist an edit set as the authoritative full option-value state of
    /// one parent entity.
    ///
    /// Rows whose key is absent from `edits` are deleted, `use_default_value`
    /// entries lose their stored row, and the rest are upserted through
    /// `create_row` for rows that do not exist yet. The whole batch is
    /// validated before the first repository mutation; the caller supplies
    /// the surrounding transactional scope.
    ///
    /// # Errors
    /// * [`OptionError::Validation`] - duplicate keys in `edits`, or a value
    ///   that does not coerce to its declared type.
    /// * [`OptionError::Configuration`] - a Custom edit with a missing,
    ///   unknown or unregistered custom option identifier.
    pub fn save_option_values<F>(
        &self,
        edits: &[OptionValueEdit],
        saved: &[OptionValueRow],
        repository: &mut dyn OptionRepository,
        mut create_row: F,
    ) -> OptionResult<()>
    where
        F: FnMut() -> OptionValueRow,
    {
        self.validate_key_uniqueness(edits.iter().map(|e| e.key.as_str()))?;

        let custom_refs: Vec<CustomRef<'_>> = edits
            .iter()
            .filter(|e| e.option_type == OptionType::Custom)
            .map(|e| CustomRef {
                key: &e.key,
                identifier: e.custom_option.as_ref().map(|c| c.identifier.as_str()),
                loaded: None,
            })
            .collect();
        let custom_options = self.load_and_validate_custom_options(&custom_refs, &*repository)?;

        // Validate and normalize every explicit edit up front so a failure
        // aborts the batch with the store untouched.
        let mut save_values: Vec<Option<String>> = vec![None; edits.len()];
        for (index, edit) in edits.iter().enumerate() {
            if edit.use_default_value {
                continue;
            }
            let value =
                self.normalize_for_save(&edit.key, edit.option_type, edit.value.as_deref())?;
            let identifier = edit.custom_option.as_ref().map(|c| c.identifier.as_str());
            coerce::convert_value(value.as_deref(), edit.option_type, identifier, &self.registry)
                .map_err(|_| ValidationError::invalid_value(&edit.key, edit.option_type))?;
            save_values[index] = value;
        }

        for row in saved {
            if !edits.iter().any(|e| keys_equal(&e.key, &row.key)) {
                info!("Deleting option value '{}' removed from the edit set", row.key);
                repository.delete_value(row.id)?;
            }
        }

        for (index, edit) in edits.iter().enumerate() {
            let existing = saved.iter().find(|r| keys_equal(&r.key, &edit.key));

            if edit.use_default_value {
                if let Some(row) = existing {
                    info!("Deleting option value '{}' reverted to its default", row.key);
                    repository.delete_value(row.id)?;
                }
                continue;
            }

            let mut row = match existing {
                Some(row) => row.clone(),
                None => {
                    let mut row = create_row();
                    row.key = edit.key.trim().to_string();
                    row
                }
            };
            row.value = save_values[index].clone();
            row.option_type = edit.option_type;
            row.custom_option = match (edit.option_type, edit.custom_option.as_ref()) {
                (OptionType::Custom, Some(custom)) => custom_options
                    .iter()
                    .find(|c| c.identifier == custom.identifier)
                    .cloned(),
                _ => None,
            };

            repository.save_value(&row)?;
        }

        Ok(())
    }

    /// Replace a container's own option definitions with the requested set.
    ///
    /// Definitions absent from `updates` are deleted - unless one of them is
    /// marked non-deletable, which fails validation before any deletion
    /// happens. The rest are added or updated in place with re-validated
    /// value coercion.
    pub fn set_options(
        &self,
        definitions: &mut Vec<OptionDefinition>,
        updates: &[OptionUpdate],
        repository: &mut dyn OptionRepository,
    ) -> OptionResult<()> {
        self.validate_key_uniqueness(updates.iter().map(|u| u.key.as_str()))?;

        let removed: Vec<OptionDefinition> = definitions
            .iter()
            .filter(|d| !updates.iter().any(|u| keys_equal(&u.key, &d.key)))
            .cloned()
            .collect();
        if let Some(locked) = removed.iter().find(|d| !d.is_deletable) {
            return Err(ValidationError::cannot_delete_option(&locked.key, locked.id).into());
        }

        let custom_refs: Vec<CustomRef<'_>> = updates
            .iter()
            .filter(|u| u.option_type == OptionType::Custom)
            .map(|u| CustomRef {
                key: &u.key,
                identifier: u.custom_option.as_ref().map(|c| c.identifier()),
                loaded: u.custom_option.as_ref().and_then(|c| c.loaded()),
            })
            .collect();
        let custom_options = self.load_and_validate_custom_options(&custom_refs, &*repository)?;

        let mut default_values: Vec<Option<String>> = Vec::with_capacity(updates.len());
        for update in updates {
            let value =
                self.normalize_for_save(&update.key, update.option_type, update.value.as_deref())?;
            let identifier = update.custom_option.as_ref().map(|c| c.identifier());
            coerce::convert_value(value.as_deref(), update.option_type, identifier, &self.registry)
                .map_err(|_| ValidationError::invalid_value(&update.key, update.option_type))?;
            default_values.push(value);
        }

        for definition in &removed {
            info!("Deleting option definition '{}'", definition.key);
            repository.delete_definition(definition.id)?;
        }
        definitions.retain(|d| updates.iter().any(|u| keys_equal(&u.key, &d.key)));

        for (index, update) in updates.iter().enumerate() {
            let custom_option = match update.option_type {
                OptionType::Custom => update.custom_option.as_ref().and_then(|c| {
                    custom_options
                        .iter()
                        .find(|loaded| loaded.identifier == c.identifier())
                        .cloned()
                        .map(crate::models::CustomOptionRef::Loaded)
                }),
                _ => None,
            };

            match definitions.iter().position(|d| keys_equal(&d.key, &update.key)) {
                Some(existing) => {
                    let definition = &mut definitions[existing];
                    definition.key = update.key.trim().to_string();
                    definition.option_type = update.option_type;
                    definition.default_value = default_values[index].clone();
                    definition.custom_option = custom_option;
                }
                None => definitions.push(OptionDefinition {
                    id: uuid::Uuid::new_v4(),
                    key: update.key.trim().to_string(),
                    option_type: update.option_type,
                    default_value: default_values[index].clone(),
                    is_deletable: true,
                    custom_option,
                }),
            }
        }

        Ok(())
    }

    /// The list of registered custom option kinds, served through a short
    /// TTL cache.
    pub fn custom_options(
        &self,
        repository: &dyn OptionRepository,
    ) -> OptionResult<Vec<CustomOptionView>> {
        self.custom_options_cache.get_or_load(|| {
            debug!("Loading custom options list");
            let options = repository.custom_options()?;
            Ok(options
                .into_iter()
                .map(|option| CustomOptionView {
                    identifier: option.identifier,
                    title: Some(option.title),
                })
                .collect())
        })
    }

    /// Load custom option rows by identifier, failing on any unknown one.
    pub fn custom_options_by_identifiers(
        &self,
        repository: &dyn OptionRepository,
        identifiers: &[String],
    ) -> OptionResult<Vec<CustomOption>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let options = repository.custom_options_by_identifiers(identifiers)?;

        if let Some(unknown) = identifiers
            .iter()
            .find(|id| !options.iter().any(|o| &o.identifier == *id))
        {
            return Err(OptionError::Configuration(format!(
                "Custom option '{}' is not registered",
                unknown
            )));
        }

        Ok(options)
    }

    /// Attach provider-resolved display titles to Custom entries, batched:
    /// one provider call per distinct identifier, over the distinct raw
    /// values needing titles. Entries whose value yields no title keep none.
    pub fn set_custom_option_titles(
        &self,
        models: &mut [OptionValueEdit],
        repository: &dyn OptionRepository,
    ) {
        let mut values_by_identifier: HashMap<String, BTreeSet<String>> = HashMap::new();
        for model in models.iter().filter(|m| m.option_type == OptionType::Custom) {
            if let Some(custom) = &model.custom_option {
                let entry = values_by_identifier
                    .entry(custom.identifier.clone())
                    .or_default();
                entry.insert(model.value.clone().unwrap_or_default());
                entry.insert(model.default_value.clone().unwrap_or_default());
            }
        }

        for (identifier, values) in values_by_identifier {
            let Some(provider) = self.registry.get(&identifier) else {
                continue;
            };
            let values: Vec<String> = values.into_iter().collect();
            let titles = provider.titles_for_values(&values, repository);

            for model in models.iter_mut().filter(|m| {
                m.option_type == OptionType::Custom
                    && m.custom_option
                        .as_ref()
                        .is_some_and(|c| c.identifier == identifier)
            }) {
                for (value, title) in &titles {
                    if value_matches(model.value.as_deref(), value) {
                        model.custom_value_title = Some(title.clone());
                    }
                    if value_matches(model.default_value.as_deref(), value) {
                        model.custom_default_title = Some(title.clone());
                    }
                }
            }
        }
    }

    /// Reject an option set containing two entries with the same trimmed,
    /// case-insensitive key.
    pub fn validate_key_uniqueness<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for key in keys {
            let normalized = normalized_key(key);
            if !seen.insert(normalized.clone()) {
                return Err(ValidationError::duplicate_key(&normalized));
            }
        }
        Ok(())
    }

    /// Display-format a stored value for the edit UI (lenient).
    pub fn normalize_for_edit(
        &self,
        option_type: OptionType,
        value: Option<&str>,
    ) -> Option<String> {
        coerce::normalize_for_edit(option_type, value, &self.config.edit_date_format)
    }

    /// Wire-format a submitted value for persistence (strict).
    pub fn normalize_for_save(
        &self,
        key: &str,
        option_type: OptionType,
        value: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        coerce::normalize_for_save(key, option_type, value, &self.config.edit_date_format)
    }

    /// Resolve every custom option reference in a submitted set: identifiers
    /// must be present, registered with a provider, and known to the store.
    fn load_and_validate_custom_options(
        &self,
        refs: &[CustomRef<'_>],
        repository: &dyn OptionRepository,
    ) -> OptionResult<Vec<CustomOption>> {
        let mut loaded: Vec<CustomOption> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for custom_ref in refs {
            let identifier = match custom_ref.identifier {
                Some(id) if !id.trim().is_empty() => id,
                _ => {
                    return Err(OptionError::Configuration(format!(
                        "A custom option identifier must be set for option '{}'",
                        custom_ref.key
                    )));
                }
            };

            if !self.registry.contains(identifier) {
                return Err(OptionError::Configuration(format!(
                    "No custom option provider registered for identifier '{}'",
                    identifier
                )));
            }

            if let Some(option) = custom_ref.loaded {
                if !loaded.iter().any(|c| c.identifier == option.identifier) {
                    loaded.push(option.clone());
                }
            } else if !missing.iter().any(|m| m == identifier) {
                missing.push(identifier.to_string());
            }
        }

        missing.retain(|m| !loaded.iter().any(|c| &c.identifier == m));
        if !missing.is_empty() {
            for option in self.custom_options_by_identifiers(repository, &missing)? {
                if !loaded.iter().any(|c| c.identifier == option.identifier) {
                    loaded.push(option);
                }
            }
        }

        Ok(loaded)
    }
}

/// Skip exact duplicates while preserving input order.
fn distinct(values: &[OptionValueRow]) -> Vec<&OptionValueRow> {
    let mut seen: Vec<&OptionValueRow> = Vec::new();
    for value in values {
        if !seen.iter().any(|v| *v == value) {
            seen.push(value);
        }
    }
    seen
}

fn custom_option_view(option: &CustomOption) -> CustomOptionView {
    CustomOptionView {
        identifier: option.identifier.clone(),
        title: Some(option.title.clone()),
    }
}

fn value_matches(model_value: Option<&str>, title_key: &str) -> bool {
    match model_value {
        Some(value) => value == title_key,
        None => title_key.is_empty(),
    }
}
