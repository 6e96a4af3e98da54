//! Persistence boundary for option rows.
//!
//! The engine never talks to a database directly; it drives this trait, and
//! the caller controls transaction boundaries around each engine call. An
//! in-memory implementation ships for tests and embedding hosts.

use anyhow::Result;
use uuid::Uuid;

use crate::models::{CustomOption, OptionValueRow};

/// Store operations the option engine needs from its host.
///
/// All writes issued during one engine call are expected to run inside one
/// transactional scope supplied by the caller.
pub trait OptionRepository {
    /// Insert or update an option value row, keyed by its id.
    fn save_value(&mut self, row: &OptionValueRow) -> Result<()>;

    /// Delete an option value row.
    fn delete_value(&mut self, id: Uuid) -> Result<()>;

    /// Delete an option definition row.
    fn delete_definition(&mut self, id: Uuid) -> Result<()>;

    /// All registered custom option kinds, ordered by title.
    fn custom_options(&self) -> Result<Vec<CustomOption>>;

    /// Custom option kinds matching the given identifiers.
    fn custom_options_by_identifiers(&self, identifiers: &[String]) -> Result<Vec<CustomOption>>;
}

/// In-memory repository for tests and lightweight embedding.
#[derive(Debug, Default)]
pub struct MemoryOptionRepository {
    values: Vec<OptionValueRow>,
    custom_options: Vec<CustomOption>,
    deleted_definitions: Vec<Uuid>,
}

impl MemoryOptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_options(custom_options: Vec<CustomOption>) -> Self {
        Self {
            custom_options,
            ..Self::default()
        }
    }

    /// Currently stored option value rows.
    pub fn values(&self) -> &[OptionValueRow] {
        &self.values
    }

    /// Ids of definitions deleted through this repository.
    pub fn deleted_definitions(&self) -> &[Uuid] {
        &self.deleted_definitions
    }
}

impl OptionRepository for MemoryOptionRepository {
    fn save_value(&mut self, row: &OptionValueRow) -> Result<()> {
        match self.values.iter_mut().find(|v| v.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => self.values.push(row.clone()),
        }
        log::debug!("Saved option value '{}'", row.key);
        Ok(())
    }

    fn delete_value(&mut self, id: Uuid) -> Result<()> {
        let before = self.values.len();
        self.values.retain(|v| v.id != id);
        if self.values.len() == before {
            anyhow::bail!("Option value {} not found", id);
        }
        log::debug!("Deleted option value {}", id);
        Ok(())
    }

    fn delete_definition(&mut self, id: Uuid) -> Result<()> {
        self.deleted_definitions.push(id);
        log::debug!("Deleted option definition {}", id);
        Ok(())
    }

    fn custom_options(&self) -> Result<Vec<CustomOption>> {
        let mut options = self.custom_options.clone();
        options.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(options)
    }

    fn custom_options_by_identifiers(&self, identifiers: &[String]) -> Result<Vec<CustomOption>> {
        Ok(self
            .custom_options
            .iter()
            .filter(|option| identifiers.contains(&option.identifier))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptionType;

    fn row(key: &str, value: &str) -> OptionValueRow {
        OptionValueRow {
            id: Uuid::new_v4(),
            key: key.to_string(),
            option_type: OptionType::Text,
            value: Some(value.to_string()),
            custom_option: None,
        }
    }

    #[test]
    fn save_value_upserts_by_id() {
        let mut repo = MemoryOptionRepository::new();
        let mut stored = row("Header", "one");
        repo.save_value(&stored).unwrap();

        stored.value = Some("two".to_string());
        repo.save_value(&stored).unwrap();

        assert_eq!(repo.values().len(), 1);
        assert_eq!(repo.values()[0].value.as_deref(), Some("two"));
    }

    #[test]
    fn delete_value_fails_for_unknown_id() {
        let mut repo = MemoryOptionRepository::new();
        assert!(repo.delete_value(Uuid::new_v4()).is_err());
    }

    #[test]
    fn custom_options_are_title_ordered() {
        let repo = MemoryOptionRepository::with_custom_options(vec![
            CustomOption {
                id: Uuid::new_v4(),
                identifier: "b".to_string(),
                title: "Beta".to_string(),
            },
            CustomOption {
                id: Uuid::new_v4(),
                identifier: "a".to_string(),
                title: "Alpha".to_string(),
            },
        ]);

        let options = repo.custom_options().unwrap();
        assert_eq!(options[0].title, "Alpha");
        assert_eq!(options[1].title, "Beta");
    }
}
