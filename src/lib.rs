//! Option definition and value resolution for a modular CMS.
//!
//! Templates and layouts declare typed option definitions; pages and widget
//! instances override them with per-instance values. This crate merges the
//! two sets into edit view models or typed runtime values, validates and
//! coerces string-encoded values, and persists edit sets as a diff against
//! previously stored rows. Persistence and custom option providers are
//! collaborator traits supplied by the host application.

pub mod cache;
pub mod coerce;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod repository;
pub mod service;

pub use config::OptionServiceConfig;
pub use error::{CoercionError, OptionError, OptionResult, ValidationError};
pub use models::{
    CustomOption, CustomOptionRef, CustomOptionView, OptionDefinition, OptionType, OptionUpdate,
    OptionValueEdit, OptionValueRow, ResolvedOptionValue, ResolvedValue,
};
pub use provider::{CustomOptionProvider, CustomOptionRegistry};
pub use repository::{MemoryOptionRepository, OptionRepository};
pub use service::OptionService;
