//! Build side of the theme asset registry.
//!
//! Theme definitions are read into [`ThemeDefinition`]s, turned into files on
//! disk by the [`Builder`] and registered through the [`ResourceManager`].
//! Versioned artifacts whose stored version already matches are neither
//! rewritten nor re-registered, so running a build twice is cheap.

mod builder;
mod definition;
pub mod error;
pub mod filter;
mod manager;
mod version;

pub use crate::builder::{BuildReport, Builder, RESOURCE_PLACEHOLDER, ROOT_PLACEHOLDER};
pub use crate::definition::{
    IconItem, IconKind, ImagePack, ItemKind, PresetItem, ScriptItem, StylesheetItem, ThemeDefinition, ThemeSet,
};
pub use crate::filter::{Filter, FilterRegistry, Minifier};
pub use crate::manager::ResourceManager;
pub use crate::version::{VERSION_PLACEHOLDER, version_token};
