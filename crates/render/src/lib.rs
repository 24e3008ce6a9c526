//! Read side of the theme asset registry.
//!
//! A shared [`ResourceDistributor`] fetches records and knows the asset host
//! of every theme. Each page render creates its own [`Resolver`], collects
//! the presets and resources the page needs, and renders the composed
//! markup for the head and the bottom of the document.

mod assets;
mod distributor;
pub mod error;
mod markup;
mod resolver;

pub use crate::assets::{Assets, Icon, Script, Stylesheet};
pub use crate::distributor::ResourceDistributor;
pub use crate::markup::{HOST_PLACEHOLDER, expand_host};
pub use crate::resolver::Resolver;
pub use themer_storage::Placement;
