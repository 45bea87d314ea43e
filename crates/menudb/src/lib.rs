//! MenuDB keeps denormalized catalog projections consistent in a
//! document store.
//!
//! ## Crate layout
//! - `core`: the engine (registries, cascade handlers, repository, stores).
//! - `entity`: catalog entities and their projections.
//! - `catalog`: wiring of every rule and handler, plus the `Catalog` handle.
//! - `error`: the public error type.
//! - `telemetry`: `tracing` subscriber setup.

pub use menudb_core as core;

pub mod catalog;
pub mod entity;
pub mod error;
pub mod telemetry;

pub use catalog::{Catalog, CatalogRepo, registries};
pub use error::Error;
pub use menudb_core::config::Config;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        catalog::Catalog,
        entity::{
            Category, Location, Menu, MenuGroup, MenuOption, OptionSet, Order, Product,
        },
        error::Error,
    };
    pub use menudb_core::{
        db::{DocumentStore, MemoryStore},
        traits::EntityKind as _,
        types::TenantId,
    };
}
