//! Core runtime for MenuDB: entity lineage, projection and relationship
//! registries, the transactional repository, and the in-memory store.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod serialize;
pub mod traits;
pub mod types;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary only. Stores, registries, and errors are imported
/// from their modules.
///

pub mod prelude {
    pub use crate::{
        traits::{EntityKind, EntityRef, EntityType},
        types::TenantId,
    };
}
