//! Document paths, the store surface, and the repository that keeps
//! denormalized projections consistent on every write.

pub mod meta;
pub mod path;
pub mod predicate;
pub mod registry;
pub mod relation;
pub mod repository;
pub mod store;
pub mod update;

pub use meta::{MetaLink, MetaRule, MetadataRegistry, ProjectionRule};
pub use path::{CollectionPath, DocPath, FieldPath, TENANT_ROOT};
pub use predicate::{CompareOp, Predicate};
pub use registry::{Registries, RegistryError};
pub use relation::{
    CascadeHandler, CascadePlan, CascadeSpec, HandlerSet, RelationshipHandler,
    RelationshipHandlerRegistry, build_deleted_updates, build_saved_updates,
};
pub use repository::Repository;
pub use store::{DocumentStore, MemoryStore, Query, Snapshot, Transaction};
pub use update::{FieldOp, FieldUpdate, ParentUpdate, UpdateOps};
