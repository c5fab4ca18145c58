// ============================================================================
// Deferring Library
// ============================================================================

pub mod association;
pub mod commit;
pub mod config;
pub mod core;
pub mod delta;
pub mod storage;

// Re-export main types for convenience
pub use association::{AssociationSource, AssociationWriter, DeferredAssociation, LoadState};
pub use commit::{CommitCallbacks, CommitReport, commit};
pub use config::{CommitConfig, CommitOrder};
pub use crate::core::{DeferError, Entity, Record, Records, Result};
pub use delta::AssociationDelta;
pub use storage::{MemoryAssociation, MemoryStore};

/// Wrap the `name` association of `owner` in `store` for deferred editing.
///
/// # Examples
///
/// ```
/// use deferring::{CommitCallbacks, CommitConfig, MemoryStore, commit};
/// use serde_json::json;
///
/// # fn main() -> deferring::Result<()> {
/// let store = MemoryStore::new();
/// let post = store.insert(json!({"title": "Hello"}))?;
/// let rust = store.insert(json!({"name": "rust"}))?;
///
/// let mut tags = deferring::defer(&store, &post, "tags");
/// tags.append(rust.clone())?;
/// assert_eq!(tags.pending_creates()?, vec![rust.clone()]);
///
/// // Nothing is written until commit
/// assert!(store.members(&post.persist_id, "tags")?.is_empty());
///
/// commit(&mut tags, &CommitConfig::default(), &mut CommitCallbacks::new())?;
/// assert_eq!(store.members(&post.persist_id, "tags")?, vec![rust]);
/// # Ok(())
/// # }
/// ```
pub fn defer(store: &MemoryStore, owner: &Entity, name: &str) -> DeferredAssociation<MemoryAssociation> {
    DeferredAssociation::new(store.association(owner, name))
}
