// ============================================================================
// Deferred Association Module
// ============================================================================
//
// Wraps a live association source, materializes its members lazily and
// tracks in-memory changes against a frozen baseline until commit.
//
// ============================================================================

pub mod deferred;
pub mod source;
pub mod state;

pub use deferred::DeferredAssociation;
pub use source::{AssociationSource, AssociationWriter};
pub use state::LoadState;
