// ============================================================================
// Association Source Contracts
// ============================================================================
//
// The deferred association never talks to storage itself. Everything it
// needs from the outside world goes through these two traits:
//
// - AssociationSource: read members, construct members, refresh
// - AssociationWriter: issue the link/unlink writes at commit time
//
// ============================================================================

use crate::core::{Record, Result};

/// Live accessor for one association of one owner record.
pub trait AssociationSource {
    type Record: Record;

    /// Input accepted by `build` and `create`
    type Attributes;

    /// The record owning the association
    type Owner;

    /// Fetch every current member, in the source's order.
    ///
    /// The returned vector is owned by the caller; the source must not
    /// keep a handle into it.
    fn fetch_all(&self) -> Result<Vec<Self::Record>>;

    /// Peek at the first member without materializing the whole set.
    fn first(&self) -> Result<Option<Self::Record>>;

    /// Peek at the last member without materializing the whole set.
    fn last(&self) -> Result<Option<Self::Record>>;

    /// Construct new, unsaved members.
    fn build(&mut self, attributes: Vec<Self::Attributes>) -> Result<Vec<Self::Record>>;

    /// Construct and persist new members.
    fn create(&mut self, attributes: Vec<Self::Attributes>) -> Result<Vec<Self::Record>>;

    /// Drop any cached state so the next fetch sees storage as it is now.
    fn reload(&mut self) -> Result<()>;

    /// Let `record` know about its owner. Sources that do not track
    /// inverse links keep the default no-op.
    fn set_inverse_instance(&mut self, _record: &Self::Record, _owner: &Self::Owner) -> Result<()> {
        Ok(())
    }
}

/// Storage writes needed to reconcile a deferred association.
pub trait AssociationWriter: AssociationSource {
    fn link(&mut self, record: &Self::Record) -> Result<()>;

    fn unlink(&mut self, record: &Self::Record) -> Result<()>;
}
