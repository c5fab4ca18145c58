pub mod memory;

pub use memory::{MemoryAssociation, MemoryAssociationStats, MemoryStore};
