pub mod entity;
pub mod error;
pub mod record;

pub use entity::{Entity, new_persist_id};
pub use error::{DeferError, Result};
pub use record::{Record, Records};
