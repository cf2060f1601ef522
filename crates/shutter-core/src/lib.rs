//! Domain model of the Shutter photo store: events, the entities folded from
//! them, per-resource permissions, pagination and the [`store::Store`] trait.
//!
//! Nothing here knows about HTTP, SQL or image files.

pub mod entity;
pub mod error;
pub mod event;
pub mod fold;
pub mod page;
pub mod permission;
pub mod store;

pub use error::{Error, Result};
