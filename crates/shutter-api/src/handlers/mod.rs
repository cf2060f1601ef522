//! axum handlers, one module per resource.

pub mod albums;
pub mod people;
pub mod photos;
pub mod session;
pub mod users;
