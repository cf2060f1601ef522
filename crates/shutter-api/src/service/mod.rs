//! Business rules of the API: validation, permission checks and event
//! appends. Handlers stay thin and delegate here.

mod access;
mod albums;
mod people;
mod photos;
mod users;

pub use albums::AlbumService;
pub use people::PersonService;
pub use photos::PhotoService;
pub use users::UserService;
