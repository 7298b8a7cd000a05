pub mod prelude;

pub mod reviews;
pub mod sessions;
pub mod settings;
pub mod users;
