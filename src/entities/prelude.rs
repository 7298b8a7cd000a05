pub use super::reviews::Entity as Reviews;
pub use super::sessions::Entity as Sessions;
pub use super::settings::Entity as Settings;
pub use super::users::Entity as Users;
