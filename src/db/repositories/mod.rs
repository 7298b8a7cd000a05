pub mod review;
pub mod session;
pub mod settings;
pub mod user;
