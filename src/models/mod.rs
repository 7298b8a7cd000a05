pub mod review;
pub mod settings;
