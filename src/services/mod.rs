pub mod auth_service;
pub use auth_service::{AuthError, AuthService, IssuedSession, SessionUser};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod credentials;

pub mod maintenance;
pub use maintenance::Maintenance;

pub mod rate_limiter;
pub use rate_limiter::LoginLimiter;

pub mod slug;
pub use slug::{SlugIndex, allocate_unique, slugify};

pub mod uploads;
pub use uploads::{UploadError, UploadStore};
