pub const SESSION_COOKIE_NAME: &str = "ditchfork_session";

pub const ADMIN_PATH: &str = "/admin";

pub const LOGIN_PATH: &str = "/admin/login";

pub mod login {
    use std::time::Duration;

    /// Failures tolerated before any cooldown applies.
    pub const FREE_ATTEMPTS: u32 = 3;

    pub const BASE_DELAY: Duration = Duration::from_secs(1);

    /// Caps the backoff at `BASE_DELAY << 9` (512s).
    pub const MAX_SHIFT: u32 = 9;
}

pub mod limits {
    pub const MIN_PASSWORD_LEN: usize = 8;

    /// Raw body limit for multipart admin forms.
    pub const MAX_FORM_BYTES: usize = 10 << 20;

    pub const SESSION_TOKEN_BYTES: usize = 32;
}
