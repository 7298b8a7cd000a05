mod admin;

pub use admin::{cmd_hash_password, cmd_init_admin, parse_credentials};
