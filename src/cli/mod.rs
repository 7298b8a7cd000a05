//! CLI module - Command-line interface for Ditchfork
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Ditchfork - a small music review site
#[derive(Parser)]
#[command(name = "ditchfork")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an admin account non-interactively
    InitAdmin {
        /// Credentials as `username:password`
        credentials: String,
    },

    /// Print the Argon2 hash of a password using the configured cost
    HashPassword {
        password: String,
    },
}

pub use commands::*;
