//! CLI entry point for Waybill.

pub mod auth;

use clap::{Parser, Subcommand};

/// Waybill driver API CLI
#[derive(Parser, Debug)]
#[command(name = "waybill", version, about = "Waybill driver API client CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Show the signed-in user (refreshes the token if needed)
    Session,
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with phone number and password
    Login(LoginArgs),
    /// Show whether a session is stored locally
    Status,
    /// Sign out and clear stored credentials
    Logout,
}

/// Arguments for `waybill auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Phone number used as the login identifier
    #[arg(short, long)]
    pub phone: String,

    /// Password
    #[arg(long, env = "WAYBILL_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Install the `tracing` subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
