//! Waybill CLI binary entry point.

use clap::Parser;
use waybill::cli::{AuthCommands, Cli, Commands};

#[tokio::main]
async fn main() {
    waybill::cli::init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => {
                waybill::cli::auth::handle_login(&args.phone, &args.password).await
            }
            AuthCommands::Status => waybill::cli::auth::handle_status().await,
            AuthCommands::Logout => waybill::cli::auth::handle_logout().await,
        },
        Commands::Session => waybill::cli::auth::handle_session().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
