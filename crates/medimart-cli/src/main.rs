mod auth;
mod cli;
mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use client::MedimartClient;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let profile = &cli.profile;
    let profile_cfg = config::load_profile(profile)?;
    let format = cli
        .format
        .or_else(|| profile_cfg.output_format())
        .unwrap_or_default();

    match &cli.command {
        Commands::Login(args) => {
            let server = config::resolve_server(&cli.server, profile)?;
            commands::auth::login(&server, args, profile).await?;
        }
        Commands::Logout => {
            commands::auth::logout(profile)?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    profile_cfg.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    profile_cfg.format.as_deref().unwrap_or("table")
                );
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = profile_cfg.clone();
                config::set_key(&mut cfg, &set_args.key, &set_args.value)?;
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        command => {
            let server = config::resolve_server(&cli.server, profile)?;
            let creds = auth::load_credentials(profile)?.filter(|c| c.server == server);
            let client = MedimartClient::new(&server, creds.as_ref().map(|c| c.token.clone()));
            let creds = creds.as_ref();
            match command {
                Commands::Whoami => commands::auth::whoami(&client, creds).await?,
                Commands::Status => commands::server::status(&client, &server).await?,
                Commands::Doctors(args) => commands::doctors::list(&client, args, format).await?,
                Commands::Slots(args) => commands::doctors::slots(&client, args, format).await?,
                Commands::Book(args) => commands::bookings::book(&client, args, creds, format).await?,
                Commands::Bookings(args) => {
                    commands::bookings::list(&client, args, creds, format).await?
                }
                Commands::Orders(args) => commands::orders::list(&client, args, creds, format).await?,
                Commands::Search(args) => commands::search::search(&client, args, format).await?,
                Commands::Login(_) | Commands::Logout | Commands::Config(_) => {}
            }
        }
    }

    Ok(())
}
