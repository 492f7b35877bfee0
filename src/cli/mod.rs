//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use crate::config::{self, Settings};
use crate::error::{Error, Result};
use crate::web::auth::hash_password;
use crate::web::AppState;

/// waitless - hold your place in line without standing in it
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to listen on (overrides settings)
        #[arg(short, long)]
        port: Option<u16>,

        /// Provision demo institutions, queues, and users at boot
        #[arg(long)]
        seed_demo: bool,
    },

    /// Write a default settings file
    Setup,
}

impl Commands {
    pub async fn run(self) -> Result<()> {
        match self {
            Commands::Serve { port, seed_demo } => cmd_serve(port, seed_demo).await,
            Commands::Setup => cmd_setup().await,
        }
    }
}

async fn cmd_serve(port: Option<u16>, seed_demo: bool) -> Result<()> {
    let mut settings = config::load_settings_or_default();
    if let Some(port) = port {
        settings.server.port = port;
    }

    let state = AppState::new(settings)?;
    if seed_demo {
        seed_demo_data(&state)?;
    }

    crate::web::server::run_server(state).await
}

async fn cmd_setup() -> Result<()> {
    let path = config::get_settings_path()?;
    if path.exists() {
        println!("Settings already exist at {}", path.display());
        return Ok(());
    }

    let mut settings = Settings::default();
    settings.auth.jwt_secret = Some(generate_secret());
    config::save_settings(&settings)?;

    println!("Created {}", path.display());
    println!("Edit it to change the port, storage paths, or queue defaults.");
    Ok(())
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Demo data for local development. Accounts log in with the password
/// "password123". Queues are recreated fresh on every boot; accounts
/// are reused if they already exist.
fn seed_demo_data(state: &AppState) -> Result<()> {
    let password_hash = hash_password("password123").map_err(Error::Web)?;

    let institutions = [
        (
            "City General Hospital",
            "hospital@waitless.demo",
            "12 Harbor Road",
            vec![
                ("OPD Consultation", 60u32, 10u32),
                ("Pharmacy", 40, 5),
                ("Lab Tests", 30, 8),
            ],
        ),
        (
            "Unity Bank",
            "bank@waitless.demo",
            "4 Market Square",
            vec![("Account Services", 25, 12), ("Loan Desk", 15, 20)],
        ),
        (
            "Passport Office",
            "passport@waitless.demo",
            "9 Civic Center",
            vec![("Document Verification", 50, 7)],
        ),
    ];

    for (name, email, address, queues) in institutions {
        let record = match state.directory.find_institution_by_email(email)? {
            Some(existing) => existing,
            None => state.directory.create_institution(
                name,
                email,
                None,
                Some(address),
                &password_hash,
            )?,
        };
        for (queue_name, capacity, service_time) in queues {
            state.registry.create_queue(
                record.id,
                queue_name,
                capacity,
                service_time,
                state.settings.defaults.max_swaps_per_token,
            )?;
        }
    }

    let users = [
        ("Asha Rao", "asha@waitless.demo"),
        ("Binh Tran", "binh@waitless.demo"),
        ("Carla Mendes", "carla@waitless.demo"),
    ];
    for (name, email) in users {
        if state.directory.find_user_by_email(email)?.is_none() {
            state.directory.create_user(name, email, &password_hash)?;
        }
    }

    info!("Seeded demo institutions, queues, and users");
    Ok(())
}
