use clap::{Parser, Subcommand};
use papers_please_backend::config::Config;
use papers_please_backend::helper::sanitization_helpers;
use papers_please_backend::models::db_operations::users_db_operations;
use papers_please_backend::setup::db_setup;
use rand::RngCore;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "setup_cli",
    author,
    version,
    about = "Initial setup and maintenance for the Papers Please backend.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Required by every command except `secret`.
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the database file and every table. Safe to re-run.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
    /// Grants administrator rights to an existing user.
    Promote {
        #[arg(long)]
        username: String,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Prints a fresh SESSION_SECRET_KEY value.
    Generate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Secret { action: SecretAction::Generate } = &cli.command {
        println!("{}", generate_session_secret());
        return ExitCode::SUCCESS;
    }

    let Some(env_file) = cli.env_file.as_ref() else {
        eprintln!("❌ Error: --env-file <FILE> is required for this command.");
        return ExitCode::FAILURE;
    };
    let config = match Config::from_env(env_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.command {
        Commands::Db { action: DbAction::Setup } => setup_database(&config),
        Commands::Admin { action } => {
            let conn = match open_existing_database(&config) {
                Ok(conn) => conn,
                Err(message) => {
                    eprintln!("❌ Error: {}", message);
                    return ExitCode::FAILURE;
                }
            };
            match action {
                AdminAction::Create { username, password } => create_admin_user(&config, &conn, username, password),
                AdminAction::List => list_admin_users(&conn),
                AdminAction::ChangePassword { username, new_password } => {
                    change_admin_password(&config, &conn, username, new_password)
                }
                AdminAction::Promote { username } => promote_user(&conn, username),
            }
        }
        Commands::Secret { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("❌ Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// 64 random bytes, hex encoded: the 128 characters `SESSION_SECRET_KEY` expects.
fn generate_session_secret() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn setup_database(config: &Config) -> Result<(), String> {
    let db_path = config.db_file_path();
    println!("Setting up database at '{}'...", db_path.display());
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|e| format!("Could not create database directory: {}", e))?;
    }
    let mut conn = Connection::open(&db_path).map_err(|e| format!("Could not open database file: {}", e))?;
    db_setup::setup_database(&mut conn).map_err(|e| format!("Schema setup failed: {}", e))?;
    println!("✅ Database setup completed successfully.");
    Ok(())
}

fn open_existing_database(config: &Config) -> Result<Connection, String> {
    let db_path = config.db_file_path();
    if !db_path.exists() {
        return Err(format!(
            "Database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        ));
    }
    Connection::open(&db_path).map_err(|e| format!("Could not open database: {}", e))
}

fn create_admin_user(config: &Config, conn: &Connection, username: &str, password: &str) -> Result<(), String> {
    sanitization_helpers::validate_username(username).map_err(|e| e.to_string())?;
    sanitization_helpers::validate_password(password).map_err(|e| e.to_string())?;
    match users_db_operations::create_user(conn, username, password, true, config.bcrypt_cost) {
        Ok(_) => {
            println!("✅ Admin user '{}' created successfully.", username);
            Ok(())
        }
        Err(e) if e.is_constraint_violation() => Err(format!("The username '{}' already exists.", username)),
        Err(e) => Err(format!("Could not create admin user: {}", e)),
    }
}

fn list_admin_users(conn: &Connection) -> Result<(), String> {
    let admins = users_db_operations::read_admin_usernames(conn).map_err(|e| format!("Could not fetch admins: {}", e))?;
    println!("Listing Admin Users:");
    for username in admins {
        println!("- {}", username);
    }
    Ok(())
}

fn change_admin_password(config: &Config, conn: &Connection, username: &str, new_password: &str) -> Result<(), String> {
    sanitization_helpers::validate_password(new_password).map_err(|e| e.to_string())?;
    let user = users_db_operations::read_user_by_username(conn, username)
        .map_err(|e| format!("Could not look up user: {}", e))?;
    match user {
        Some(user) if user.is_admin => {
            users_db_operations::update_password(conn, username, new_password, config.bcrypt_cost)
                .map_err(|e| format!("Could not update password: {}", e))?;
            println!("✅ Password for admin user '{}' changed successfully.", username);
            Ok(())
        }
        _ => Err(format!("No admin user named '{}' found.", username)),
    }
}

fn promote_user(conn: &Connection, username: &str) -> Result<(), String> {
    match users_db_operations::set_admin_flag(conn, username, true) {
        Ok(0) => Err(format!("No user named '{}' found.", username)),
        Ok(_) => {
            println!("✅ User '{}' is now an administrator.", username);
            Ok(())
        }
        Err(e) => Err(format!("Could not promote user: {}", e)),
    }
}
