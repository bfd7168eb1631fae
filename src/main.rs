//! Command-line client for the grievance portal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use grievance_client::api::{
    ComplaintDraft, ComplaintStatus, OfficerDraft, Registration, UserRole,
};
use grievance_client::config::{load_config, ClientConfig};
use grievance_client::observability::logging::init_logging;
use grievance_client::{ClientError, GrievanceClient};

#[derive(Parser)]
#[command(name = "grievance-cli")]
#[command(about = "Command-line client for the grievance portal", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides the configuration file).
    #[arg(short, long)]
    url: Option<String>,

    /// Where to keep the session token between runs.
    #[arg(short, long, default_value = ".grievance-token.json")]
    token_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service is up
    Health,
    /// Sign in and store the session token
    Login { email: String, password: String },
    /// Create an account and store the session token
    Register {
        name: String,
        email: String,
        password: String,
        #[arg(long, default_value = "citizen")]
        role: UserRole,
        #[arg(long)]
        department: Option<String>,
    },
    /// Discard the stored session token
    Logout,
    /// File a new complaint
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        location: String,
        #[arg(long = "attachment")]
        attachments: Vec<String>,
    },
    /// List complaints visible to the signed-in user
    Complaints {
        #[arg(long, default_value = "citizen")]
        role: UserRole,
        #[arg(long)]
        department: Option<String>,
    },
    /// Show a single complaint
    Show { id: String },
    /// Move a complaint to a new status
    Status { id: String, status: ComplaintStatus },
    /// Dashboard statistics
    Stats,
    /// Known departments
    Departments,
    /// All accounts (admin only)
    Users,
    /// Provision an officer account (admin only)
    CreateOfficer {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Preview how the classifier would route some text
    Classify { text: String },
    /// Notifications for the signed-in user
    Notifications,
    /// Mark a notification as read
    ReadNotification { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability.log_level);

    let client = match GrievanceClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.api.base_url = Some(url.clone());
    }
    if config.session.token_path.is_none() {
        config.session.token_path = Some(cli.token_file.clone());
    }
    Ok(config)
}

async fn run(client: &GrievanceClient, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Health => print_json(&client.health().await?),
        Commands::Login { email, password } => print_json(&client.login(&email, &password).await?),
        Commands::Register {
            name,
            email,
            password,
            role,
            department,
        } => {
            let registration = Registration {
                name,
                email,
                password,
                role,
                department,
            };
            print_json(&client.register(&registration).await?)
        }
        Commands::Logout => {
            client.logout();
            Ok(())
        }
        Commands::Submit {
            title,
            description,
            location,
            attachments,
        } => {
            let draft = ComplaintDraft {
                title,
                description,
                location,
                attachments,
            };
            print_json(&client.submit_complaint(&draft).await?)
        }
        Commands::Complaints { role, department } => {
            print_json(&client.list_complaints(role, department.as_deref()).await?)
        }
        Commands::Show { id } => print_json(&client.fetch_complaint(&id).await?),
        Commands::Status { id, status } => print_json(&client.update_status(&id, status).await?),
        Commands::Stats => print_json(&client.fetch_stats().await?),
        Commands::Departments => print_json(&client.fetch_departments().await?),
        Commands::Users => print_json(&client.list_users().await?),
        Commands::CreateOfficer {
            email,
            password,
            name,
            department,
            phone,
        } => {
            let draft = OfficerDraft {
                email,
                password,
                name,
                department,
                phone,
            };
            print_json(&client.create_officer(&draft).await?)
        }
        Commands::Classify { text } => print_json(&client.classify_text(&text).await?),
        Commands::Notifications => print_json(&client.list_notifications().await?),
        Commands::ReadNotification { id } => client.mark_notification_read(&id).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_command() {
        let cli = Cli::try_parse_from(["grievance-cli", "status", "42", "in-progress"]).unwrap();
        assert_eq!(cli.token_file, ".grievance-token.json");
        match cli.command {
            Commands::Status { id, status } => {
                assert_eq!(id, "42");
                assert_eq!(status, ComplaintStatus::InProgress);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_parse_register_officer() {
        let cli = Cli::try_parse_from([
            "grievance-cli",
            "--url",
            "http://localhost:9000/api",
            "register",
            "Ravi",
            "ravi@example.org",
            "secret123",
            "--role",
            "officer",
            "--department",
            "Water Supply",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://localhost:9000/api"));
        match cli.command {
            Commands::Register { role, department, .. } => {
                assert_eq!(role, UserRole::Officer);
                assert_eq!(department.as_deref(), Some("Water Supply"));
            }
            _ => panic!("expected register command"),
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(Cli::try_parse_from(["grievance-cli", "status", "42", "pending"]).is_err());
    }
}
