//! Console front-end for the sakay ride-hailing backend: one subcommand per
//! user-facing flow, wired to the shared application core.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::features::login::{login_as, LoginDestination, LoginOutcome};
use app::features::registration::{
    ClientBackend, DocumentKind, RegistrationForm, RegistrationOrchestrator, RegistrationReport,
};
use app::services::client::{
    BackendClient, CredentialService, DocumentSource, SessionCache, SessionStore, UserRole,
};
use app::services::config::AppConfig;
use app::services::errors::RegistrationError;

#[derive(Parser)]
#[command(name = "sakay")]
#[command(about = "Passenger and driver registration/login console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a passenger account with an identity photo
    RegisterPassenger {
        #[command(flatten)]
        common: CommonFields,

        /// Path to the valid ID photo
        #[arg(long)]
        valid_id: PathBuf,
    },
    /// Register a driver account with vehicle documents
    RegisterDriver {
        #[command(flatten)]
        common: CommonFields,

        #[arg(long)]
        license_number: String,
        #[arg(long)]
        plate_number: String,
        #[arg(long)]
        vehicle_model: String,

        /// Path to the vehicle photo
        #[arg(long)]
        vehicle_image: PathBuf,
        /// Path to the certificate of registration photo
        #[arg(long)]
        certificate_of_registration: PathBuf,
        /// Path to the driver's license photo
        #[arg(long)]
        drivers_license: PathBuf,
    },
    /// Sign in with a role-scoped login
    Login {
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out of the current session
    Logout,
    /// Show who is currently signed in
    Whoami,
    /// Redeem an email verification token
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        token: String,
    },
}

#[derive(Args)]
struct CommonFields {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Defaults to the password when omitted
    #[arg(long)]
    confirm_password: Option<String>,
    #[arg(long)]
    first_name: String,
    #[arg(long, default_value = "")]
    middle_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    contact_no: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Passenger,
    Driver,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Passenger => UserRole::Passenger,
            RoleArg::Driver => UserRole::Driver,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env();
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("config: {}", error);
        }
        bail!("invalid configuration");
    }
    info!("Backend configured at {}", config.backend.base_url);

    let client = BackendClient::new(config.backend.clone());
    let mut credentials = CredentialService::new(client.clone(), SessionStore::new());
    if let Some(path) = &config.session_cache_path {
        credentials = credentials.with_cache(SessionCache::new(path));
    }

    match cli.command {
        Commands::RegisterPassenger { common, valid_id } => {
            let mut form = form_from(UserRole::Passenger, common);
            form.attach_document(DocumentKind::ValidId, read_document(&valid_id)?);
            run_registration(&client, &config, form).await
        }
        Commands::RegisterDriver {
            common,
            license_number,
            plate_number,
            vehicle_model,
            vehicle_image,
            certificate_of_registration,
            drivers_license,
        } => {
            let mut form = form_from(UserRole::Driver, common);
            form.license_number = license_number;
            form.plate_number = plate_number;
            form.vehicle_model = vehicle_model;
            form.attach_document(DocumentKind::VehiclePhoto, read_document(&vehicle_image)?);
            form.attach_document(
                DocumentKind::RegistrationCertificate,
                read_document(&certificate_of_registration)?,
            );
            form.attach_document(DocumentKind::DriversLicense, read_document(&drivers_license)?);
            run_registration(&client, &config, form).await
        }
        Commands::Login {
            role,
            email,
            password,
        } => {
            match login_as(&credentials, role.into(), &email, &password).await? {
                LoginOutcome::SignedIn {
                    destination,
                    session,
                } => {
                    println!("Welcome back, {}!", session.profile.first_name);
                    match destination {
                        LoginDestination::PassengerHome => println!("Opening the passenger home."),
                        LoginDestination::DriverHome => println!("Opening the driver home."),
                    }
                }
                LoginOutcome::RoleMismatch { actual, .. } => {
                    println!(
                        "You are registered as a {}. Please use the {} login.",
                        actual, actual
                    );
                }
            }
            Ok(())
        }
        Commands::Logout => {
            credentials.current_session().await?;
            credentials.end_session().await?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            match credentials.current_session().await? {
                Some(session) => {
                    println!(
                        "{} {} <{}> ({})",
                        session.profile.first_name,
                        session.profile.last_name,
                        session.account.email,
                        session.profile.user_type
                    );
                }
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Verify { email, token } => {
            if credentials.confirm_email(&email, &token).await? {
                println!("Your account has been successfully verified!");
                Ok(())
            } else {
                bail!("verification failed: the link is invalid or expired");
            }
        }
    }
}

fn form_from(role: UserRole, common: CommonFields) -> RegistrationForm {
    let mut form = RegistrationForm::new(role);
    form.email = common.email;
    form.confirm_password = common
        .confirm_password
        .unwrap_or_else(|| common.password.clone());
    form.password = common.password;
    form.first_name = common.first_name;
    form.middle_name = common.middle_name;
    form.last_name = common.last_name;
    form.contact_no = common.contact_no;
    form
}

fn read_document(path: &Path) -> Result<DocumentSource> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read document {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.jpeg")
        .to_string();
    Ok(DocumentSource::new(file_name, bytes))
}

async fn run_registration(
    client: &BackendClient,
    config: &AppConfig,
    form: RegistrationForm,
) -> Result<()> {
    let backend = ClientBackend::new(client.clone());
    let orchestrator =
        RegistrationOrchestrator::new(&backend, &config.buckets, &config.provisioning);

    match orchestrator.run(&form).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(RegistrationError::Validation { field_errors }) => {
            eprintln!("Please fill in all required fields correctly:");
            for (field, message) in &field_errors {
                eprintln!("  {}: {}", field, message);
            }
            bail!("registration blocked by validation");
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &RegistrationReport) {
    println!("Registration successful! Account id: {}", report.account_id);
    if report.pending_verification {
        println!("Please check your email for verification.");
    }
    if !report.profile_provisioned {
        println!("Note: the profile record was still being provisioned when documents were recorded.");
    }
    for (kind, url) in &report.document_urls {
        println!("  {}: {}", kind, url);
    }
    for warning in &report.document_warnings {
        println!(
            "Warning: the {} upload failed, you can update it in your profile: {}",
            warning.kind, warning.message
        );
    }
    if let Some(warning) = &report.profile_warning {
        println!(
            "Warning: documents uploaded but the profile update failed: {}",
            warning
        );
    }
}
