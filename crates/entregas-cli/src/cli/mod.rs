//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use entregas_core::auth::{AuthSession, RestoreOutcome, SessionSettings};
use entregas_core::config;
use entregas_core::reports::Period;
use entregas_core::{ApiClient, TokenStore, logging};

mod commands;

#[derive(Parser)]
#[command(name = "entregas")]
#[command(version)]
#[command(about = "Track deliveries, earnings and expenses from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in (prompts for the password and, if required, an email code)
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "ENTREGAS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Re-fetch the profile from the backend
        #[arg(long)]
        refresh: bool,
    },
    /// Create an account
    Register(RegisterArgs),
    /// Confirm a registration with the emailed code
    VerifyEmail {
        #[arg(long)]
        email: String,
        /// Six-digit code (prompted if omitted)
        #[arg(long)]
        code: Option<String>,
    },
    /// Ask for a new registration code
    ResendCode {
        #[arg(long)]
        email: String,
    },
    /// Manage the profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Manage the password
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },
    /// Manage two-factor authentication
    TwoFactor {
        #[command(subcommand)]
        command: TwoFactorCommands,
    },
    /// Manage vehicles
    Vehicles {
        #[command(subcommand)]
        command: VehicleCommands,
    },
    /// Manage work days
    Work {
        #[command(subcommand)]
        command: WorkCommands,
    },
    /// Manage expenses
    Expenses {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    /// Manage expense categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Summarize earnings and expenses
    Report {
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
        /// Show the backend's report instead of computing it locally
        #[arg(long)]
        remote: bool,
    },
    /// Show account statistics and dashboard data
    Dashboard,
    /// Community posts and vehicle ads
    Community {
        #[command(subcommand)]
        command: CommunityCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub cpf: Option<String>,
    #[arg(long, env = "ENTREGAS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Update profile fields; omitted fields are left unchanged
    Update(ProfileArgs),
}

#[derive(clap::Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub cpf: Option<String>,
    #[arg(long)]
    pub cep: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
}

#[derive(clap::Subcommand)]
enum PasswordCommands {
    /// Change the password (prompts for missing values)
    Change {
        #[arg(long)]
        current: Option<String>,
        #[arg(long = "new")]
        new_password: Option<String>,
    },
    /// Email password reset instructions (no sign-in needed)
    Reset {
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum TwoFactorCommands {
    /// Show whether two-factor authentication is on
    Status,
    /// Email an activation code
    Setup,
    /// Turn two-factor authentication on with the emailed code
    Enable {
        #[arg(long)]
        code: String,
    },
    /// Turn two-factor authentication off
    Disable {
        #[arg(long, env = "ENTREGAS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        code: String,
    },
}

#[derive(clap::Subcommand)]
enum VehicleCommands {
    List,
    Add(VehicleArgs),
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(clap::Args)]
pub struct VehicleArgs {
    /// carro or moto
    #[arg(long)]
    pub kind: String,
    #[arg(long)]
    pub model: String,
    #[arg(long)]
    pub plate: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    pub km_per_liter: f64,
}

#[derive(clap::Subcommand)]
enum WorkCommands {
    List,
    Add(WorkArgs),
    /// Replace a work day
    Update {
        #[arg(value_name = "ID")]
        id: i64,
        #[command(flatten)]
        args: WorkArgs,
    },
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(clap::Args)]
pub struct WorkArgs {
    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,
    /// HH:MM
    #[arg(long)]
    pub start: String,
    /// HH:MM
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub delivered: u32,
    #[arg(long, default_value_t = 0)]
    pub not_delivered: u32,
    #[arg(long)]
    pub payment_type: String,
    #[arg(long)]
    pub value: f64,
}

#[derive(clap::Subcommand)]
enum ExpenseCommands {
    List,
    Add(ExpenseArgs),
    /// Replace an expense
    Update {
        #[arg(value_name = "ID")]
        id: i64,
        #[command(flatten)]
        args: ExpenseArgs,
    },
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(clap::Args)]
pub struct ExpenseArgs {
    /// alimentacao, combustivel, manutencao, pedagio, estacionamento, seguro,
    /// licenciamento or outros
    #[arg(long)]
    pub kind: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub value: f64,
    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(clap::Subcommand)]
enum CategoryCommands {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum CommunityCommands {
    /// Show posts and vehicle ads
    Feed,
    /// Publish a post (shown after moderation)
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Defaults to the signed-in user's name
        #[arg(long)]
        author: Option<String>,
    },
    /// Advertise a vehicle
    Ad(AdArgs),
}

#[derive(clap::Args)]
pub struct AdArgs {
    #[arg(long)]
    pub model: String,
    #[arg(long)]
    pub year: u32,
    #[arg(long)]
    pub mileage: u32,
    #[arg(long)]
    pub price: f64,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub link: Option<String>,
    /// Image file attached to the ad
    #[arg(long)]
    pub photo: Option<std::path::PathBuf>,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Save the backend base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Week,
    Month,
    Year,
    All,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
            PeriodArg::Year => Period::Year,
            PeriodArg::All => Period::All,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands run before anything touches the session.
    let command = match cli.command {
        Commands::Config { command } => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path();
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(),
                ConfigCommands::Generate => commands::config::generate(),
                ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
            };
        }
        command => command,
    };

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    let store = TokenStore::open_default();
    let api = ApiClient::from_config(&config, store)?;
    let session = AuthSession::new(api, SessionSettings::from_config(&config));

    if session.restore(Utc::now()) == RestoreOutcome::Expired {
        tracing::info!("stored session expired");
    }
    session.lifecycle().record_foreground();

    let result = rt.block_on(dispatch(command, &session));

    session.lifecycle().record_background(Utc::now());
    result
}

async fn dispatch(command: Commands, session: &AuthSession) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            commands::auth::login(session, email, password).await
        }
        Commands::Logout => {
            commands::auth::logout(session);
            Ok(())
        }
        Commands::Whoami { refresh } => commands::auth::whoami(session, refresh).await,
        Commands::Register(args) => commands::auth::register(session, args).await,
        Commands::VerifyEmail { email, code } => {
            commands::auth::verify_email(session, email, code).await
        }
        Commands::ResendCode { email } => commands::auth::resend_code(session, email).await,

        Commands::Profile { command } => match command {
            ProfileCommands::Update(args) => commands::account::update_profile(session, args).await,
        },
        Commands::Password { command } => match command {
            PasswordCommands::Change {
                current,
                new_password,
            } => commands::account::change_password(session, current, new_password).await,
            PasswordCommands::Reset { email } => {
                commands::account::reset_password(session, email).await
            }
        },
        Commands::TwoFactor { command } => match command {
            TwoFactorCommands::Status => commands::account::two_factor_status(session).await,
            TwoFactorCommands::Setup => commands::account::two_factor_setup(session).await,
            TwoFactorCommands::Enable { code } => {
                commands::account::two_factor_enable(session, &code).await
            }
            TwoFactorCommands::Disable { password, code } => {
                commands::account::two_factor_disable(session, password, &code).await
            }
        },

        Commands::Vehicles { command } => match command {
            VehicleCommands::List => commands::vehicles::list(session).await,
            VehicleCommands::Add(args) => commands::vehicles::add(session, args).await,
            VehicleCommands::Remove { id } => commands::vehicles::remove(session, id).await,
        },
        Commands::Work { command } => match command {
            WorkCommands::List => commands::records::list_work(session).await,
            WorkCommands::Add(args) => commands::records::add_work(session, None, args).await,
            WorkCommands::Update { id, args } => {
                commands::records::add_work(session, Some(id), args).await
            }
            WorkCommands::Remove { id } => commands::records::remove_work(session, id).await,
        },
        Commands::Expenses { command } => match command {
            ExpenseCommands::List => commands::records::list_expenses(session).await,
            ExpenseCommands::Add(args) => {
                commands::records::add_expense(session, None, args).await
            }
            ExpenseCommands::Update { id, args } => {
                commands::records::add_expense(session, Some(id), args).await
            }
            ExpenseCommands::Remove { id } => {
                commands::records::remove_expense(session, id).await
            }
        },
        Commands::Categories { command } => match command {
            CategoryCommands::List => commands::records::list_categories(session).await,
            CategoryCommands::Add { name, description } => {
                commands::records::add_category(session, &name, description.as_deref()).await
            }
            CategoryCommands::Remove { id } => {
                commands::records::remove_category(session, id).await
            }
        },

        Commands::Report { period, remote } => {
            commands::report::report(session, period, remote).await
        }
        Commands::Dashboard => commands::report::dashboard(session).await,

        Commands::Community { command } => match command {
            CommunityCommands::Feed => commands::community::feed(session).await,
            CommunityCommands::Post {
                title,
                content,
                author,
            } => commands::community::post(session, title, content, author).await,
            CommunityCommands::Ad(args) => commands::community::ad(session, args).await,
        },

        Commands::Config { .. } => anyhow::bail!("config commands run without a session"),
    }
}
