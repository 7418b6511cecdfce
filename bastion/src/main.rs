use bastion::{
    DefaultPasswordPolicy, JwtConfig, PasswordPolicy, RepositoryProvider, Role, SecurityConfig,
    SqliteCredentialStore, SqliteRepositoryProvider,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Administration tool for a bastion database
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "BASTION_DATABASE_URL", default_value = "sqlite://bastion.db?mode=rwc")]
    db_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Provision an account in the SQLite credential store
    CreateAccount {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BASTION_NEW_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
        /// student, teacher, expert or admin
        #[arg(long, default_value = "student")]
        role: Role,
        /// Mark the email address as already verified
        #[arg(long)]
        verified: bool,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let pool = bastion_storage_sqlite::connect(&cli.db_url).await?;
            SqliteRepositoryProvider::new(pool).migrate().await?;
            println!("Done.");
        }
        Commands::CreateAccount {
            username,
            email,
            password,
            role,
            verified,
        } => {
            DefaultPasswordPolicy::default().check(&password, Some(&username))?;

            let pool = bastion_storage_sqlite::connect(&cli.db_url).await?;
            let config = SecurityConfig::from_env()?;
            let store = SqliteCredentialStore::new(pool, JwtConfig::from_env()?, config.session);

            let account = store
                .create_account(&username, &email, &password, role, verified)
                .await?;
            println!("Created account {} ({})", account.username, account.id);
        }
        Commands::Version => {
            println!("bastion v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
