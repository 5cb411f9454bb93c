use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use storefront_api::{AuthConfig, DatabaseConfig, Environment, SessionMode, build_app};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storefront-api")]
#[command(about = "E-commerce REST API with cookie or bearer sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Server {
        /// Bind address, e.g. 0.0.0.0:3375
        #[arg(long, default_value = "0.0.0.0:3375", env = "SERVER_BIND")]
        bind: String,
        #[arg(long, default_value = "memory")]
        db_url: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Initialize the database
    Init {
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
}

#[derive(Args)]
struct AuthArgs {
    /// Shared HS256 secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    /// Cookie signing key material (defaults to the JWT secret)
    #[arg(long, env = "COOKIE_SECRET", hide_env_values = true)]
    cookie_secret: Option<String>,
    /// Session lifetime in seconds
    #[arg(long, env = "JWT_LIFETIME_SECS", default_value_t = storefront_api::auth::config::DEFAULT_TOKEN_LIFETIME_SECS)]
    jwt_lifetime_secs: u64,
    /// development or production
    #[arg(long, env = "APP_ENV", default_value = "development")]
    environment: String,
    /// cookie or bearer
    #[arg(long, env = "SESSION_MODE", default_value = "cookie")]
    session_mode: String,
    #[arg(long, env = "BCRYPT_COST", default_value_t = storefront_api::auth::password::DEFAULT_BCRYPT_COST)]
    bcrypt_cost: u32,
}

impl AuthArgs {
    fn into_config(self) -> Result<AuthConfig> {
        Ok(AuthConfig {
            jwt_secret: self.jwt_secret,
            cookie_secret: self.cookie_secret,
            token_lifetime_secs: self.jwt_lifetime_secs,
            environment: self.environment.parse::<Environment>()?,
            session_mode: self.session_mode.parse::<SessionMode>()?,
            bcrypt_cost: self.bcrypt_cost,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("storefront_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { bind, db_url, auth } => {
            let auth_config = auth.into_config()?;
            info!("Auth configuration: {:?}", auth_config);

            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for REST server: {}", db_config.url);

            let app = build_app(db_config, &auth_config).await?;

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Server listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = storefront_api::create_connection(db_config).await?;
            storefront_api::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}
