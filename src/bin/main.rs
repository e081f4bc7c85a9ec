use anyhow::Result;
use bookshelf_auth::auth::hash_password;
use bookshelf_auth::store::{NewUser, RoleStore, UserStore};
use bookshelf_auth::types::DEFAULT_ROLE;
use bookshelf_auth::{
    AppConfig, DatabaseConfig, SurrealRoleStore, SurrealUserStore, create_app_state,
    create_connection, create_router, ensure_schema,
};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookshelf-auth")]
#[command(about = "Bookshelf authentication service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the auth REST server
    Server {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Database url (overrides the config file)
        #[arg(long)]
        db_url: Option<String>,
        /// Session token secret (overrides the config file)
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,
    },
    /// Initialize the database schema and built-in roles
    Init {
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Create a local account that logs in with a password
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
        #[arg(long)]
        db_url: Option<String>,
    },
}

fn database_config(config: &AppConfig, db_url: Option<String>) -> DatabaseConfig {
    let mut db_config = config.database.clone();
    if let Some(url) = db_url {
        db_config.url = url;
    }
    db_config
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("bookshelf_auth=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load()?;

    match cli.command {
        Commands::Server {
            bind,
            db_url,
            jwt_secret,
        } => {
            if let Some(secret) = jwt_secret {
                config.jwt.secret = secret;
            }
            config.database = database_config(&config, db_url);
            info!("Using database url for auth server: {}", config.database.url);

            let state = create_app_state(&config).await?;
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Auth server listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = database_config(&config, db_url);
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = create_connection(db_config).await?;
            ensure_schema(&db).await?;
            SurrealRoleStore::new(db).ensure_default_roles().await?;
            info!("Database initialized successfully");
        }
        Commands::CreateUser {
            username,
            password,
            first_name,
            last_name,
            role,
            db_url,
        } => {
            let db = create_connection(database_config(&config, db_url)).await?;
            ensure_schema(&db).await?;

            let roles = SurrealRoleStore::new(db.clone());
            roles.ensure_default_roles().await?;
            let role_id = roles.find_id_by_name(&role).await?;

            let users = SurrealUserStore::new(db);
            let user = users
                .create(NewUser {
                    username: username.into(),
                    password: hash_password(&password)?,
                    first_name,
                    last_name,
                    avatar: None,
                    enabled: true,
                    role_id,
                })
                .await?;

            println!("User created successfully!");
            println!();
            println!("  Id:       {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Role:     {}", role);
        }
    }

    Ok(())
}
