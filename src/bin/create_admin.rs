//! Seeds a back-office admin.
//!
//! ```bash
//! create-admin --username barista --password 's3cret'
//! ```
//!
//! Reads `DATABASE_URL` from the environment (or `.env`) unless
//! `--database-url` is given. An existing username is reported and left
//! untouched.

use anyhow::{bail, Context, Result};
use caffe_storefront::auth::hash_password;
use caffe_storefront::auth::password::MIN_ADMIN_PASSWORD_LENGTH;
use caffe_storefront::db::{self, AdminRepository, RepositoryError};
use clap::Parser;
use secrecy::SecretString;

#[derive(Parser)]
#[command(name = "create-admin", version, about = "Create a storefront admin account")]
struct Args {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(short, long)]
    username: String,

    #[arg(short, long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let username = args.username.trim();
    if username.is_empty() {
        bail!("Username cannot be empty");
    }
    if args.password.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        bail!("Password must be at least {MIN_ADMIN_PASSWORD_LENGTH} characters");
    }

    let pool = db::create_pool(&SecretString::from(args.database_url)).await.context("Failed to connect to database")?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;

    let hash = hash_password(&args.password).context("Failed to hash password")?;
    match AdminRepository::new(&pool).create(username, &hash).await {
        Ok(admin) => tracing::info!(admin_id = %admin.id, username = %admin.username, "Admin created"),
        Err(RepositoryError::Conflict(_)) => tracing::warn!(username = %username, "Admin already exists, nothing to do"),
        Err(e) => return Err(e).context("Failed to create admin"),
    }
    Ok(())
}
