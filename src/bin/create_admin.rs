//! Creates an administrator account.
//!
//! Registration never grants the admin role, so the first back-office
//! account has to be provisioned out of band.

use anyhow::{Context, Result, bail};
use clap::Parser;
use realty::{
    config::ConfigLoader,
    db,
    models::Role,
    password::{Argon2Hasher, SecretHasher},
    repositories::{NewUser, UserRepository},
    validation::is_valid_email,
};

#[derive(Debug, Parser)]
#[command(about = "Create an administrator account")]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long, env = "REALTY_ADMIN_PASSWORD")]
    password: String,
    #[arg(long, default_value = "Admin")]
    first_name: String,
    #[arg(long, default_value = "Realty")]
    last_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    if !is_valid_email(&args.email) {
        bail!("'{}' is not a valid email address", args.email);
    }
    if args.password.chars().count() < config.min_password_length {
        bail!(
            "password must be at least {} characters",
            config.min_password_length
        );
    }

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&pool).await?;

    let password_hash = Argon2Hasher::new()
        .hash(&args.password)
        .context("hashing password")?;

    let admin = UserRepository::new(&pool)
        .create(NewUser {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: None,
            password_hash,
            role: Role::Admin,
        })
        .await
        .context("creating administrator")?;

    println!("Created administrator {} ({})", admin.email, admin.id);
    Ok(())
}
