use std::sync::Arc;

use anyhow::Context;
use roster_config::{get_log_path, Config};
use roster_core::{
    builtin_users, load_seed_file, merge_seed, InMemoryUserRepository, UserServiceImpl,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;
mod profiling;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        std::fs::create_dir_all(log_dir)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.daemon.log_level)
            .with_context(|| format!("invalid log_level {:?}", config.daemon.log_level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let mut seed_sources = Vec::new();
    if config.store.builtin_seed {
        seed_sources.push(builtin_users());
    }
    if let Some(seed_path) = config.seed_file_path() {
        let users = load_seed_file(&seed_path)
            .with_context(|| format!("loading seed file {}", seed_path.display()))?;
        info!("Loaded {} users from {}", users.len(), seed_path.display());
        seed_sources.push(users);
    }
    let seed = merge_seed(seed_sources);
    info!("Seeding store with {} users", seed.len());

    let repo = InMemoryUserRepository::with_users(seed);
    let service = Arc::new(UserServiceImpl::new(repo));

    let daemon = server::DaemonServer::new(&config, service);

    info!("Starting roster daemon");
    daemon.run().await?;

    Ok(())
}
