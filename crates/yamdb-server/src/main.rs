use tracing_subscriber::EnvFilter;
use yamdb_server::{
    config::{Parser as _, ServerConfig},
    run::run,
    Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = ServerConfig::parse();
    run(args).await
}
