use anyhow::Result;

use crate::{commands::Executor as _, config::CliConfig};

pub async fn run(config: CliConfig) -> Result<()> {
    config.command.run().await
}
