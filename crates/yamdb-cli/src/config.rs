use clap::{Parser, Subcommand};

use crate::commands::{create_user::CreateUserCmd, list_users::ListUsersCmd};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for yamdb - administration tasks working directly on the database of the server."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    CreateUser(CreateUserCmd),
    ListUsers(ListUsersCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::ListUsers(cmd) => cmd.run().await,
        }
    }
}
