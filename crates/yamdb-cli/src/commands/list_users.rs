use clap::Parser;
use yamdb_dal::{user::UserRepository, ListingParams, MAX_LIMIT};
use yamdb_types::config::BackendConfig;

use crate::commands::{open_pool, Executor};

/// Prints users as tab separated username, email and role
#[derive(Parser, Debug)]
pub struct ListUsersCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "Show only user with this exact username")]
    search: Option<String>,
}

impl Executor for ListUsersCmd {
    async fn run(self) -> anyhow::Result<()> {
        let pool = open_pool(&self.backend).await?;
        let repository = UserRepository::new(pool);
        let mut offset = 0;
        loop {
            let batch = repository
                .list(ListingParams::new(offset, MAX_LIMIT as i64), self.search.as_deref())
                .await?;
            for user in &batch.rows {
                println!("{}\t{}\t{}", user.username, user.email, user.role);
            }
            offset += batch.rows.len() as i64;
            if batch.rows.is_empty() || offset as u64 >= batch.total {
                break;
            }
        }
        Ok(())
    }
}
