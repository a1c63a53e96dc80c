use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use yamdb_auth::code::ConfirmationCode;
use yamdb_dal::user::{NewUser, UserRepository};
use yamdb_types::{
    claim::Role,
    config::BackendConfig,
    general::{validate_username, ValidEmail},
};

use crate::commands::{open_pool, Executor};

/// Creates a pending user and prints its confirmation code, the code is
/// exchanged for a token at `POST /api/v1/auth/token`
#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "Username")]
    username: String,
    #[arg(short, long, help = "User email")]
    email: ValidEmail,
    #[arg(short, long, default_value = "user", help = "Role of the user: user, moderator or admin")]
    role: Role,
    #[arg(long, help = "Superuser has administrator access regardless of role")]
    superuser: bool,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        validate_username(&self.username, &()).map_err(|e| anyhow!("Invalid username: {e}"))?;

        let pool = open_pool(&self.backend).await?;
        let repository = UserRepository::new(pool);
        let mut new_user = NewUser::new(self.username, self.email).with_role(self.role);
        new_user.is_superuser = self.superuser;

        let code = ConfirmationCode::generate();
        let user = repository
            .register(new_user, code.as_ref(), |_user| async {
                Ok::<_, std::io::Error>(())
            })
            .await?;
        info!("Created user {} with role {}", user.username, user.role);
        println!("{}", code.as_ref());

        Ok(())
    }
}
