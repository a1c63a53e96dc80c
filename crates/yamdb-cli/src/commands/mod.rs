pub mod create_user;
pub mod list_users;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

async fn open_pool(backend: &yamdb_types::config::BackendConfig) -> anyhow::Result<yamdb_dal::Pool> {
    tokio::fs::create_dir_all(backend.data_dir()).await?;
    let pool = yamdb_dal::new_pool(&backend.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;
    Ok(pool)
}
