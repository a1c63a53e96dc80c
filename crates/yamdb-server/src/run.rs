use std::{path::Path, sync::Arc};

use axum::{
    extract::Request, http::StatusCode, middleware, response::IntoResponse, routing::get, Router,
    ServiceExt,
};
use futures::FutureExt as _;
use tokio::{fs, io::AsyncWriteExt as _};
use tower::Layer as _;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer, trace::TraceLayer};
use tracing::{debug, info};
use yamdb_app::{
    auth::token::authenticate,
    rest_api::api_router,
    state::{AppConfig, AppState},
};
use yamdb_auth::{
    mail::{FileMailer, LogMailer, Mailer},
    token::TokenManager,
};

use crate::{
    config::{MailBackend, ServerConfig},
    error::{Error, Result},
};

const SECRET_SIZE: usize = 64;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut router = main_router(state);

    if args.cors {
        router = router.layer(CorsLayer::very_permissive());
    }
    // Applied outside of the router, so it runs before routing
    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    let api = api_router().layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let mailer: Arc<dyn Mailer> = match config.mail_backend {
        MailBackend::File => {
            let dir = config.mail_dir();
            info!("Confirmation emails are stored in {}", dir.display());
            Arc::new(FileMailer::new(dir))
        }
        MailBackend::Log => Arc::new(LogMailer),
    };
    build_state_with_mailer(config, mailer).await
}

pub async fn build_state_with_mailer(
    config: &ServerConfig,
    mailer: Arc<dyn Mailer>,
) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !fs::try_exists(&data_dir).await? {
        fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    } else if !data_dir.is_dir() {
        return Err(Error::Io(std::io::Error::other(format!(
            "Data directory {} is not a directory",
            data_dir.display()
        ))));
    }

    let pool = yamdb_dal::new_pool(&config.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;
    debug!("Database {} ready", config.database_url());

    let secret = read_secret(&data_dir).await?;
    if secret.len() != SECRET_SIZE {
        return Err(Error::InvalidSecret(format!(
            "expected {SECRET_SIZE} bytes, found {}",
            secret.len()
        )));
    }
    let tokens = TokenManager::new(&secret, config.token_validity);

    Ok(AppState::new(AppConfig::from(config), pool, tokens, mailer))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; SECRET_SIZE]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Readable by the current user only
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        file.flush().await?;
        info!("Generated new token secret");
        random_bytes.to_vec()
    };
    Ok(secret)
}
