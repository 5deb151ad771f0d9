use barista::{
    api::{self, AppState},
    config::Opts,
    store::MemoryDrinkStore,
};
use barista_auth::AuthMiddleware;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let config = opts.auth_config();
    let auth = AuthMiddleware::from_config(&config)?;

    let app = api::router(AppState::new(auth, MemoryDrinkStore::new()));

    let listener = tokio::net::TcpListener::bind(opts.listen).await?;
    tracing::info!(
        addr = %opts.listen,
        issuer = %config.issuer(),
        audience = %config.audience(),
        jwks_url = %config.jwks_url(),
        "listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
