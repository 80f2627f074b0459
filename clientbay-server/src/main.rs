use clientbay_core::db;
use clientbay_server::config::ServerConfig;
use clientbay_server::identity::JwtKeys;
use clientbay_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let pool = db::connect(&config.database_url)
        .await
        .expect("failed to open database");
    db::migrate(&pool).await.expect("failed to run migrations");

    let state = AppState::new(pool, JwtKeys::new(&config.jwt_secret));
    let app = clientbay_server::app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
