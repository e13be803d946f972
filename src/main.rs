use staylink::{app, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("staylink=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    let config = app_state.config.clone();

    let router = app::build_app(app_state.clone());
    let served = app::serve(router, &config).await;

    app_state.close().await;
    tracing::info!("database pool closed");
    served
}
