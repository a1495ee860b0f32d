use gantry_server::app::build_app;
use gantry_server::config::ServerConfig;
use gantry_server::context::AppContext;

#[tokio::main]
async fn main() {
    gantry_server::init_tracing();

    let config = ServerConfig::from_env();

    let ctx = AppContext::connect(&config)
        .await
        .expect("failed to connect to broker and cache");
    ctx.spawn_poppers(&config);

    let app = build_app(ctx);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
