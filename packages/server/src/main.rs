use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use server::{app, models::config::ServerConfig, utils::logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    let dotenv_result = dotenv();

    let config = ServerConfig::from_env();
    logging::init_logging(config.verbose_logging);
    if let Err(e) = dotenv_result {
        warn!(".envファイルの読み込みに失敗しました: {}", e);
    }

    // CORSレイヤーの設定
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS_ORIGIN {}", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    // ルーティングの設定
    let addr = config.bind_addr;
    let app = app::create_app_with_config(config)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http() // HTTPトレースログを有効化
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "HTTP request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
        );

    // サーバーの起動
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("サーバーを起動しました: http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
