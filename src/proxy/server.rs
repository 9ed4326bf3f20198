//! 代理服务器
//!
//! 组装共享状态与 axum 路由，启动监听。
//! 所有请求任务只共享 `ResponseCache` 与 `AllowList`；
//! 后者启动后只读，前者内部自带锁。

use std::sync::Arc;

use anyhow::Context;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::cache::ResponseCache;
use super::fetcher::OriginFetcher;
use super::handlers;
use super::whitelist::AllowList;
use crate::config::ProxyConfig;

/// 全部请求处理器共享的进程级状态
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<ProxyConfig>,
    pub whitelist: Arc<AllowList>,
    pub cache: Arc<ResponseCache>,
    pub fetcher: Arc<OriginFetcher>,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let whitelist = AllowList::new(&config.allowed_hosts);
        let cache = ResponseCache::from_config(&config);
        let fetcher = OriginFetcher::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            whitelist: Arc::new(whitelist),
            cache: Arc::new(cache),
            fetcher: Arc::new(fetcher),
        })
    }
}

/// 构建路由。浏览器跨域访问依赖这里的 CORS 头；
/// 预检 OPTIONS 由专门的处理器直接返回 204。
pub fn build_router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    let proxy_path = state.config.proxy_path.clone();

    Router::new()
        .route(
            &proxy_path,
            get(handlers::handle_proxy).options(handlers::handle_preflight),
        )
        .route("/health", get(handlers::health_check))
        .layer(cors)
        .with_state(state)
}

/// 绑定监听地址并运行服务直到退出
pub async fn run_server(config: ProxyConfig) -> anyhow::Result<()> {
    let listen_addr = config.listen_addr;
    let state = ProxyState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    log::info!("[Proxy] listening on {listen_addr}");

    axum::serve(listener, app)
        .await
        .context("proxy server exited")
}
