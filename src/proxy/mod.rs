//! 代理服务器模块
//!
//! 提供 CORS 透明的流媒体反向代理：白名单校验、请求分类、
//! 带 TTL 的 API 响应缓存、429 重试、M3U8 清单重写与大流量直通。

pub mod cache;
pub mod classify;
pub mod error;
pub mod fetcher;
mod handlers;
pub mod rewrite;
pub mod server;
pub mod whitelist;

pub use error::ProxyError;
pub use server::{build_router, run_server, ProxyState};
