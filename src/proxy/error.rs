//! 代理错误类型
//!
//! 每个变体对应一类对外可见的失败；除流传输中途的错误外，
//! 所有错误都以 `{"error": "<message>"}` 的 JSON 体返回。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// 请求缺少 `url` 查询参数，未触及网络
    #[error("Missing url")]
    MissingUrl,

    /// `url` 参数无法解析为带主机名的绝对 URL，未触及网络
    #[error("Bad URL")]
    BadUrl,

    /// 目标主机不在白名单内，未触及网络
    #[error("Blocked")]
    Blocked,

    /// 清单请求返回了 HTML（上游错误页），按"流已下线"处理
    #[error("Stream offline")]
    StreamOffline,

    /// 上游网络失败（超时、连接失败、读取失败），不重试
    #[error("{0}")]
    Upstream(String),
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl | ProxyError::BadUrl => StatusCode::BAD_REQUEST,
            ProxyError::Blocked => StatusCode::FORBIDDEN,
            ProxyError::StreamOffline => StatusCode::NOT_FOUND,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
