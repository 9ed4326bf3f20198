//! 请求处理器
//!
//! 代理端点的编排逻辑：校验 → 白名单 → 分类 → (缓存查询) →
//! 上游请求 → 分派（清单重写 | 流式直通 | 缓冲并按需缓存）。

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::classify::{self, Classification};
use super::error::ProxyError;
use super::rewrite;
use super::server::ProxyState;

#[derive(Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// 健康检查
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// CORS 预检直接放行，不进入代理流水线
pub async fn handle_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// 处理 `GET <proxy-path>?url=<目标>` 请求
pub async fn handle_proxy(
    State(state): State<ProxyState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let raw = query.url.ok_or(ProxyError::MissingUrl)?;
    let target = Url::parse(&raw).map_err(|_| ProxyError::BadUrl)?;
    let host = target.host_str().ok_or(ProxyError::BadUrl)?;

    // 唯一的 SSRF 防线：白名单不通过则绝不触网
    if !state.whitelist.permits(host) {
        log::warn!("[Proxy] blocked host: {host}");
        return Err(ProxyError::Blocked);
    }

    let class = classify::classify(&target);

    // 缓存查询先于 fetch；只有 API 响应可缓存
    if class == Classification::CacheableApi {
        if let Some((content_type, body)) = state.cache.get(&raw) {
            log::debug!("[Proxy] cache hit: {raw}");
            return Ok(buffered_response(StatusCode::OK, content_type, body));
        }
    }

    let range = headers.get(header::RANGE).cloned();
    let response = state.fetcher.fetch(&target, range.as_ref(), class).await?;

    // 清单：读全文、重写每个 URI 引用、统一 HLS 内容类型返回
    if class == Classification::Manifest {
        let effective_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;
        let rewritten = rewrite::rewrite_manifest(&body, &effective_url, &state.config.proxy_path)?;

        let builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, rewrite::HLS_CONTENT_TYPE);
        return Ok(builder.body(Body::from(rewritten)).unwrap());
    }

    let content_type = main_content_type(&response);

    // 流式判定：URL 分类说是流，或响应头说是流（响应头有最终话语权）
    let is_stream = class.is_streaming()
        || content_type
            .as_deref()
            .is_some_and(classify::is_streaming_content_type);
    if is_stream {
        return Ok(pipe_stream(response, class, content_type));
    }

    // 其余：缓冲整个响应，API 且 200 时写入缓存
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    if class == Classification::CacheableApi && status == StatusCode::OK {
        state.cache.put(raw, content_type.clone(), bytes.clone());
    }

    log::info!("[Proxy] ✓ {} {} bytes", status.as_u16(), bytes.len());
    Ok(buffered_response(status, content_type, bytes))
}

/// 取响应内容类型的主类型部分（去参数、转小写）
fn main_content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|v| !v.is_empty())
}

fn buffered_response(status: StatusCode, content_type: Option<String>, body: Bytes) -> Response {
    let builder = Response::builder().status(status).header(
        header::CONTENT_TYPE,
        content_type.as_deref().unwrap_or("application/octet-stream"),
    );
    builder.body(Body::from(body)).unwrap()
}

/// 流式直通：透传状态与关键响应头，响应体增量转发不落内存。
/// 客户端断开时响应体流被丢弃，上游读取随之中止；
/// 头部已发出后的读错误只能记日志并断连，状态码无法再变。
fn pipe_stream(
    response: reqwest::Response,
    class: Classification,
    content_type: Option<String>,
) -> Response {
    let mut builder = Response::builder().status(response.status());

    if let Some(ct) = &content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    if let Some(v) = response.headers().get(header::CONTENT_RANGE) {
        builder = builder.header(header::CONTENT_RANGE, v.clone());
    }
    if let Some(v) = response.headers().get(header::CONTENT_LENGTH) {
        builder = builder.header(header::CONTENT_LENGTH, v.clone());
    }
    if let Some(v) = response.headers().get(header::ACCEPT_RANGES) {
        builder = builder.header(header::ACCEPT_RANGES, v.clone());
    } else if class == Classification::Media {
        // 播放器靠 Accept-Ranges 决定能否 seek，上游漏发时补上
        builder = builder.header(header::ACCEPT_RANGES, "bytes");
    }

    let stream = response
        .bytes_stream()
        .inspect_err(|e| log::error!("[Proxy] stream error: {e}"));
    builder.body(Body::from_stream(stream)).unwrap()
}
