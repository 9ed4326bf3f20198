//! 上游请求器
//!
//! 负责向源站发起请求：注入浏览器化的请求头（很多上游要求
//! 同源形态的 Referer/Origin 才肯吐媒体），透传 Range，
//! 对 429 做有界线性退避重试。网络级失败不重试，直接上抛。

use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use reqwest::{header, Client, Response, StatusCode};
use url::Url;

use super::classify::Classification;
use super::error::ProxyError;
use crate::config::ProxyConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct OriginFetcher {
    client: Client,
    fetch_timeout: Duration,
    stream_timeout: Duration,
    retry_max: u32,
    retry_base_delay: Duration,
}

impl OriginFetcher {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        // 超时按分类逐请求设置，client 级别只管连接参数
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
            retry_max: config.retry_max,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    /// 媒体/分片用长超时（直播是长连接），其余用短超时。
    /// 超时按单次 fetch 计，清单刷新后的分片跟进是独立的预算。
    fn timeout_for(&self, class: Classification) -> Duration {
        if class.is_streaming() {
            self.stream_timeout
        } else {
            self.fetch_timeout
        }
    }

    /// 发起上游请求。重定向默认跟随，调用方用 `Response::url()`
    /// 拿生效 URL 作为清单内相对引用的解析基准。
    pub async fn fetch(
        &self,
        target: &Url,
        range: Option<&HeaderValue>,
        class: Classification,
    ) -> Result<Response, ProxyError> {
        let origin = target.origin().ascii_serialization();
        let timeout = self.timeout_for(class);
        let mut attempt: u32 = 0;

        loop {
            let mut request = self
                .client
                .get(target.clone())
                .timeout(timeout)
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, "*/*")
                .header(header::REFERER, format!("{origin}/"))
                .header(header::ORIGIN, origin.as_str());

            if let Some(range) = range {
                request = request.header(header::RANGE, range.clone());
            }

            let response = request.send().await.map_err(|e| {
                log::error!("[Proxy] ✗ upstream fetch failed: {e}");
                ProxyError::Upstream(e.to_string())
            })?;

            // 只对 429 重试；预算耗尽后原样返回最终状态
            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= self.retry_max {
                return Ok(response);
            }

            attempt += 1;
            let wait = self.retry_base_delay * attempt;
            log::warn!(
                "[Proxy] upstream 429 for {}, retry {attempt}/{} in {}ms",
                target.host_str().unwrap_or("?"),
                self.retry_max,
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }
    }
}
