//! 上游主机白名单（SSRF 防线）
//!
//! 任何网络访问之前必须通过此校验，包括清单重写后回流的分片子请求。
//! 匹配规则：完全相等或 `.域名` 后缀匹配；字面 IPv4 地址始终放行，
//! 以兼容按 IP 下发的 CDN 源站。

use std::net::Ipv4Addr;

/// 不可变的域名允许列表，启动后只读，无需同步原语。
#[derive(Debug, Clone)]
pub struct AllowList {
    domains: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// 判断主机名是否允许访问
    pub fn permits(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if host.parse::<Ipv4Addr>().is_ok() {
            return true;
        }
        self.domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }
}
