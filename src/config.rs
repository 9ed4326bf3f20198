//! 服务配置
//!
//! 从环境变量读取代理配置，所有项都有默认值。
//! 缓存 TTL、重试退避等常量是策略选择而非协议约定，因此全部可调。

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// 默认允许的上游域名（部署方可通过 `STREAMGATE_ALLOWED_HOSTS` 覆盖）
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "anax3.ca",
    "oneplaytop.com.br",
    "image.tmdb.org",
    "images.tmdb.org",
    "api.ipify.org",
];

/// 代理服务配置
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// 监听地址（端口取自 `PORT`，默认 3000）
    pub listen_addr: SocketAddr,
    /// 代理端点路径，重写后的清单行也指向该路径
    pub proxy_path: String,
    /// 上游域名白名单（字面 IPv4 地址始终允许）
    pub allowed_hosts: Vec<String>,
    /// 缓存最大条目数，超出时淘汰最早插入的条目
    pub cache_max_entries: usize,
    /// 清单类 URL 的缓存 TTL（秒），上游令牌过期快，须保持较短
    pub cache_ttl_manifest_secs: u64,
    /// 元数据/API URL 的缓存 TTL（秒）
    pub cache_ttl_metadata_secs: u64,
    /// API/清单类请求的上游超时（秒）
    pub fetch_timeout_secs: u64,
    /// 媒体/分片类请求的上游超时（秒），直播连接是长连接
    pub stream_timeout_secs: u64,
    /// 上游 429 时的最大额外重试次数
    pub retry_max: u32,
    /// 重试退避基数（毫秒），第 n 次重试等待 n 倍基数
    pub retry_base_delay_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000),
            proxy_path: "/proxy".to_string(),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            cache_max_entries: 1000,
            cache_ttl_manifest_secs: 120,
            cache_ttl_metadata_secs: 3600,
            fetch_timeout_secs: 30,
            stream_timeout_secs: 3600,
            retry_max: 2,
            retry_base_delay_ms: 2000,
        }
    }
}

impl ProxyConfig {
    /// 从环境变量加载配置，缺失或非法的值回退到默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT", defaults.listen_addr.port());
        let allowed_hosts = std::env::var("STREAMGATE_ALLOWED_HOSTS")
            .ok()
            .map(|raw| parse_host_list(&raw))
            .filter(|hosts| !hosts.is_empty())
            .unwrap_or(defaults.allowed_hosts);

        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            proxy_path: std::env::var("STREAMGATE_PROXY_PATH").unwrap_or(defaults.proxy_path),
            allowed_hosts,
            cache_max_entries: env_parse("STREAMGATE_CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_ttl_manifest_secs: env_parse(
                "STREAMGATE_CACHE_TTL_MANIFEST_SECS",
                defaults.cache_ttl_manifest_secs,
            ),
            cache_ttl_metadata_secs: env_parse(
                "STREAMGATE_CACHE_TTL_METADATA_SECS",
                defaults.cache_ttl_metadata_secs,
            ),
            fetch_timeout_secs: env_parse("STREAMGATE_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            stream_timeout_secs: env_parse(
                "STREAMGATE_STREAM_TIMEOUT_SECS",
                defaults.stream_timeout_secs,
            ),
            retry_max: env_parse("STREAMGATE_RETRY_MAX", defaults.retry_max),
            retry_base_delay_ms: env_parse(
                "STREAMGATE_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            ),
        }
    }
}

/// 解析逗号分隔的域名列表
fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 读取并解析环境变量，失败时记录警告并返回默认值
fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("[Config] invalid value for {key}: {raw:?}, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_consistent() {
        let config = ProxyConfig::default();
        // 清单 TTL 必须短于元数据 TTL（令牌过期快）
        assert!(config.cache_ttl_manifest_secs < config.cache_ttl_metadata_secs);
        // 流超时必须远大于 API 超时
        assert!(config.stream_timeout_secs > config.fetch_timeout_secs);
        assert_eq!(config.proxy_path, "/proxy");
        assert_eq!(config.retry_max, 2);
    }

    #[test]
    fn test_parse_host_list() {
        let hosts = parse_host_list("a.com, b.org ,,c.net");
        assert_eq!(hosts, vec!["a.com", "b.org", "c.net"]);
        assert!(parse_host_list("  ").is_empty());
    }
}
