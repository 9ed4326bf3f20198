//! M3U8 清单重写
//!
//! 把清单里的每个 URI 引用改写为经代理回流的地址，
//! 让播放器拿到的每个分片地址都经过白名单校验与凭据隐藏。
//! 相对引用以本次 fetch 的生效（重定向后）URL 为基准解析。

use url::form_urlencoded;
use url::Url;

use super::error::ProxyError;

/// 重写后清单统一使用的内容类型，与上游协商结果无关
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// 重写清单文本。
///
/// 首个非空白字符是 `<` 说明上游吐的是 HTML 错误页而非清单，
/// 返回 `StreamOffline` 而不是把 HTML 当清单透传。
/// 空行与 `#` 开头的标签/注释行原样保留；其余行视为 URI 引用，
/// 解析失败的行原样保留而不是丢弃。
pub fn rewrite_manifest(
    body: &str,
    effective_url: &Url,
    proxy_path: &str,
) -> Result<String, ProxyError> {
    if body.trim_start().starts_with('<') {
        return Err(ProxyError::StreamOffline);
    }

    let rewritten = body
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return line.to_string();
            }

            let absolute = if trimmed.starts_with("http") {
                Ok(trimmed.to_string())
            } else {
                effective_url.join(trimmed).map(String::from)
            };

            match absolute {
                Ok(full) => {
                    let query: String = form_urlencoded::Serializer::new(String::new())
                        .append_pair("url", &full)
                        .finish();
                    format!("{proxy_path}?{query}")
                }
                Err(_) => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(rewritten)
}
