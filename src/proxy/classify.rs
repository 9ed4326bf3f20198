//! 请求分类策略
//!
//! 纯函数，整个请求路径上"缓冲还是直通"的唯一判定来源。
//! 先按 URL 启发式分类；响应到达后，内容类型对流式判定有最终话语权
//! （直播打包器常在分片 URL 上省略扩展名，也常用 octet-stream 回应媒体）。

use url::Url;

/// 目标 URL 的处理类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// JSON API 响应，可缓存
    CacheableApi,
    /// HLS 清单，逐行重写后返回
    Manifest,
    /// 完整媒体容器文件，直通并支持 Range
    Media,
    /// 直播/点播分片，直通
    Segment,
    /// 其他（图片、小静态资源），缓冲一次性返回，不缓存
    Other,
}

impl Classification {
    /// URL 层面即可判定为流式的类别
    pub fn is_streaming(self) -> bool {
        matches!(self, Classification::Media | Classification::Segment)
    }
}

const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".avi", ".mov", ".wmv"];

/// 按 URL 启发式分类（请求发出前）
pub fn classify(url: &Url) -> Classification {
    if url.as_str().contains(".m3u8") {
        return Classification::Manifest;
    }

    let path = url.path().to_ascii_lowercase();
    if MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Classification::Media;
    }
    // 分片：.ts 扩展名，或路径带 HLS/鉴权标记（无扩展名的分片 URL 很常见）
    if path.ends_with(".ts") || path.contains("/hls/") || path.contains("/auth/") {
        return Classification::Segment;
    }
    if path.contains("player_api.php") {
        return Classification::CacheableApi;
    }

    Classification::Other
}

/// 响应内容类型是否强制走流式直通（响应头优先于 URL 猜测）
pub fn is_streaming_content_type(content_type: &str) -> bool {
    content_type.starts_with("video/")
        || content_type.contains("mpegurl")
        || content_type.contains("octet-stream")
}
