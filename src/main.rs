//! `streamgate` - 面向 HLS/Xtream 源站的流媒体反向代理。
//!
//! 初始化日志，从环境变量加载配置，启动代理服务。

use anyhow::Result;
use streamgate::{run_server, ProxyConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ProxyConfig::from_env();
    log::info!(
        "[Streamgate] listen_addr={} proxy_path={} allowed_hosts={:?}",
        config.listen_addr,
        config.proxy_path,
        config.allowed_hosts
    );

    run_server(config).await
}
