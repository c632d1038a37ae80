//! 浏览器获取：启动新实例或连接已有实例

pub mod connection;
pub mod headless;

use crate::config::{BrowserMode, Config};
use crate::error::AppResult;
use crate::infrastructure::CdpSession;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

/// 按配置打开浏览器并包装为会话
pub async fn open_session(config: &Config) -> AppResult<CdpSession> {
    let (browser, page, owns_browser) = match config.browser_mode {
        BrowserMode::Launch => {
            let (browser, page) = launch_browser(config).await?;
            (browser, page, true)
        }
        BrowserMode::Connect => {
            let (browser, page) = connect_to_browser(config.browser_debug_port).await?;
            (browser, page, false)
        }
    };

    let session = CdpSession::new(
        browser,
        page,
        owns_browser,
        config.snapshot_dir.clone(),
        config.page_load_timeout(),
    )
    .await?;
    Ok(session)
}
