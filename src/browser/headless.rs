use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 启动浏览器并打开一个空白页
///
/// 默认有界面运行：操作员需要在同一个窗口里上传照片并点击提交。
pub async fn launch_browser(config: &Config) -> AppResult<(Browser, Page)> {
    info!("🚀 启动浏览器...");

    let mut builder = BrowserConfig::builder()
        .request_timeout(config.page_load_timeout())
        .args(vec![
            "--start-maximized",
            "--disable-blink-features=AutomationControlled", // 隐藏自动化标识
            "--no-sandbox",
            "--disable-dev-shm-usage", // 防止共享内存不足
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head().viewport(None)
    };

    if let Some(executable) = &config.browser_executable {
        debug!("浏览器路径: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        AppError::other(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        e
    })?;

    info!("✅ 浏览器会话已开始");
    Ok((browser, page))
}
