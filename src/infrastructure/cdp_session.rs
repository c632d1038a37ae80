//! CDP 浏览器会话 - 基础设施层
//!
//! 持有唯一的 Browser / Page 资源，只暴露 [`BrowserSession`] 能力

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::InteractionError;
use crate::infrastructure::browser_session::{BrowserSession, ElementHandle};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 元素可见（有布局盒）且未禁用
const INTERACTIVE_JS: &str = "const style = window.getComputedStyle(el); \
     return el.getClientRects().length > 0 && style.visibility !== 'hidden' && !el.disabled && !el.readOnly;";

const CLEAR_FIELD_JS: &str = "el.focus(); el.value = ''; \
     el.dispatchEvent(new Event('input', { bubbles: true })); return null;";

/// 基于 chromiumoxide 的浏览器会话
///
/// 职责：
/// - 持有唯一的 Browser 和 Page
/// - 在后台收集 JS 弹窗事件，供登录后的欢迎弹窗处理使用
/// - 不认识学员 / 表单字段
pub struct CdpSession {
    browser: Mutex<Browser>,
    page: Page,
    owns_browser: bool,
    dialogs: Mutex<mpsc::UnboundedReceiver<String>>,
    dialog_task: JoinHandle<()>,
    snapshot_dir: PathBuf,
    page_load_timeout: Duration,
}

impl CdpSession {
    /// 创建会话
    ///
    /// # 参数
    /// - `owns_browser`: 为 `true` 时关闭会话会关闭整个浏览器，否则只关闭页面
    pub async fn new(
        browser: Browser,
        page: Page,
        owns_browser: bool,
        snapshot_dir: impl Into<PathBuf>,
        page_load_timeout: Duration,
    ) -> Result<Self, InteractionError> {
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| InteractionError::cdp("event_listener", e))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let dialog_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!("检测到弹窗: {}", event.message);
                if tx.send(event.message.clone()).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            owns_browser,
            dialogs: Mutex::new(rx),
            dialog_task,
            snapshot_dir: snapshot_dir.into(),
            page_load_timeout,
        })
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, InteractionError> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(|e| InteractionError::cdp("evaluate", e))?;
        result
            .into_value()
            .map_err(|e| InteractionError::cdp("evaluate", e))
    }

    /// 在元素上执行一段 JS，`body` 中可使用变量 `el`；元素不存在时返回 `ElementMissing`
    async fn with_element<T: DeserializeOwned>(
        &self,
        selector: &str,
        body: &str,
    ) -> Result<T, InteractionError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) {{
                    return {{ missing: true }};
                }}
                return {{ missing: false, value: (() => {{ {} }})() }};
            }})()
            "#,
            quote(selector)?,
            body
        );

        let result = self.eval(js_code).await?;
        if result.get("missing").and_then(JsonValue::as_bool).unwrap_or(true) {
            return Err(InteractionError::ElementMissing {
                selector: selector.to_string(),
            });
        }
        let value = result.get("value").cloned().unwrap_or(JsonValue::Null);
        serde_json::from_value(value).map_err(|e| InteractionError::cdp("evaluate", e))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn load(&self, url: &str) -> Result<(), InteractionError> {
        debug!("打开页面: {}", url);
        match timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(InteractionError::cdp("goto", e)),
            Err(_) => Err(InteractionError::LoadTimeout {
                url: url.to_string(),
                timeout: self.page_load_timeout,
            }),
        }
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, InteractionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(ElementHandle::new(selector));
            }
            if Instant::now() >= deadline {
                return Err(InteractionError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_interactive(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, InteractionError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.with_element::<bool>(selector, INTERACTIVE_JS).await {
                Ok(true) => return Ok(ElementHandle::new(selector)),
                Ok(false) => debug!("元素尚不可操作: {}", selector),
                Err(InteractionError::ElementMissing { .. }) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(InteractionError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), InteractionError> {
        // 使用 JS 点击，避免被遮挡元素拦截
        self.with_element::<JsonValue>(element.selector(), "el.click(); return null;")
            .await?;
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, text: &str) -> Result<(), InteractionError> {
        self.with_element::<JsonValue>(element.selector(), CLEAR_FIELD_JS)
            .await?;

        // Input.insertText 不经过键盘映射，孟加拉文、重音字母和换行都能原样写入
        if let Err(e) = self.page.execute(InsertTextParams::new(text)).await {
            warn!("插入文本失败 ({}): {}，改为直接赋值", element.selector(), e);
        }

        // 日期等特殊输入框不接受输入事件时，直接写入 value
        let current: String = self
            .with_element(element.selector(), "return String(el.value ?? '');")
            .await?;
        if current != text {
            debug!("输入未完全生效 ({}), 改为直接赋值", element.selector());
            self.with_element::<JsonValue>(element.selector(), &assign_value_js(text)?)
                .await?;
        }
        Ok(())
    }

    async fn select_by_label(
        &self,
        element: &ElementHandle,
        label: &str,
    ) -> Result<(), InteractionError> {
        let body = format!(
            r#"
            const label = {};
            const option = Array.from(el.options || []).find(o => o.text.trim() === label);
            if (!option) {{
                return false;
            }}
            el.value = option.value;
            option.selected = true;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
            "#,
            quote(label.trim())?
        );

        let selected: bool = self.with_element(element.selector(), &body).await?;
        if selected {
            Ok(())
        } else {
            Err(InteractionError::OptionNotFound {
                selector: element.selector().to_string(),
                label: label.to_string(),
            })
        }
    }

    async fn current_url(&self) -> Result<String, InteractionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| InteractionError::cdp("url", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn dismiss_dialog(&self, wait: Duration) -> Result<Option<String>, InteractionError> {
        let mut dialogs = self.dialogs.lock().await;
        let message = match timeout(wait, dialogs.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) | Err(_) => return Ok(None),
        };

        self.page
            .execute(HandleJavaScriptDialogParams::new(true))
            .await
            .map_err(|e| InteractionError::cdp("handle_dialog", e))?;
        Ok(Some(message))
    }

    async fn capture_snapshot(&self, label: &str) -> Result<PathBuf, InteractionError> {
        tokio::fs::create_dir_all(&self.snapshot_dir)
            .await
            .map_err(|e| InteractionError::cdp("snapshot", e))?;

        let path = self.snapshot_dir.join(format!("{}.png", label));
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), &path)
            .await
            .map_err(|e| InteractionError::cdp("snapshot", e))?;
        Ok(path)
    }

    async fn close(&mut self) -> Result<(), InteractionError> {
        self.dialog_task.abort();

        if self.owns_browser {
            let browser = self.browser.get_mut();
            browser
                .close()
                .await
                .map_err(|e| InteractionError::cdp("close", e))?;
            if let Err(e) = browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
        } else {
            self.page
                .clone()
                .close()
                .await
                .map_err(|e| InteractionError::cdp("close", e))?;
        }
        Ok(())
    }
}

/// 直接写入 value 并触发 input / change 事件
fn assign_value_js(text: &str) -> Result<String, InteractionError> {
    Ok(format!(
        "el.value = {}; el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return null;",
        quote(text)?
    ))
}

/// 把字符串编码为 JS 字面量
fn quote(text: &str) -> Result<String, InteractionError> {
    serde_json::to_string(text).map_err(|e| InteractionError::cdp("encode", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_keeps_non_ascii_and_newlines() {
        let quoted = quote("রহিম উদ্দিন").unwrap();
        assert_eq!(quoted, "\"রহিম উদ্দিন\"");

        let quoted = quote("Mirpur 10\nDhaka \"José\"").unwrap();
        assert_eq!(quoted, r#""Mirpur 10\nDhaka \"José\"""#);
        let back: String = serde_json::from_str(&quoted).unwrap();
        assert_eq!(back, "Mirpur 10\nDhaka \"José\"");
    }

    #[test]
    fn test_assign_value_script_embeds_literal() {
        let body = assign_value_js("রহিম\nউদ্দিন").unwrap();
        assert!(body.starts_with("el.value = \"রহিম\\nউদ্দিন\";"));
        assert!(body.contains("'change'"));
    }
}
