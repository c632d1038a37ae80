//! 会话控制 - 业务能力层
//!
//! 独占浏览器会话：登录、进入表单、回到首页、填写单个字段、退出。
//! 流程层只能通过这里操作页面，不会直接拿到 [`BrowserSession`]。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::{Config, Credentials};
use crate::error::{AuthError, AuthStage, InteractionError, NavigationError};
use crate::infrastructure::BrowserSession;
use crate::models::field::{FieldAssignment, FieldKind};
use crate::services::observer::{ObserverEvent, RunObserver};

const URL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 当前页面所处的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageContext {
    Unknown,
    Dashboard,
    Form,
    LoggedOut,
}

/// 目标站点的地址、元素和等待时间
#[derive(Debug, Clone)]
struct SiteSettings {
    login_url: String,
    dashboard_url: String,
    form_url: String,
    logout_url: String,
    landing_url_fragment: String,
    username_selector: String,
    password_selector: String,
    login_button_selector: String,
    form_anchor_selector: String,
    element_timeout: Duration,
    interstitial_timeout: Duration,
    settle_delay: Duration,
}

impl SiteSettings {
    fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.login_url.clone(),
            dashboard_url: config.dashboard_url.clone(),
            form_url: config.form_url.clone(),
            logout_url: config.logout_url.clone(),
            landing_url_fragment: config.landing_url_fragment.clone(),
            username_selector: config.username_selector.clone(),
            password_selector: config.password_selector.clone(),
            login_button_selector: config.login_button_selector.clone(),
            form_anchor_selector: config.form_anchor_selector.clone(),
            element_timeout: config.element_timeout(),
            interstitial_timeout: config.interstitial_timeout(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// 会话控制器
///
/// 整个运行期间只存在一个；`teardown` 会消耗控制器，因此只能调用一次。
pub struct SessionController {
    session: Box<dyn BrowserSession>,
    site: SiteSettings,
    observer: Arc<dyn RunObserver>,
    authenticated: bool,
    context: PageContext,
}

impl SessionController {
    pub fn new(
        session: Box<dyn BrowserSession>,
        config: &Config,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            session,
            site: SiteSettings::from_config(config),
            observer,
            authenticated: false,
            context: PageContext::Unknown,
        }
    }

    pub fn context(&self) -> PageContext {
        self.context
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// 登录
    ///
    /// 失败时保存 `login_failure` 截图；不在内部重试。
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        info!("🔐 正在登录: {}", self.site.login_url);

        match self.try_authenticate(credentials).await {
            Ok(()) => {
                self.authenticated = true;
                self.context = PageContext::Dashboard;
                self.observer.on_event(&ObserverEvent::info("✓ 登录成功"));
                Ok(())
            }
            Err(e) => {
                self.authenticated = false;
                self.context = PageContext::Unknown;
                let event = ObserverEvent::error(format!("登录失败: {}", e));
                let event = match self.capture("login_failure").await {
                    Some(path) => event.with_snapshot(path),
                    None => event,
                };
                self.observer.on_event(&event);
                Err(e)
            }
        }
    }

    async fn try_authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let site = &self.site;
        let at = |stage: AuthStage| move |source: InteractionError| AuthError { stage, source };

        self.session
            .load(&site.login_url)
            .await
            .map_err(at(AuthStage::LoadLoginPage))?;

        let username = self
            .session
            .wait_for_interactive(&site.username_selector, site.element_timeout)
            .await
            .map_err(at(AuthStage::EnterCredentials))?;
        self.session
            .set_value(&username, credentials.username())
            .await
            .map_err(at(AuthStage::EnterCredentials))?;

        let password = self
            .session
            .wait_for_interactive(&site.password_selector, site.element_timeout)
            .await
            .map_err(at(AuthStage::EnterCredentials))?;
        self.session
            .set_value(&password, credentials.password())
            .await
            .map_err(at(AuthStage::EnterCredentials))?;

        let button = self
            .session
            .wait_for_interactive(&site.login_button_selector, site.element_timeout)
            .await
            .map_err(at(AuthStage::Submit))?;
        self.session
            .click(&button)
            .await
            .map_err(at(AuthStage::Submit))?;

        // 登录后可能出现一次性的欢迎弹窗，没有出现不算错误
        match self.session.dismiss_dialog(site.interstitial_timeout).await {
            Ok(Some(text)) => info!("已关闭欢迎弹窗: {}", text),
            Ok(None) => debug!("未出现欢迎弹窗"),
            Err(e) => warn!("关闭欢迎弹窗失败: {}", e),
        }

        self.wait_for_url(&site.landing_url_fragment, site.element_timeout)
            .await
            .map_err(at(AuthStage::ConfirmLanding))
    }

    /// 轮询当前 URL，直到包含指定片段
    async fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<(), InteractionError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.session.current_url().await {
                Ok(url) if url.contains(fragment) => return Ok(()),
                Ok(url) => debug!("当前 URL: {}", url),
                // 页面跳转过程中读取 URL 可能失败，继续等待
                Err(e) => debug!("读取 URL 失败: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(InteractionError::UrlTimeout {
                    fragment: fragment.to_string(),
                    timeout,
                });
            }
            sleep(URL_POLL_INTERVAL).await;
        }
    }

    /// 直接打开表单页，并等待标志字段出现
    pub async fn navigate_to_form(&mut self) -> Result<(), NavigationError> {
        let url = self.site.form_url.clone();
        let result = async {
            self.session.load(&url).await?;
            self.session
                .wait_for_element(&self.site.form_anchor_selector, self.site.element_timeout)
                .await?;
            Ok::<(), InteractionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.context = PageContext::Form;
                debug!("表单页已就绪");
                Ok(())
            }
            Err(source) => {
                self.context = PageContext::Unknown;
                Err(NavigationError { url, source })
            }
        }
    }

    /// 回到首页，作为每条记录开始前的固定起点
    pub async fn reset_to_dashboard(&mut self) -> Result<(), InteractionError> {
        if let Err(e) = self.session.load(&self.site.dashboard_url).await {
            self.context = PageContext::Unknown;
            return Err(e);
        }
        // 等待页面稳定
        sleep(self.site.settle_delay).await;
        self.context = PageContext::Dashboard;
        Ok(())
    }

    /// 在当前表单上写入一个字段
    ///
    /// 文本框需要可见且可编辑；下拉框和单选项只要求存在（常被样式组件隐藏）。
    pub async fn apply(&self, assignment: &FieldAssignment) -> Result<(), InteractionError> {
        let selector = assignment.selector();
        let timeout = self.site.element_timeout;
        let element = match assignment.kind {
            FieldKind::Text => self.session.wait_for_interactive(&selector, timeout).await?,
            FieldKind::Select | FieldKind::Radio => {
                self.session.wait_for_element(&selector, timeout).await?
            }
        };

        match assignment.kind {
            FieldKind::Text => self.session.set_value(&element, &assignment.value).await,
            FieldKind::Select => {
                self.session
                    .select_by_label(&element, &assignment.value)
                    .await
            }
            FieldKind::Radio => self.session.click(&element).await,
        }
    }

    /// 保存截图并通知观察者；失败只记录日志
    pub async fn snapshot(&self, label: &str, message: impl Into<String>) -> Option<PathBuf> {
        let path = self.capture(label).await?;
        self.observer
            .on_event(&ObserverEvent::info(message).with_snapshot(path.clone()));
        Some(path)
    }

    async fn capture(&self, label: &str) -> Option<PathBuf> {
        match self.session.capture_snapshot(label).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("保存截图 {} 失败: {}", label, e);
                None
            }
        }
    }

    /// 退出登录并关闭浏览器
    ///
    /// 尽力而为：任何失败都只记录日志，不会返回给调用方。
    pub async fn teardown(mut self) {
        match self.session.load(&self.site.logout_url).await {
            Ok(()) => {
                self.context = PageContext::LoggedOut;
                info!("已退出登录");
            }
            Err(e) => warn!("退出登录失败: {}", e),
        }
        self.authenticated = false;

        if let Err(e) = self.session.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        info!("浏览器会话已结束");
    }
}
