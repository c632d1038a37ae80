use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

/// 浏览器获取方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    /// 启动一个新的浏览器实例
    Launch,
    /// 连接到已开启调试端口的浏览器
    Connect,
}

impl FromStr for BrowserMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "launch" => Ok(BrowserMode::Launch),
            "connect" => Ok(BrowserMode::Connect),
            other => Err(ConfigError::EnvVarParseFailed {
                var_name: "BROWSER_MODE".to_string(),
                value: other.to_string(),
                expected_type: "launch | connect".to_string(),
            }),
        }
    }
}

/// 学员数据来源
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Google 表格
    Sheets,
    /// 本地 CSV 导出文件
    Csv,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(SourceKind::Sheets),
            "csv" => Ok(SourceKind::Csv),
            other => Err(ConfigError::EnvVarParseFailed {
                var_name: "SOURCE_KIND".to_string(),
                value: other.to_string(),
                expected_type: "sheets | csv".to_string(),
            }),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 目标站点 ---
    pub login_url: String,
    pub dashboard_url: String,
    pub form_url: String,
    pub logout_url: String,
    /// 登录成功后 URL 中应包含的片段
    pub landing_url_fragment: String,

    // --- 页面元素 ---
    pub username_selector: String,
    pub password_selector: String,
    pub login_button_selector: String,
    /// 表单页就绪的标志字段
    pub form_anchor_selector: String,

    // --- 超时 ---
    /// 等待元素的超时（秒）
    pub element_timeout_secs: u64,
    /// 页面加载超时（秒）
    pub page_load_timeout_secs: u64,
    /// 等待登录后欢迎弹窗的超时（秒）
    pub interstitial_timeout_secs: u64,
    /// 回到首页后的等待时间（毫秒）
    pub settle_delay_ms: u64,

    // --- 重试 ---
    pub auth_max_attempts: u32,
    /// 登录重试间隔（秒）
    pub retry_delay_secs: u64,

    // --- 浏览器 ---
    pub browser_mode: BrowserMode,
    /// 浏览器调试端口（connect 模式）
    pub browser_debug_port: u16,
    /// 浏览器可执行文件路径（launch 模式，为空时自动查找）
    pub browser_executable: Option<String>,
    pub headless: bool,

    // --- 数据源 ---
    pub source_kind: SourceKind,
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub sheets_api_base: String,
    pub sheets_api_key: Option<String>,
    pub sheets_access_token: Option<String>,
    /// 服务账号密钥文件（JSON），设置后优先于 access token
    pub sheets_service_account_key: Option<String>,
    /// 读取数据源的请求超时（秒）
    pub source_timeout_secs: u64,
    pub csv_path: String,

    // --- 输出 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 截图保存目录
    pub snapshot_dir: String,
    /// 逐条记录处理结果的审计文件
    pub audit_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: "https://jubo48.e-laeltd.com/jubo/".to_string(),
            dashboard_url: "https://jubo48.e-laeltd.com/jubo/stu-info/index".to_string(),
            form_url: "https://jubo48.e-laeltd.com/jubo/stu-info/student-add".to_string(),
            logout_url: "https://jubo48.e-laeltd.com/jubo/logout".to_string(),
            landing_url_fragment: "/stu-info/index".to_string(),
            username_selector: "[name='username']".to_string(),
            password_selector: "[name='password']".to_string(),
            login_button_selector: "button".to_string(),
            form_anchor_selector: "[name='StuName']".to_string(),
            element_timeout_secs: 30,
            page_load_timeout_secs: 120,
            interstitial_timeout_secs: 5,
            settle_delay_ms: 2000,
            auth_max_attempts: 3,
            retry_delay_secs: 5,
            browser_mode: BrowserMode::Launch,
            browser_debug_port: 9222,
            browser_executable: None,
            headless: false,
            source_kind: SourceKind::Sheets,
            spreadsheet_id: String::new(),
            sheet_range: "Sheet1".to_string(),
            sheets_api_base: "https://sheets.googleapis.com".to_string(),
            sheets_api_key: None,
            sheets_access_token: None,
            sheets_service_account_key: None,
            source_timeout_secs: 30,
            csv_path: "students.csv".to_string(),
            verbose_logging: false,
            output_log_file: "student_upload.log".to_string(),
            snapshot_dir: "snapshots".to_string(),
            audit_file: None,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置（缺省字段取默认值），环境变量仍然优先
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParseFailed { source, .. } => ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: String::new(),
            source,
        })
    }

    fn with_env_overrides(self) -> Self {
        let d = self;
        Self {
            login_url: env_string("LOGIN_URL").unwrap_or(d.login_url),
            dashboard_url: env_string("DASHBOARD_URL").unwrap_or(d.dashboard_url),
            form_url: env_string("FORM_URL").unwrap_or(d.form_url),
            logout_url: env_string("LOGOUT_URL").unwrap_or(d.logout_url),
            landing_url_fragment: env_string("LANDING_URL_FRAGMENT").unwrap_or(d.landing_url_fragment),
            username_selector: d.username_selector,
            password_selector: d.password_selector,
            login_button_selector: d.login_button_selector,
            form_anchor_selector: d.form_anchor_selector,
            element_timeout_secs: env_parse("ELEMENT_TIMEOUT_SECS").unwrap_or(d.element_timeout_secs),
            page_load_timeout_secs: env_parse("PAGE_LOAD_TIMEOUT_SECS").unwrap_or(d.page_load_timeout_secs),
            interstitial_timeout_secs: env_parse("INTERSTITIAL_TIMEOUT_SECS").unwrap_or(d.interstitial_timeout_secs),
            settle_delay_ms: env_parse("SETTLE_DELAY_MS").unwrap_or(d.settle_delay_ms),
            auth_max_attempts: env_parse("AUTH_MAX_ATTEMPTS").unwrap_or(d.auth_max_attempts),
            retry_delay_secs: env_parse("RETRY_DELAY_SECS").unwrap_or(d.retry_delay_secs),
            browser_mode: env_parse("BROWSER_MODE").unwrap_or(d.browser_mode),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(d.browser_debug_port),
            browser_executable: env_string("BROWSER_EXECUTABLE").or(d.browser_executable),
            headless: env_parse("HEADLESS").unwrap_or(d.headless),
            source_kind: env_parse("SOURCE_KIND").unwrap_or(d.source_kind),
            spreadsheet_id: env_string("SPREADSHEET_ID").unwrap_or(d.spreadsheet_id),
            sheet_range: env_string("SHEET_RANGE").unwrap_or(d.sheet_range),
            sheets_api_base: env_string("SHEETS_API_BASE").unwrap_or(d.sheets_api_base),
            sheets_api_key: env_string("SHEETS_API_KEY").or(d.sheets_api_key),
            sheets_access_token: env_string("SHEETS_ACCESS_TOKEN").or(d.sheets_access_token),
            sheets_service_account_key: env_string("SHEETS_SERVICE_ACCOUNT_KEY")
                .or_else(|| env_string("GOOGLE_APPLICATION_CREDENTIALS"))
                .or(d.sheets_service_account_key),
            source_timeout_secs: env_parse("SOURCE_TIMEOUT_SECS").unwrap_or(d.source_timeout_secs),
            csv_path: env_string("CSV_PATH").unwrap_or(d.csv_path),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(d.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(d.output_log_file),
            snapshot_dir: env_string("SNAPSHOT_DIR").unwrap_or(d.snapshot_dir),
            audit_file: env_string("AUDIT_FILE").or(d.audit_file),
        }
    }

    /// 检查配置值是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_max_attempts == 0 {
            return Err(ConfigError::Invalid("auth_max_attempts 至少为 1".to_string()));
        }
        if self.element_timeout_secs == 0 {
            return Err(ConfigError::Invalid("element_timeout_secs 必须大于 0".to_string()));
        }
        if self.source_timeout_secs == 0 {
            return Err(ConfigError::Invalid("source_timeout_secs 必须大于 0".to_string()));
        }
        if self.source_kind == SourceKind::Sheets && self.spreadsheet_id.is_empty() {
            return Err(ConfigError::Invalid(
                "使用 Google 表格时必须设置 spreadsheet_id".to_string(),
            ));
        }
        Ok(())
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn interstitial_timeout(&self) -> Duration {
        Duration::from_secs(self.interstitial_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// 目标站点的登录凭据
///
/// 密码只通过 [`Credentials::password`] 暴露，Debug 输出中不会出现明文。
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// 从 `FORM_USERNAME` / `FORM_PASSWORD` 读取凭据
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = required_env("FORM_USERNAME")?;
        let password = required_env("FORM_PASSWORD")?;
        Ok(Self::new(username, password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    env_string(name).ok_or_else(|| ConfigError::EnvVarNotFound {
        var_name: name.to_string(),
    })
}
