use std::time::Duration;

use thiserror::Error;

/// 包装第三方库错误时使用的通用错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器交互错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] InteractionError),
    /// 数据源错误
    #[error("数据源错误: {0}")]
    Source(#[from] SourceError),
    /// 登录错误
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),
    /// 导航错误
    #[error("导航错误: {0}")]
    Navigation(#[from] NavigationError),
    /// 人工确认通道错误
    #[error("人工确认错误: {0}")]
    Confirmation(#[from] ConfirmationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件读写错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器交互错误
///
/// 浏览器会话的每个操作都可能以此失败，携带底层原因。
#[derive(Debug, Error)]
pub enum InteractionError {
    /// 等待元素超时
    #[error("等待元素 {selector} 超时 ({timeout:?})")]
    ElementTimeout { selector: String, timeout: Duration },
    /// 等待 URL 超时
    #[error("等待 URL 包含 '{fragment}' 超时 ({timeout:?})")]
    UrlTimeout { fragment: String, timeout: Duration },
    /// 页面加载超时
    #[error("加载 {url} 超时 ({timeout:?})")]
    LoadTimeout { url: String, timeout: Duration },
    /// 下拉框中没有对应的可见选项
    #[error("下拉框 {selector} 中没有选项 '{label}'")]
    OptionNotFound { selector: String, label: String },
    /// 元素在操作时已不存在
    #[error("元素 {selector} 不存在")]
    ElementMissing { selector: String },
    /// 底层 CDP 调用失败
    #[error("浏览器操作失败 ({action}): {source}")]
    Cdp {
        action: &'static str,
        #[source]
        source: BoxError,
    },
}

/// 数据源错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 数据源无法访问或认证失败
    #[error("数据源不可用 ({origin}): {source}")]
    Unavailable {
        origin: String,
        #[source]
        source: BoxError,
    },
    /// 缺少必需列
    #[error("缺少必需列: {missing:?}")]
    SchemaInvalid { missing: Vec<String> },
    /// 数据源中没有任何记录
    #[error("数据源中没有任何记录")]
    EmptyBatch,
}

/// 登录阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// 打开登录页
    LoadLoginPage,
    /// 等待并填写账号密码
    EnterCredentials,
    /// 提交登录表单
    Submit,
    /// 确认进入登录后的页面
    ConfirmLanding,
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthStage::LoadLoginPage => "打开登录页",
            AuthStage::EnterCredentials => "填写账号密码",
            AuthStage::Submit => "提交登录",
            AuthStage::ConfirmLanding => "确认登录结果",
        };
        f.write_str(name)
    }
}

/// 登录失败
#[derive(Debug, Error)]
#[error("登录失败，阶段: {stage}: {source}")]
pub struct AuthError {
    pub stage: AuthStage,
    #[source]
    pub source: InteractionError,
}

/// 表单页导航失败
#[derive(Debug, Error)]
#[error("无法进入表单页 {url}: {source}")]
pub struct NavigationError {
    pub url: String,
    #[source]
    pub source: InteractionError,
}

/// 人工确认通道错误
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// 输入流已关闭，无法再等待操作员
    #[error("人工确认通道已关闭")]
    ChannelClosed,
    /// 读取输入失败
    #[error("读取操作员输入失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置不合法: {0}")]
    Invalid(String),
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for InteractionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        InteractionError::Cdp {
            action: "cdp",
            source: Box::new(err),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::unavailable("http", err)
    }
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        SourceError::unavailable("csv", err)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::unavailable("json", err)
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.into())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl InteractionError {
    /// 创建 CDP 调用错误，并标注具体操作
    pub fn cdp(action: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        InteractionError::Cdp {
            action,
            source: Box::new(source),
        }
    }
}

impl SourceError {
    /// 创建数据源不可用错误
    pub fn unavailable(
        origin: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        SourceError::Unavailable {
            origin: origin.into(),
            source: source.into(),
        }
    }
}

impl AppError {
    /// 创建其他错误
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_names_stage() {
        let err = AuthError {
            stage: AuthStage::ConfirmLanding,
            source: InteractionError::UrlTimeout {
                fragment: "/stu-info/index".to_string(),
                timeout: Duration::from_secs(30),
            },
        };
        let text = err.to_string();
        assert!(text.contains("确认登录结果"));
        assert!(text.contains("/stu-info/index"));
    }

    #[test]
    fn test_schema_invalid_lists_missing_columns() {
        let err = SourceError::SchemaInvalid {
            missing: vec!["Phone Number".to_string()],
        };
        assert!(err.to_string().contains("Phone Number"));
    }

    #[test]
    fn test_app_error_wraps_source_error() {
        let err: AppError = SourceError::EmptyBatch.into();
        assert!(matches!(err, AppError::Source(SourceError::EmptyBatch)));
    }

    #[test]
    fn test_app_error_from_toml_is_config_error() {
        let toml_err = toml::from_str::<toml::Value>("a = ").unwrap_err();
        let err: AppError = toml_err.into();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn test_app_error_from_io_and_other() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "students.log").into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("students.log"));

        let err = AppError::other("配置浏览器失败");
        assert_eq!(err.to_string(), "错误: 配置浏览器失败");
    }

    #[test]
    fn test_interaction_error_into_app_error() {
        let err: AppError = InteractionError::ElementMissing {
            selector: "[name='StuName']".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Browser(_)));
    }
}
