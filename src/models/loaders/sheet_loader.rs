use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SourceError;
use crate::models::loaders::RecordSource;
use crate::models::record::Batch;

/// Sheets API `values.get` 的响应
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

/// Google 表格数据源（Sheets API v4）
///
/// 第一行作为表头，其余行作为学员记录。
pub struct SheetSource {
    client: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    range: String,
    api_key: Option<String>,
    access_token: Option<String>,
    service_account: Option<Arc<CustomServiceAccount>>,
}

/// 只读访问表格所需的 OAuth scope
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

impl SheetSource {
    /// 按配置创建数据源
    ///
    /// 配置了服务账号密钥时立即读取密钥文件，文件缺失或格式错误返回 `Unavailable`。
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.source_timeout())
            .build()?;

        let service_account = match &config.sheets_service_account_key {
            Some(path) => {
                let account = CustomServiceAccount::from_file(path)
                    .map_err(|e| SourceError::unavailable("google-auth", e))?;
                info!("🔑 使用服务账号读取表格: {}", path);
                Some(Arc::new(account))
            }
            None => None,
        };

        Ok(Self {
            client,
            api_base: config.sheets_api_base.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.sheet_range.clone(),
            api_key: config.sheets_api_key.clone(),
            access_token: config.sheets_access_token.clone(),
            service_account,
        })
    }

    /// 本次请求使用的 bearer token：服务账号优先，其次是固定的 access token
    async fn bearer_token(&self) -> Result<Option<String>, SourceError> {
        if let Some(account) = &self.service_account {
            let token = account
                .token(&[SHEETS_READONLY_SCOPE])
                .await
                .map_err(|e| SourceError::unavailable("google-auth", e))?;
            return Ok(Some(token.as_str().to_string()));
        }
        Ok(self.access_token.clone())
    }

    fn values_url(&self) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SourceError::unavailable("sheets", e))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::unavailable("sheets", format!("无效的 API 地址: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", self.range.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl RecordSource for SheetSource {
    async fn fetch(&self) -> Result<Batch, SourceError> {
        let url = self.values_url()?;
        debug!("读取表格: {}", url);

        let mut request = self
            .client
            .get(url)
            .query(&[("majorDimension", "ROWS")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        let token = self.bearer_token().await?;
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if self.api_key.is_none() && token.is_none() {
            warn!("未配置 API key、access token 或服务账号，仅能读取公开表格");
        }

        let body = request.send().await?.error_for_status()?.text().await?;
        let batch = parse_value_range(&body)?;
        info!("✓ 从表格读取到 {} 条记录", batch.len());
        Ok(batch)
    }

    fn describe(&self) -> String {
        format!("Google 表格 {} ({})", self.spreadsheet_id, self.range)
    }
}

/// 解析 `values.get` 的 JSON 响应
pub(crate) fn parse_value_range(body: &str) -> Result<Batch, SourceError> {
    let range: ValueRange = serde_json::from_str(body)?;
    let mut rows = range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect::<Vec<_>>());

    let headers = rows.next().unwrap_or_default();
    Batch::from_table(headers, rows.collect())
}

fn cell_to_string(cell: JsonValue) -> String {
    match cell {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{PHONE_NUMBER, STUDENT_NAME};

    #[test]
    fn test_parse_value_range() {
        let body = r#"{
            "range": "Sheet1!A1:D3",
            "majorDimension": "ROWS",
            "values": [
                ["Student Name ", "Phone Number", "Date of Birth", "Gender"],
                ["Rahim", 1712345678, "2001-04-05", "Male"],
                ["Karim", "01811111111", "2002-01-09"]
            ]
        }"#;

        let batch = parse_value_range(body).unwrap();
        assert_eq!(batch.len(), 2);

        let records: Vec<_> = batch.iter().collect();
        assert_eq!(records[0].value(STUDENT_NAME), Some("Rahim"));
        assert_eq!(records[0].value(PHONE_NUMBER), Some("1712345678"));
        assert_eq!(records[1].row(), 3);
        assert_eq!(records[1].value("Gender"), None);
    }

    #[test]
    fn test_empty_sheet_is_empty_batch() {
        let body = r#"{ "range": "Sheet1", "majorDimension": "ROWS" }"#;
        assert!(matches!(parse_value_range(body), Err(SourceError::EmptyBatch)));
    }

    #[test]
    fn test_header_only_sheet_is_empty_batch() {
        let body = r#"{ "values": [["Student Name", "Phone Number", "Date of Birth"]] }"#;
        assert!(matches!(parse_value_range(body), Err(SourceError::EmptyBatch)));
    }

    #[test]
    fn test_malformed_body_is_unavailable() {
        assert!(matches!(
            parse_value_range("<html>login</html>"),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_values_url_encodes_range() {
        let config = Config {
            spreadsheet_id: "sheet-id".to_string(),
            sheet_range: "Form Responses 1!A1:Z".to_string(),
            ..Config::default()
        };
        let source = SheetSource::from_config(&config).unwrap();
        let url = source.values_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/Form%20Responses%201!A1:Z"
        );
    }

    #[test]
    fn test_missing_service_account_key_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            spreadsheet_id: "sheet-id".to_string(),
            sheets_service_account_key: Some(
                dir.path().join("missing.json").display().to_string(),
            ),
            ..Config::default()
        };
        assert!(matches!(
            SheetSource::from_config(&config),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_malformed_service_account_key_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("key.json");
        std::fs::write(&key, r#"{"type": "authorized_user"}"#).unwrap();
        let config = Config {
            spreadsheet_id: "sheet-id".to_string(),
            sheets_service_account_key: Some(key.display().to_string()),
            ..Config::default()
        };
        assert!(matches!(
            SheetSource::from_config(&config),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_access_token_is_used_without_service_account() {
        let config = Config {
            spreadsheet_id: "sheet-id".to_string(),
            sheets_access_token: Some("ya29.token".to_string()),
            ..Config::default()
        };
        let source = SheetSource::from_config(&config).unwrap();
        assert_eq!(
            source.bearer_token().await.unwrap().as_deref(),
            Some("ya29.token")
        );
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // 接受连接但从不响应
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            spreadsheet_id: "sheet-id".to_string(),
            sheets_api_base: format!("http://{}", addr),
            source_timeout_secs: 1,
            ..Config::default()
        };
        let source = SheetSource::from_config(&config).unwrap();

        let started = std::time::Instant::now();
        let result = source.fetch().await;
        assert!(matches!(result, Err(SourceError::Unavailable { .. })));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        server.abort();
    }
}
