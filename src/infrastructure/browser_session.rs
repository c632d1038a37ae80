//! 浏览器会话能力 - 基础设施层
//!
//! 上层只通过这个 trait 操作浏览器，不直接接触 chromiumoxide。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::InteractionError;

/// 已确认存在于页面上的元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    selector: String,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/// 一个可控制的浏览器会话
///
/// 所有等待都有上限；所有操作失败时返回 [`InteractionError`]。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 打开 URL
    async fn load(&self, url: &str) -> Result<(), InteractionError>;

    /// 等待元素出现，超时返回 `ElementTimeout`
    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, InteractionError>;

    /// 等待元素可见且可操作（未禁用、非只读），超时返回 `ElementTimeout`
    async fn wait_for_interactive(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, InteractionError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), InteractionError>;

    /// 清空并写入文本
    async fn set_value(&self, element: &ElementHandle, text: &str) -> Result<(), InteractionError>;

    /// 按可见文本选择下拉框选项（完全匹配）
    async fn select_by_label(
        &self,
        element: &ElementHandle,
        label: &str,
    ) -> Result<(), InteractionError>;

    async fn current_url(&self) -> Result<String, InteractionError>;

    /// 在 `timeout` 内等待并接受一个 JS 弹窗，返回弹窗文本；没有弹窗时返回 `None`
    async fn dismiss_dialog(&self, timeout: Duration) -> Result<Option<String>, InteractionError>;

    /// 保存截图，返回文件路径
    async fn capture_snapshot(&self, label: &str) -> Result<PathBuf, InteractionError>;

    /// 释放浏览器资源
    async fn close(&mut self) -> Result<(), InteractionError>;
}
