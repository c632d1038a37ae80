//! 应用入口 - 编排层
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：打开浏览器会话、创建数据源和人工确认通道
//! 2. **组装编排器**：把各层组件交给 [`RunCoordinator`]
//! 3. **运行**：返回本次运行的 [`RunResult`]
//!
//! 浏览器只由这里创建，之后完全交给 [`SessionController`] 持有。

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::browser;
use crate::config::{Config, Credentials};
use crate::models::loaders::source_from_config;
use crate::models::run_result::RunResult;
use crate::orchestrator::run_coordinator::RunCoordinator;
use crate::services::{ConsoleGate, RunObserver, SessionController, TracingObserver};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    coordinator: RunCoordinator,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let source = source_from_config(&config)?;
        info!("📋 数据源: {}", source.describe());

        let session = browser::open_session(&config).await?;
        info!("✓ 浏览器会话已就绪");

        let observer: Arc<dyn RunObserver> =
            Arc::new(TracingObserver::new(config.audit_file.clone()));
        let controller = SessionController::new(Box::new(session), &config, observer.clone());
        let coordinator = RunCoordinator::new(
            controller,
            source,
            Arc::new(ConsoleGate::new()),
            observer,
            &config,
        );

        Ok(Self { coordinator })
    }

    /// 使用外部的取消令牌
    pub fn with_cancellation(self, cancellation: CancellationToken) -> Self {
        Self {
            coordinator: self.coordinator.with_cancellation(cancellation),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(self, credentials: &Credentials) -> RunResult {
        self.coordinator.run(credentials).await
    }
}
