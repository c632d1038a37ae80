//! 运行编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **登录**：带重试地登录一次
//! 2. **读取数据**：只读取一次数据源
//! 3. **逐条处理**：按表格顺序处理，每条之前回到首页
//! 4. **统计**：汇总每条记录的结果
//! 5. **清理**：无论如何结束，都只调用一次 teardown

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, Credentials};
use crate::models::loaders::RecordSource;
use crate::models::run_result::{RecordOutcome, RunAbort, RunResult};
use crate::services::observer::{ObserverEvent, RunObserver};
use crate::services::{OperatorGate, SessionController};
use crate::utils::logging;
use crate::workflow::{RecordCtx, RecordFlow};

/// 运行编排器
///
/// 持有会话控制器；`run` 消耗编排器，保证一次运行只清理一次。
pub struct RunCoordinator {
    controller: SessionController,
    source: Box<dyn RecordSource>,
    flow: RecordFlow,
    observer: Arc<dyn RunObserver>,
    cancellation: CancellationToken,
    auth_max_attempts: u32,
    retry_delay: Duration,
    log_file: String,
}

impl RunCoordinator {
    pub fn new(
        controller: SessionController,
        source: Box<dyn RecordSource>,
        gate: Arc<dyn OperatorGate>,
        observer: Arc<dyn RunObserver>,
        config: &Config,
    ) -> Self {
        Self {
            controller,
            source,
            flow: RecordFlow::new(gate, observer.clone()),
            observer,
            cancellation: CancellationToken::new(),
            auth_max_attempts: config.auth_max_attempts.max(1),
            retry_delay: config.retry_delay(),
            log_file: config.output_log_file.clone(),
        }
    }

    /// 使用外部的取消令牌（例如 Ctrl-C）
    ///
    /// 令牌只在两条记录之间检查，不会打断正在填写或等待确认的记录。
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// 执行一次完整运行
    pub async fn run(self, credentials: &Credentials) -> RunResult {
        let Self {
            mut controller,
            source,
            flow,
            observer,
            cancellation,
            auth_max_attempts,
            retry_delay,
            log_file,
        } = self;

        let mut result = RunResult::new();
        let mut in_flight: Option<RecordCtx> = None;
        let plan = RunPlan {
            source: source.as_ref(),
            flow: &flow,
            observer: observer.as_ref(),
            cancellation: &cancellation,
            auth_max_attempts,
            retry_delay,
        };

        let outcome = AssertUnwindSafe(plan.drive(
            &mut controller,
            credentials,
            &mut result,
            &mut in_flight,
        ))
        .catch_unwind()
        .await;

        let abort = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(abort)) => Some(abort),
            Err(_) => {
                // 处理中的记录没有机会写入结果
                if let Some(ctx) = in_flight.take() {
                    error!("{} 处理过程中发生意外错误", ctx);
                    result.push(ctx.row, &ctx.identifier, RecordOutcome::FailedFatal);
                }
                Some(RunAbort::Fatal("处理过程中发生意外错误".to_string()))
            }
        };

        if let Some(abort) = abort {
            let event = ObserverEvent::error(format!("⛔ 运行中止: {}", abort));
            let event = match controller.snapshot("run_aborted", "运行中止时的页面").await {
                Some(path) => event.with_snapshot(path),
                None => event,
            };
            observer.on_event(&event);
            result.abort(abort);
        }

        controller.teardown().await;
        logging::print_final_stats(&result, &log_file);
        result
    }
}

/// 一次运行中借用的协作者
struct RunPlan<'a> {
    source: &'a dyn RecordSource,
    flow: &'a RecordFlow,
    observer: &'a dyn RunObserver,
    cancellation: &'a CancellationToken,
    auth_max_attempts: u32,
    retry_delay: Duration,
}

impl RunPlan<'_> {
    async fn drive(
        &self,
        controller: &mut SessionController,
        credentials: &Credentials,
        result: &mut RunResult,
        in_flight: &mut Option<RecordCtx>,
    ) -> Result<(), RunAbort> {
        self.authenticate(controller, credentials).await?;

        info!("\n📁 正在读取数据源: {}", self.source.describe());
        let batch = self.source.fetch().await.map_err(|e| {
            error!("读取数据源失败: {}", e);
            RunAbort::from(&e)
        })?;

        if batch.is_empty() {
            warn!("⚠️ 数据源中没有学员记录，程序结束");
            return Err(RunAbort::EmptyBatch);
        }

        let total = batch.len();
        result.set_batch_size(total);
        logging::log_batch_loaded(total, &self.source.describe());

        for (idx, record) in batch.iter().enumerate() {
            // 只在两条记录之间响应取消
            if self.cancellation.is_cancelled() {
                warn!("收到取消请求，停止处理剩余 {} 位学员", total - idx);
                return Err(RunAbort::Cancelled);
            }

            let ctx = RecordCtx::new(record, idx + 1, total);
            logging::log_record_start(ctx.index, ctx.total, &ctx.identifier);

            if !record.is_eligible() {
                warn!("{} 缺少必填字段 {:?}，跳过", ctx, record.missing_required());
                result.push(ctx.row, &ctx.identifier, RecordOutcome::SkippedInvalid);
                continue;
            }

            *in_flight = Some(ctx.clone());
            if let Err(e) = controller.reset_to_dashboard().await {
                error!("{} 无法回到首页: {}", ctx, e);
                result.push(ctx.row, &ctx.identifier, RecordOutcome::FailedFatal);
                return Err(RunAbort::Fatal(format!("无法回到首页: {}", e)));
            }

            let outcome = self.flow.run(controller, record, &ctx).await;
            *in_flight = None;
            result.push(ctx.row, &ctx.identifier, outcome);

            match outcome {
                RecordOutcome::Completed => info!("{} ✅ 已完成 {}", ctx, ctx.identifier),
                RecordOutcome::FailedFatal => {
                    return Err(RunAbort::Fatal(format!("{} 处理中断", ctx)));
                }
                other => {
                    self.observer.on_event(&ObserverEvent::warn(format!(
                        "{} {}: {}",
                        ctx, ctx.identifier, other
                    )));
                }
            }
        }

        Ok(())
    }

    async fn authenticate(
        &self,
        controller: &mut SessionController,
        credentials: &Credentials,
    ) -> Result<(), RunAbort> {
        for attempt in 1..=self.auth_max_attempts {
            match controller.authenticate(credentials).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "登录失败 (尝试 {}/{}): {}",
                        attempt, self.auth_max_attempts, e
                    );
                    if attempt < self.auth_max_attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        error!("登录失败，已重试 {} 次", self.auth_max_attempts);
        Err(RunAbort::AuthFailed)
    }
}
