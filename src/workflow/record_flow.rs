//! 记录处理流程 - 流程层
//!
//! 核心职责：定义"一位学员"的完整处理流程
//!
//! 状态顺序：
//! 1. Start → 打开表单页
//! 2. NavigatedToForm → 逐个填写字段（单个字段失败只跳过该字段）
//! 3. FieldsApplied → 截图留档
//! 4. AwaitingManualCompletion → 等待操作员上传照片并提交
//! 5. Done
//!
//! 任一步骤失败进入 `Failed`，由编排层决定是否继续下一条。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::ConfirmationError;
use crate::models::field::FieldPlan;
use crate::models::record::Record;
use crate::models::run_result::RecordOutcome;
use crate::services::observer::{ObserverEvent, RunObserver};
use crate::services::{FieldMapper, OperatorGate, SessionController};
use crate::utils::logging::truncate_text;
use crate::workflow::record_ctx::RecordCtx;

/// 单条记录的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Start,
    NavigatedToForm,
    FieldsApplied,
    AwaitingManualCompletion,
    Done,
    Failed(RecordOutcome),
}

impl RecordState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Done | RecordState::Failed(_))
    }
}

/// 记录处理流程
///
/// - 驱动单条记录的状态机
/// - 不持有浏览器，只通过 SessionController 操作页面
/// - 不决定是否继续下一条记录
pub struct RecordFlow {
    mapper: FieldMapper,
    gate: Arc<dyn OperatorGate>,
    observer: Arc<dyn RunObserver>,
}

impl RecordFlow {
    pub fn new(gate: Arc<dyn OperatorGate>, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            mapper: FieldMapper::new(),
            gate,
            observer,
        }
    }

    /// 处理一条已通过必填检查的记录
    pub async fn run(
        &self,
        controller: &mut SessionController,
        record: &Record,
        ctx: &RecordCtx,
    ) -> RecordOutcome {
        let plan = self.mapper.map(record);
        let mut state = RecordState::Start;

        loop {
            let next = match state {
                RecordState::Start => self.open_form(controller, ctx).await,
                RecordState::NavigatedToForm => {
                    self.fill_fields(controller, record, &plan, ctx).await
                }
                RecordState::FieldsApplied => {
                    controller
                        .snapshot(
                            &format!("form_filled_{}", ctx.row),
                            format!("{} 表单已填写: {}", ctx, ctx.identifier),
                        )
                        .await;
                    RecordState::AwaitingManualCompletion
                }
                RecordState::AwaitingManualCompletion => self.wait_for_operator(ctx).await,
                RecordState::Done => return RecordOutcome::Completed,
                RecordState::Failed(outcome) => return outcome,
            };
            debug!("{} 状态: {:?} → {:?}", ctx, state, next);
            state = next;
        }
    }

    async fn open_form(&self, controller: &mut SessionController, ctx: &RecordCtx) -> RecordState {
        match controller.navigate_to_form().await {
            Ok(()) => {
                info!("{} ✓ 已进入表单页", ctx);
                RecordState::NavigatedToForm
            }
            Err(e) => {
                error!("{} 无法进入表单页: {}", ctx, e);
                controller
                    .snapshot(
                        &format!("error_{}", ctx.row),
                        format!("{} 进入表单页失败: {}", ctx, e),
                    )
                    .await;
                RecordState::Failed(RecordOutcome::FailedNavigation)
            }
        }
    }

    async fn fill_fields(
        &self,
        controller: &SessionController,
        record: &Record,
        plan: &FieldPlan,
        ctx: &RecordCtx,
    ) -> RecordState {
        for warning in &plan.warnings {
            warn!("{} {}", ctx, warning);
        }

        if plan.data_assignments == 0 && !record.is_blank() {
            error!("{} 记录中没有可填写的字段", ctx);
            self.observer.on_event(&ObserverEvent::error(format!(
                "{} {} 没有可填写的字段",
                ctx, ctx.identifier
            )));
            return RecordState::Failed(RecordOutcome::FailedFill);
        }

        let mut filled = 0;
        for assignment in &plan.assignments {
            match controller.apply(assignment).await {
                Ok(()) => {
                    filled += 1;
                    debug!(
                        "{} 已填写 {} = {}",
                        ctx,
                        assignment.field_id,
                        truncate_text(&assignment.value, 40)
                    );
                }
                Err(e) => warn!("{} 无法填写 {}: {}", ctx, assignment.field_id, e),
            }
        }
        info!(
            "{} 字段填写完成: {}/{}",
            ctx,
            filled,
            plan.assignments.len()
        );

        RecordState::FieldsApplied
    }

    async fn wait_for_operator(&self, ctx: &RecordCtx) -> RecordState {
        info!("{} ⏸ 等待操作员上传照片并提交...", ctx);
        match self.gate.confirm(ctx).await {
            Ok(()) => {
                self.observer.on_event(&ObserverEvent::info(format!(
                    "{} ✓ 已完成: {}",
                    ctx, ctx.identifier
                )));
                RecordState::Done
            }
            Err(ConfirmationError::ChannelClosed) => {
                error!("{} 人工确认通道已关闭，无法继续", ctx);
                RecordState::Failed(RecordOutcome::FailedFatal)
            }
            Err(e) => {
                error!("{} 等待人工确认失败: {}", ctx, e);
                RecordState::Failed(RecordOutcome::FailedFatal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RecordState::Done.is_terminal());
        assert!(RecordState::Failed(RecordOutcome::FailedFill).is_terminal());
        assert!(!RecordState::Start.is_terminal());
        assert!(!RecordState::AwaitingManualCompletion.is_terminal());
    }
}
