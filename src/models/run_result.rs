//! 运行结果汇总

use std::fmt::Display;

use crate::error::SourceError;

/// 单条记录的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOutcome {
    /// 已填写并由操作员确认提交
    Completed,
    /// 缺少必需字段，未处理
    SkippedInvalid,
    /// 无法进入表单页
    FailedNavigation,
    /// 没有可填写的字段
    FailedFill,
    /// 浏览器或确认通道不可用，运行随之终止
    FailedFatal,
}

impl Display for RecordOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RecordOutcome::Completed => "完成",
            RecordOutcome::SkippedInvalid => "跳过(数据不完整)",
            RecordOutcome::FailedNavigation => "失败(无法进入表单)",
            RecordOutcome::FailedFill => "失败(无法填写)",
            RecordOutcome::FailedFatal => "失败(致命错误)",
        };
        f.write_str(text)
    }
}

/// 单条记录的处理报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub row: usize,
    pub identifier: String,
    pub outcome: RecordOutcome,
}

/// 运行提前终止的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAbort {
    /// 所有登录尝试均失败
    AuthFailed,
    /// 数据源不可用
    SourceUnavailable,
    /// 缺少必需列
    SchemaInvalid(Vec<String>),
    /// 数据源为空
    EmptyBatch,
    /// 操作员取消了运行
    Cancelled,
    /// 处理过程中出现无法恢复的错误
    Fatal(String),
}

impl From<&SourceError> for RunAbort {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::Unavailable { .. } => RunAbort::SourceUnavailable,
            SourceError::SchemaInvalid { missing } => RunAbort::SchemaInvalid(missing.clone()),
            SourceError::EmptyBatch => RunAbort::EmptyBatch,
        }
    }
}

impl Display for RunAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunAbort::AuthFailed => write!(f, "登录失败"),
            RunAbort::SourceUnavailable => write!(f, "数据源不可用"),
            RunAbort::SchemaInvalid(missing) => write!(f, "缺少必需列: {:?}", missing),
            RunAbort::EmptyBatch => write!(f, "没有待处理的记录"),
            RunAbort::Cancelled => write!(f, "运行已被取消"),
            RunAbort::Fatal(reason) => write!(f, "致命错误: {}", reason),
        }
    }
}

/// 一次运行的结果
///
/// 运行开始时创建，逐条追加，运行结束后只读。
/// 始终满足 `success + 非完成结果数 == total == outcomes.len()`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    batch_size: usize,
    success: usize,
    outcomes: Vec<RecordReport>,
    abort: Option<RunAbort>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    pub(crate) fn push(&mut self, row: usize, identifier: impl Into<String>, outcome: RecordOutcome) {
        if outcome == RecordOutcome::Completed {
            self.success += 1;
        }
        self.outcomes.push(RecordReport {
            row,
            identifier: identifier.into(),
            outcome,
        });
    }

    pub(crate) fn abort(&mut self, reason: RunAbort) {
        // 只保留第一个终止原因
        if self.abort.is_none() {
            self.abort = Some(reason);
        }
    }

    /// 已处理（含跳过）的记录数
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success(&self) -> usize {
        self.success
    }

    pub fn failed(&self) -> usize {
        self.total() - self.success
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn outcomes(&self) -> &[RecordReport] {
        &self.outcomes
    }

    /// 按顺序排列的结果类型
    pub fn outcome_kinds(&self) -> Vec<RecordOutcome> {
        self.outcomes.iter().map(|r| r.outcome).collect()
    }

    pub fn abort_reason(&self) -> Option<&RunAbort> {
        self.abort.as_ref()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_stay_consistent() {
        let mut result = RunResult::new();
        result.set_batch_size(4);
        result.push(2, "A", RecordOutcome::Completed);
        result.push(3, "B", RecordOutcome::SkippedInvalid);
        result.push(4, "C", RecordOutcome::FailedNavigation);

        assert_eq!(result.total(), 3);
        assert_eq!(result.success(), 1);
        assert_eq!(result.failed(), 2);
        assert!(result.total() <= result.batch_size());
        assert_eq!(
            result.outcome_kinds(),
            vec![
                RecordOutcome::Completed,
                RecordOutcome::SkippedInvalid,
                RecordOutcome::FailedNavigation
            ]
        );
    }

    #[test]
    fn test_first_abort_reason_wins() {
        let mut result = RunResult::new();
        result.abort(RunAbort::AuthFailed);
        result.abort(RunAbort::Cancelled);
        assert_eq!(result.abort_reason(), Some(&RunAbort::AuthFailed));
    }

    #[test]
    fn test_source_error_classification() {
        let err = SourceError::SchemaInvalid {
            missing: vec!["Date of Birth".to_string()],
        };
        assert_eq!(
            RunAbort::from(&err),
            RunAbort::SchemaInvalid(vec!["Date of Birth".to_string()])
        );
        assert_eq!(RunAbort::from(&SourceError::EmptyBatch), RunAbort::EmptyBatch);
    }
}
