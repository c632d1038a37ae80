//! 记录处理上下文
//!
//! 封装"我正在处理第几位学员"这一信息

use std::fmt::Display;

use crate::models::record::Record;

/// 记录处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 在批次中的位置（从1开始）
    pub index: usize,

    /// 批次总数
    pub total: usize,

    /// 表格行号
    pub row: usize,

    /// 学员姓名或行号
    pub identifier: String,
}

impl RecordCtx {
    pub fn new(record: &Record, index: usize, total: usize) -> Self {
        Self {
            index,
            total,
            row: record.row(),
            identifier: record.identifier(),
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学员 {}/{}]", self.index, self.total)
    }
}
