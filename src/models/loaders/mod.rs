//! 学员数据源
//!
//! 只负责"读取表格"能力：连接数据源、检查表头、产出 [`Batch`]。

pub mod csv_loader;
pub mod sheet_loader;

use async_trait::async_trait;

use crate::config::{Config, SourceKind};
use crate::error::SourceError;
use crate::models::record::Batch;

pub use csv_loader::CsvSource;
pub use sheet_loader::SheetSource;

/// 只读的记录来源
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// 读取全部记录
    ///
    /// 无法访问时返回 `Unavailable`，缺少必需列时返回 `SchemaInvalid`，
    /// 没有数据行时返回 `EmptyBatch`。
    async fn fetch(&self) -> Result<Batch, SourceError>;

    /// 用于日志显示的数据源描述
    fn describe(&self) -> String;
}

/// 按配置创建数据源
pub fn source_from_config(config: &Config) -> Result<Box<dyn RecordSource>, SourceError> {
    Ok(match config.source_kind {
        SourceKind::Sheets => Box::new(SheetSource::from_config(config)?),
        SourceKind::Csv => Box::new(CsvSource::new(&config.csv_path)),
    })
}
