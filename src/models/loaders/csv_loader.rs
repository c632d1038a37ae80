use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::error::SourceError;
use crate::models::loaders::RecordSource;
use crate::models::record::Batch;

/// 本地 CSV 数据源（表格导出文件）
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn fetch(&self) -> Result<Batch, SourceError> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| SourceError::unavailable(self.path.display().to_string(), e))?;

        let batch = parse_csv(&bytes)?;
        info!(
            "✓ 从 {} 读取到 {} 条记录",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            batch.len()
        );
        Ok(batch)
    }

    fn describe(&self) -> String {
        format!("CSV 文件 {}", self.path.display())
    }
}

pub(crate) fn parse_csv(bytes: &[u8]) -> Result<Batch, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    // 完全空的文件没有表头
    let headers = if headers.iter().all(|h| h.trim().is_empty()) {
        Vec::new()
    } else {
        headers
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Batch::from_table(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{DATE_OF_BIRTH, STUDENT_NAME};
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "\u{feff}Student Name,Phone Number ,Date of Birth,District\n\
             Rahim,1712345678,05/04/2001,Dhaka\n\
             Karim,01811111111,2002-01-09\n"
        )
        .unwrap();

        let batch = CsvSource::new(file.path()).fetch().await.unwrap();
        assert_eq!(batch.len(), 2);

        let first = batch.iter().next().unwrap();
        assert_eq!(first.value(STUDENT_NAME), Some("Rahim"));
        assert_eq!(first.value(DATE_OF_BIRTH), Some("05/04/2001"));
        assert_eq!(first.value("Phone Number"), Some("1712345678"));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(dir.path().join("nope.csv"));
        let result = tokio_test::block_on(source.fetch());
        assert!(matches!(result, Err(SourceError::Unavailable { .. })));
    }

    #[test]
    fn test_missing_column_is_schema_invalid() {
        let result = parse_csv(b"Student Name,Date of Birth\nRahim,2001-01-01\n");
        assert!(matches!(result, Err(SourceError::SchemaInvalid { .. })));
    }

    #[test]
    fn test_empty_file_is_empty_batch() {
        assert!(matches!(parse_csv(b""), Err(SourceError::EmptyBatch)));
        assert!(matches!(
            parse_csv(b"Student Name,Phone Number,Date of Birth\n"),
            Err(SourceError::EmptyBatch)
        ));
    }
}
