//! 学员记录与批次
//!
//! 一条 [`Record`] 对应表格中的一行，一个 [`Batch`] 是本次运行读取到的全部行。

use std::collections::HashMap;
use std::fmt::Display;

use crate::error::SourceError;

/// 学员姓名列
pub const STUDENT_NAME: &str = "Student Name";
/// 手机号列
pub const PHONE_NUMBER: &str = "Phone Number";
/// 出生日期列
pub const DATE_OF_BIRTH: &str = "Date of Birth";

/// 处理一条记录所必需的列
pub const REQUIRED_COLUMNS: [&str; 3] = [STUDENT_NAME, PHONE_NUMBER, DATE_OF_BIRTH];

/// 表格中的一行学员数据
///
/// 创建后不可修改；列名已去除首尾空白，值保持原样。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    row: usize,
    fields: HashMap<String, String>,
}

impl Record {
    /// 创建记录
    ///
    /// # 参数
    /// - `row`: 在表格中的行号（表头为第 1 行）
    /// - `fields`: 列名到原始值的映射
    pub fn new<K, V>(row: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into().trim().to_string(), v.into()))
            .collect();
        Self { row, fields }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// 原始值（可能为空字符串）
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// 去除空白后的非空值，空白或缺失时返回 `None`
    pub fn value(&self, column: &str) -> Option<&str> {
        self.raw(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// 缺失或为空的必需列
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| self.value(column).is_none())
            .collect()
    }

    /// 必需列齐全时才允许进入表单处理
    pub fn is_eligible(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// 所有列都为空
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }

    /// 用于日志和结果汇总的标识
    pub fn identifier(&self) -> String {
        match self.value(STUDENT_NAME) {
            Some(name) => name.to_string(),
            None => format!("第 {} 行", self.row),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[第 {} 行 {}]", self.row, self.identifier())
    }
}

/// 一次运行读取到的全部记录，保持表格中的顺序
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// 由表头和数据行构建批次
    ///
    /// 表头去除首尾空白后检查必需列；比表头短的行用空值补齐。
    /// 没有表头或没有数据行时返回 [`SourceError::EmptyBatch`]。
    pub fn from_table(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, SourceError> {
        if headers.is_empty() {
            return Err(SourceError::EmptyBatch);
        }

        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !headers.iter().any(|h| h == *required))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SourceError::SchemaInvalid { missing });
        }

        if rows.is_empty() {
            return Err(SourceError::EmptyBatch);
        }

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                row.resize(headers.len(), String::new());
                // 表头占第 1 行
                Record::new(idx + 2, headers.iter().cloned().zip(row))
            })
            .collect();

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
