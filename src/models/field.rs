use std::fmt::Display;

/// 表单字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 文本输入框
    Text,
    /// 下拉框，按可见文本选择
    Select,
    /// 单选按钮，按 value 选择
    Radio,
}

/// 一次字段赋值：目标字段、类型、最终写入的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub field_id: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl FieldAssignment {
    pub fn new(field_id: &'static str, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            field_id,
            kind,
            value: value.into(),
        }
    }

    /// 页面上定位该字段的 CSS 选择器
    pub fn selector(&self) -> String {
        match self.kind {
            FieldKind::Text | FieldKind::Select => format!("[name='{}']", self.field_id),
            FieldKind::Radio => format!(
                "input[name='{}'][value='{}']",
                self.field_id, self.value
            ),
        }
    }
}

impl Display for FieldAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field_id, self.value)
    }
}

/// 映射过程中的非致命问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingWarning {
    /// 出生日期无法解析，字段被跳过
    UnparsableDate { column: &'static str, raw: String },
    /// 手机号中没有任何数字，字段被跳过
    NoPhoneDigits { column: &'static str, raw: String },
}

impl Display for MappingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingWarning::UnparsableDate { column, raw } => {
                write!(f, "无法解析日期 ({}): {}", column, raw)
            }
            MappingWarning::NoPhoneDigits { column, raw } => {
                write!(f, "手机号中没有数字 ({}): {}", column, raw)
            }
        }
    }
}

/// 一条记录的映射结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPlan {
    pub assignments: Vec<FieldAssignment>,
    pub warnings: Vec<MappingWarning>,
    /// 来自记录数据（不含固定默认值）的赋值数量
    pub data_assignments: usize,
}
