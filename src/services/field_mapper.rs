//! 字段映射服务 - 业务能力层
//!
//! 只负责"表格行 → 表单字段"的转换，不接触浏览器

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::field::{FieldAssignment, FieldKind, FieldPlan, MappingWarning};
use crate::models::record::{self, Record};

/// 写入前对原始值的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Normalize {
    Raw,
    Phone,
    Date,
}

/// 一列到一个表单字段的映射规则
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    column: &'static str,
    field_id: &'static str,
    kind: FieldKind,
    normalize: Normalize,
}

const fn rule(
    column: &'static str,
    field_id: &'static str,
    kind: FieldKind,
    normalize: Normalize,
) -> FieldRule {
    FieldRule {
        column,
        field_id,
        kind,
        normalize,
    }
}

/// 按填写顺序排列：先下拉框，再文本，最后出生日期
const FIELD_RULES: &[FieldRule] = &[
    rule("District", "District", FieldKind::Select, Normalize::Raw),
    rule("Batch", "Batch", FieldKind::Select, Normalize::Raw),
    rule("Your Class Group", "Group", FieldKind::Select, Normalize::Raw),
    rule("Gender", "Gender", FieldKind::Select, Normalize::Raw),
    rule("Religion", "Religion", FieldKind::Select, Normalize::Raw),
    rule(record::STUDENT_NAME, "StuName", FieldKind::Text, Normalize::Raw),
    rule("Father Name", "FatherName", FieldKind::Text, Normalize::Raw),
    rule("Mother Name", "MotherName", FieldKind::Text, Normalize::Raw),
    rule("Age", "Age", FieldKind::Text, Normalize::Raw),
    rule(
        "About yourself/ Your Freelance Profile Description",
        "About",
        FieldKind::Text,
        Normalize::Raw,
    ),
    rule(record::PHONE_NUMBER, "Contact", FieldKind::Text, Normalize::Phone),
    rule("E-mail", "Email", FieldKind::Text, Normalize::Raw),
    rule("NID/Birth Certificate No", "NidNo", FieldKind::Text, Normalize::Raw),
    rule("Blood Group", "BloodGrp", FieldKind::Text, Normalize::Raw),
    rule("Profession", "Profession", FieldKind::Text, Normalize::Raw),
    rule("Present Address", "Address", FieldKind::Text, Normalize::Raw),
    rule("Permanent Address", "PermaAddress", FieldKind::Text, Normalize::Raw),
    rule("Last Academic Qualification", "EduQual", FieldKind::Text, Normalize::Raw),
    rule("Passing Year", "PassYear", FieldKind::Text, Normalize::Raw),
    rule(record::DATE_OF_BIRTH, "Dob", FieldKind::Text, Normalize::Date),
];

/// 无论记录内容如何都会追加的单选项："是否有电脑" 固定为 No
pub const FIXED_RADIO_FIELD: &str = "Computer";
pub const FIXED_RADIO_VALUE: &str = "No";

/// 纯文本日期格式，月在前的格式排在日在前之前
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// 字段映射服务
///
/// 职责：
/// - 把一条记录转换为有序的字段赋值列表
/// - 空值不生成赋值（页面上的字段保持原样）
/// - 无副作用，同一条记录多次映射结果相同
pub struct FieldMapper {
    rules: &'static [FieldRule],
}

impl FieldMapper {
    pub fn new() -> Self {
        Self { rules: FIELD_RULES }
    }

    /// 映射一条记录
    pub fn map(&self, record: &Record) -> FieldPlan {
        let mut plan = FieldPlan::default();

        for rule in self.rules {
            let Some(raw) = record.value(rule.column) else {
                continue;
            };

            let value = match rule.normalize {
                Normalize::Raw => Some(raw.to_string()),
                Normalize::Phone => {
                    let phone = normalize_phone(raw);
                    if phone.is_empty() {
                        plan.warnings.push(MappingWarning::NoPhoneDigits {
                            column: rule.column,
                            raw: raw.to_string(),
                        });
                        None
                    } else {
                        Some(phone)
                    }
                }
                Normalize::Date => {
                    let date = normalize_date(raw);
                    if date.is_none() {
                        plan.warnings.push(MappingWarning::UnparsableDate {
                            column: rule.column,
                            raw: raw.to_string(),
                        });
                    }
                    date
                }
            };

            if let Some(value) = value {
                plan.assignments
                    .push(FieldAssignment::new(rule.field_id, rule.kind, value));
            }
        }

        plan.data_assignments = plan.assignments.len();
        plan.assignments.push(FieldAssignment::new(
            FIXED_RADIO_FIELD,
            FieldKind::Radio,
            FIXED_RADIO_VALUE,
        ));

        plan
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

fn non_digit() -> &'static Regex {
    static NON_DIGIT: OnceLock<Regex> = OnceLock::new();
    NON_DIGIT.get_or_init(|| Regex::new(r"\D").expect("静态正则表达式"))
}

/// 手机号规范化
///
/// 去掉所有非数字字符；恰好 10 位且以 `1` 开头时补上被表格吞掉的前导 `0`。
pub fn normalize_phone(raw: &str) -> String {
    let digits = non_digit().replace_all(raw, "").into_owned();
    if digits.chars().count() == 10 && digits.starts_with('1') {
        format!("0{}", digits)
    } else {
        digits
    }
}

/// 出生日期规范化为 `YYYY-MM-DD`，无法解析时返回 `None`
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })?;

    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{DATE_OF_BIRTH, PHONE_NUMBER, STUDENT_NAME};

    fn full_record() -> Record {
        Record::new(
            2,
            [
                (STUDENT_NAME, "Rahim Uddin"),
                (PHONE_NUMBER, "1712345678"),
                (DATE_OF_BIRTH, "2001-04-05"),
                ("District", "Dhaka"),
                ("Gender", "Male"),
                ("Father Name", ""),
                ("E-mail", "  rahim@example.com "),
            ],
        )
    }

    fn field_ids(plan: &FieldPlan) -> Vec<&'static str> {
        plan.assignments.iter().map(|a| a.field_id).collect()
    }

    #[test]
    fn test_phone_with_missing_leading_zero() {
        assert_eq!(normalize_phone("1234567890"), "01234567890");
        assert_eq!(normalize_phone("171-234-5678"), "01712345678");
    }

    #[test]
    fn test_phone_other_lengths_only_strip() {
        assert_eq!(normalize_phone("+880-171-2345678"), "8801712345678");
        assert_eq!(normalize_phone("01712345678"), "01712345678");
        assert_eq!(normalize_phone("2345678901"), "2345678901");
        assert_eq!(normalize_phone("123456789"), "123456789");
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(normalize_date("2001-04-05").as_deref(), Some("2001-04-05"));
        assert_eq!(normalize_date("05/04/2001").as_deref(), Some("2001-05-04"));
        assert_eq!(normalize_date("25/12/2000").as_deref(), Some("2000-12-25"));
        assert_eq!(normalize_date("12 March 2002").as_deref(), Some("2002-03-12"));
        assert_eq!(normalize_date("Mar 12, 2002").as_deref(), Some("2002-03-12"));
        assert_eq!(
            normalize_date("2001-04-05 00:00:00").as_deref(),
            Some("2001-04-05")
        );
        assert_eq!(normalize_date("sometime in 2001"), None);
    }

    #[test]
    fn test_map_orders_fields_and_skips_blanks() {
        let plan = FieldMapper::new().map(&full_record());

        assert_eq!(
            field_ids(&plan),
            vec!["District", "Gender", "StuName", "Contact", "Email", "Dob", "Computer"]
        );
        assert_eq!(plan.data_assignments, 6);
        assert!(plan.warnings.is_empty());

        let contact = &plan.assignments[3];
        assert_eq!(contact.value, "01712345678");
        assert_eq!(contact.kind, FieldKind::Text);

        let email = &plan.assignments[4];
        assert_eq!(email.value, "rahim@example.com");
    }

    #[test]
    fn test_fixed_radio_always_last() {
        let plan = FieldMapper::new().map(&Record::new(5, [("Unrelated", "x")]));
        assert_eq!(plan.data_assignments, 0);
        assert_eq!(
            plan.assignments,
            vec![FieldAssignment::new("Computer", FieldKind::Radio, "No")]
        );
    }

    #[test]
    fn test_bad_date_is_warning_not_failure() {
        let record = Record::new(
            2,
            [
                (STUDENT_NAME, "Karim"),
                (PHONE_NUMBER, "01811111111"),
                (DATE_OF_BIRTH, "unknown"),
            ],
        );
        let plan = FieldMapper::new().map(&record);

        assert_eq!(field_ids(&plan), vec!["StuName", "Contact", "Computer"]);
        assert_eq!(
            plan.warnings,
            vec![MappingWarning::UnparsableDate {
                column: DATE_OF_BIRTH,
                raw: "unknown".to_string(),
            }]
        );
    }

    #[test]
    fn test_phone_without_digits_is_skipped() {
        let record = Record::new(2, [(PHONE_NUMBER, "n/a")]);
        let plan = FieldMapper::new().map(&record);
        assert_eq!(field_ids(&plan), vec!["Computer"]);
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let mapper = FieldMapper::new();
        let record = full_record();
        assert_eq!(mapper.map(&record), mapper.map(&record));
    }

    #[test]
    fn test_select_keeps_raw_label() {
        let record = Record::new(2, [("Your Class Group", "Web Design")]);
        let plan = FieldMapper::new().map(&record);
        assert_eq!(
            plan.assignments[0],
            FieldAssignment::new("Group", FieldKind::Select, "Web Design")
        );
        assert_eq!(plan.assignments[0].selector(), "[name='Group']");
    }
}
