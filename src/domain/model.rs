use crate::utils::error::ErrorCategory;
use serde::Serialize;

/// 一行已切分好的 CSV 欄位，驗證前長度不固定
pub type Row = Vec<String>;

/// 通過欄位驗證後的記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub company: String,
    pub user_id: String,
    pub full_name: String,
    pub register_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub given: String,
    pub surname: String,
}

/// 模板佔位符的值，鍵固定為 `userId`、`firstName`、`lastName`、`registerDate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFields {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub register_date: String,
}

impl NormalizedFields {
    pub const USER_ID: &'static str = "userId";
    pub const FIRST_NAME: &'static str = "firstName";
    pub const LAST_NAME: &'static str = "lastName";
    pub const REGISTER_DATE: &'static str = "registerDate";

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            Self::USER_ID => Some(&self.user_id),
            Self::FIRST_NAME => Some(&self.first_name),
            Self::LAST_NAME => Some(&self.last_name),
            Self::REGISTER_DATE => Some(&self.register_date),
            _ => None,
        }
    }
}

/// 同一公司的記錄，保持輸入順序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyGroup {
    pub company: String,
    pub records: Vec<Record>,
}

/// 待處理的輸入檔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// 去掉副檔名的檔名，用來產生輸出檔名
    pub fn stem(&self) -> &str {
        std::path::Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub source: SourceFile,
    pub raw_content: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub xml: String,
    pub record_count: usize,
    pub company_count: usize,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub source: SourceFile,
    pub output: TransformOutput,
}

/// 交給錯誤輸出端的結構化報告
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub file_name: String,
    pub category: ErrorCategory,
    pub kind: String,
    pub message: String,
    pub raw_content: Option<String>,
}

impl ErrorReport {
    pub fn to_text(&self) -> String {
        let mut out = format!("{}:\n{}\n", self.category.heading(), self.message);
        if self.category == ErrorCategory::System {
            out.push_str(&format!("Error kind: {}\n", self.kind));
        }
        if let Some(raw) = &self.raw_content {
            out.push_str("\nOriginal content:\n");
            out.push_str(raw);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written { output_path: String },
    Rejected { error_path: String, kind: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: Vec<String>,
    pub rejected: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.rejected.len() + self.failed.len()
    }
}
