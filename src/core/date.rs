use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// 可接受的日期格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub pattern: &'static str,
    /// 同一格式可接受的 chrono 寫法，依序嘗試
    chrono_formats: &'static [&'static str],
}

/// 依序嘗試的日期格式。順序是契約的一部分：`01/02/2023` 必須解析為 2 月 1 日。
pub const DATE_FORMATS: [DateFormat; 4] = [
    DateFormat {
        pattern: "yyyy-MM-dd",
        chrono_formats: &["%Y-%m-%d"],
    },
    DateFormat {
        pattern: "dd/MM/yyyy",
        chrono_formats: &["%d/%m/%Y"],
    },
    DateFormat {
        pattern: "MMM dd, yyyy",
        // 月份可寫縮寫或全名
        chrono_formats: &["%b %d, %Y", "%B %d, %Y"],
    },
    DateFormat {
        pattern: "MM/dd/yyyy",
        chrono_formats: &["%m/%d/%Y"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub instant: DateTime<Utc>,
    pub format: DateFormat,
}

impl ParsedDate {
    /// 標準化後的時間字串，例如 `2023-01-15T00:00:00Z`
    pub fn canonical(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

pub fn parse_date(raw: &str) -> Result<ParsedDate> {
    for format in DATE_FORMATS {
        // chrono 要求整個字串都被消耗，且日期必須真實存在
        let parsed = format
            .chrono_formats
            .iter()
            .find_map(|chrono_format| NaiveDate::parse_from_str(raw, chrono_format).ok());
        if let Some(date) = parsed {
            let instant = date.and_time(chrono::NaiveTime::MIN).and_utc();
            tracing::debug!("Parsed date '{}' with format {}", raw, format.pattern);
            return Ok(ParsedDate { instant, format });
        }
    }

    Err(EtlError::UnsupportedDateFormatError {
        value: raw.to_string(),
    })
}
