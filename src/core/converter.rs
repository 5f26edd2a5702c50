use crate::domain::model::{Record, Row};

impl Record {
    /// 依欄位位置轉換：公司、使用者 ID、姓名、註冊日期。
    ///
    /// # Panics
    ///
    /// 呼叫前必須先通過 `validate_columns`。少於 4 個欄位屬於程式錯誤而非資料錯誤，會直接 panic。
    pub fn from_row(mut row: Row) -> Self {
        Self {
            company: std::mem::take(&mut row[0]),
            user_id: std::mem::take(&mut row[1]),
            full_name: std::mem::take(&mut row[2]),
            register_date: std::mem::take(&mut row[3]),
        }
    }
}

/// 將已驗證的行轉為記錄，保持順序
pub fn convert_rows(rows: Vec<Row>) -> Vec<Record> {
    rows.into_iter().map(Record::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_mapping() {
        let rows = vec![vec![
            "Acme".to_string(),
            "U1".to_string(),
            "John Smith".to_string(),
            "2023-01-15".to_string(),
        ]];
        let records = convert_rows(rows);
        assert_eq!(
            records,
            vec![Record {
                company: "Acme".to_string(),
                user_id: "U1".to_string(),
                full_name: "John Smith".to_string(),
                register_date: "2023-01-15".to_string(),
            }]
        );
    }

    #[test]
    #[should_panic]
    fn test_unvalidated_short_row_panics() {
        Record::from_row(vec!["Acme".to_string(), "U1".to_string()]);
    }
}
