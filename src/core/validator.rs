use crate::domain::model::Row;
use crate::utils::error::{ColumnViolation, EtlError, Result};

pub const EXPECTED_COLUMNS: usize = 4;

/// 檢查每一行的欄位數量。
///
/// 會掃描所有行後才回報錯誤，`ColumnMismatchError` 帶有全部違規行（行號從 1 開始）。
/// 成功時回傳總行數。
pub fn validate_columns(rows: &[Row]) -> Result<usize> {
    tracing::info!("Validating CSV column layout");

    if rows.is_empty() {
        tracing::error!("Validation failed: empty CSV input");
        return Err(EtlError::EmptyInputError);
    }

    let violations: Vec<ColumnViolation> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.len() != EXPECTED_COLUMNS)
        .map(|(index, row)| ColumnViolation {
            row: index + 1,
            expected: EXPECTED_COLUMNS,
            actual: row.len(),
        })
        .collect();

    if !violations.is_empty() {
        for violation in &violations {
            tracing::error!("Validation failed: {}", violation);
        }
        return Err(EtlError::ColumnMismatchError { violations });
    }

    tracing::info!("CSV contains {} valid rows", rows.len());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_all_rows_with_four_columns_pass() {
        let rows = vec![
            row(&["Acme", "U1", "John Smith", "2023-01-15"]),
            row(&["Acme", "U2", "张三", "15/06/2022"]),
        ];
        assert_eq!(validate_columns(&rows).unwrap(), 2);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(validate_columns(&[]), Err(EtlError::EmptyInputError)));
    }

    #[test]
    fn test_every_bad_row_is_reported() {
        let rows = vec![
            row(&["Acme", "U1", "John Smith", "2023-01-15"]),
            row(&["Acme", "U2", "Jane Doe"]),
            row(&["Acme", "U3", "Bob Lee", "2023-01-15"]),
            row(&["Acme", "U4", "Ann Ray", "2023-01-15", "extra"]),
            row(&[""]),
        ];

        match validate_columns(&rows) {
            Err(EtlError::ColumnMismatchError { violations }) => {
                assert_eq!(violations.len(), 3);
                assert_eq!(
                    violations[0],
                    ColumnViolation { row: 2, expected: 4, actual: 3 }
                );
                assert_eq!(violations[1].row, 4);
                assert_eq!(violations[1].actual, 5);
                assert_eq!(violations[2].row, 5);
                assert_eq!(violations[2].actual, 1);
            }
            other => panic!("expected column mismatch, got {:?}", other),
        }
    }
}
