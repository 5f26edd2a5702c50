use crate::domain::model::NameParts;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use std::sync::LazyLock;

static CHINESE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\u{4e00}-\u{9fa5}]+$").expect("valid CJK pattern"));

/// 拆分全名為名與姓。
///
/// - 整串都是漢字：第一個字為姓，其餘為名，至少需要 2 個字。
/// - 其他情況視為西式姓名：以空白切分，第一段為名，最後一段為姓。
///   中間名會被捨棄。
pub fn split_name(full_name: &str) -> Result<NameParts> {
    if CHINESE_NAME.is_match(full_name) {
        let mut chars = full_name.chars();
        let surname = match chars.next() {
            Some(first) => first.to_string(),
            None => return Err(invalid(full_name, "Chinese name is empty")),
        };
        let given: String = chars.collect();
        if given.is_empty() {
            return Err(invalid(full_name, "Chinese name must have at least 2 characters"));
        }
        return Ok(NameParts { given, surname });
    }

    // 只認 ASCII 空白，全形空白與 NBSP 不算分隔
    let tokens: Vec<&str> = full_name
        .trim_matches(|c: char| c <= ' ')
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .collect();
    match tokens.as_slice() {
        [given, .., surname] => Ok(NameParts {
            given: given.to_string(),
            surname: surname.to_string(),
        }),
        _ => Err(invalid(
            full_name,
            "Western name must contain both given name and surname",
        )),
    }
}

fn invalid(name: &str, reason: &str) -> EtlError {
    EtlError::InvalidNameError {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
