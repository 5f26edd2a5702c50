use crate::domain::model::{CompanyGroup, Record};
use indexmap::IndexMap;

/// 依公司分組。分組順序為公司第一次出現的順序，組內記錄保持輸入順序。
pub fn group_by_company(records: Vec<Record>) -> Vec<CompanyGroup> {
    let mut groups: IndexMap<String, Vec<Record>> = IndexMap::new();
    for record in records {
        groups.entry(record.company.clone()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(company, records)| CompanyGroup { company, records })
        .collect()
}
