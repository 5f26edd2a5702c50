use crate::core::converter::convert_rows;
use crate::core::date::parse_date;
use crate::core::grouper::group_by_company;
use crate::core::name::split_name;
use crate::core::render::render_document;
use crate::core::template::{Template, XmlElement, XmlNode};
use crate::core::validator::validate_columns;
use crate::domain::model::{CompanyGroup, NormalizedFields, Record, Row, TransformOutput};
use crate::utils::error::Result;
use std::sync::Arc;

pub const ROOT_TAG: &str = "UserProfiles";
pub const COMPANY_TAG: &str = "Company";

impl NormalizedFields {
    pub fn from_record(record: &Record) -> Result<Self> {
        let name = split_name(&record.full_name)?;
        let date = parse_date(&record.register_date)?;
        Ok(Self {
            user_id: record.user_id.clone(),
            first_name: name.given,
            last_name: name.surname,
            register_date: date.canonical(),
        })
    }
}

/// 單一檔案的轉換：驗證、轉換、分組、套模板、輸出。
///
/// 同步執行，不保留跨檔案狀態；唯一共用的是唯讀的模板，可以在多個 worker 間複製。
#[derive(Debug, Clone)]
pub struct TransformEngine {
    template: Arc<Template>,
}

impl TransformEngine {
    pub fn new(template: Arc<Template>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn transform(&self, rows: Vec<Row>) -> Result<TransformOutput> {
        let record_count = validate_columns(&rows)?;
        let records = convert_rows(rows);
        let groups = group_by_company(records);
        tracing::info!(
            "Converting {} records from {} companies to XML",
            record_count,
            groups.len()
        );

        let document = self.assemble(&groups)?;
        let xml = render_document(&document)?;

        Ok(TransformOutput {
            xml,
            record_count,
            company_count: groups.len(),
        })
    }

    /// 組出輸出樹。任何一筆記錄失敗都會中止整個檔案。
    pub fn assemble(&self, groups: &[CompanyGroup]) -> Result<XmlElement> {
        let mut root = XmlElement::new(ROOT_TAG);

        for group in groups {
            tracing::debug!(
                "Processing company {} with {} records",
                group.company,
                group.records.len()
            );
            root.children.push(XmlNode::Element(XmlElement::with_text(
                COMPANY_TAG,
                group.company.as_str(),
            )));

            for record in &group.records {
                tracing::debug!(
                    "Processing record -> company: {}, user id: {}, name: {}",
                    record.company,
                    record.user_id,
                    record.full_name
                );
                let fields = NormalizedFields::from_record(record)?;
                root.children
                    .push(XmlNode::Element(self.template.instantiate(&fields)));
            }
        }

        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;

    const TEMPLATE: &str = r#"<Templates>
    <Profile id="${userId}">
        <FullName>${firstName} ${lastName}</FullName>
        <FirstName>${firstName}</FirstName>
        <LastName>${lastName}</LastName>
        <RegisterDate>${registerDate}</RegisterDate>
    </Profile>
</Templates>"#;

    fn engine() -> TransformEngine {
        TransformEngine::new(Arc::new(Template::parse(TEMPLATE).unwrap()))
    }

    fn row(fields: [&str; 4]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_normalized_fields_from_record() {
        let record = Record {
            company: "Acme".to_string(),
            user_id: "U2".to_string(),
            full_name: "张三".to_string(),
            register_date: "15/06/2022".to_string(),
        };
        let fields = NormalizedFields::from_record(&record).unwrap();
        assert_eq!(fields.user_id, "U2");
        assert_eq!(fields.first_name, "三");
        assert_eq!(fields.last_name, "张");
        assert_eq!(fields.register_date, "2022-06-15T00:00:00Z");
    }

    #[test]
    fn test_assemble_orders_companies_and_profiles() {
        let output = engine()
            .transform(vec![
                row(["Beta", "U1", "John Smith", "2023-01-15"]),
                row(["Acme", "U2", "张三", "15/06/2022"]),
                row(["Beta", "U3", "Jane Doe", "Jan 05, 2021"]),
            ])
            .unwrap();

        assert_eq!(output.record_count, 3);
        assert_eq!(output.company_count, 2);

        let xml = &output.xml;
        let beta = xml.find("<Company>Beta</Company>").unwrap();
        let u1 = xml.find("id=\"U1\"").unwrap();
        let u3 = xml.find("id=\"U3\"").unwrap();
        let acme = xml.find("<Company>Acme</Company>").unwrap();
        let u2 = xml.find("id=\"U2\"").unwrap();
        assert!(beta < u1 && u1 < u3 && u3 < acme && acme < u2);
    }

    #[test]
    fn test_first_bad_record_fails_the_file() {
        let err = engine()
            .transform(vec![
                row(["Acme", "U1", "John Smith", "2023-01-15"]),
                row(["Acme", "U2", "John", "2023-01-15"]),
                row(["Acme", "U3", "Jane Doe", "not-a-date"]),
            ])
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidNameError { .. }));
    }

    #[test]
    fn test_validation_runs_before_conversion() {
        let err = engine()
            .transform(vec![vec!["Acme".to_string(), "U1".to_string()]])
            .unwrap_err();
        assert!(matches!(err, EtlError::ColumnMismatchError { .. }));

        let err = engine().transform(Vec::new()).unwrap_err();
        assert!(matches!(err, EtlError::EmptyInputError));
    }
}
