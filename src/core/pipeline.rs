use crate::core::engine::TransformEngine;
use crate::core::template::Template;
use crate::domain::model::{ErrorReport, ExtractedFile, Row, SourceFile, TransformResult};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;

/// 讀取 CSV、轉成 XML 並寫到輸出目錄的管道
pub struct CsvFilePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    engine: TransformEngine,
}

impl<S: Storage, C: ConfigProvider> CsvFilePipeline<S, C> {
    pub fn new(storage: S, config: C, template: Arc<Template>) -> Self {
        Self {
            storage,
            config,
            engine: TransformEngine::new(template),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

/// 解析 CSV 內容。不檢查欄位數，那是 `validate_columns` 的工作。
pub fn parse_csv(content: &str) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b',')
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

pub(crate) fn join_path(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CsvFilePipeline<S, C> {
    async fn extract(&self, source: &SourceFile) -> Result<ExtractedFile> {
        tracing::info!("Parsing CSV file: {}", source.name);

        let bytes = self.storage.read_file(&source.path).await?;
        let raw_content =
            String::from_utf8(bytes).map_err(|e| EtlError::InvalidEncodingError {
                file_name: source.name.clone(),
                reason: e.to_string(),
            })?;
        let rows = parse_csv(&raw_content)?;

        tracing::info!("CSV file parsed, {} rows", rows.len());
        Ok(ExtractedFile {
            source: source.clone(),
            raw_content,
            rows,
        })
    }

    async fn transform(&self, extracted: &ExtractedFile) -> Result<TransformResult> {
        tracing::info!("Starting XML conversion for {}", extracted.source.name);

        let output = self.engine.transform(extracted.rows.clone())?;

        tracing::info!(
            "Generated XML document for {} ({} companies, {} records)",
            extracted.source.name,
            output.company_count,
            output.record_count
        );
        Ok(TransformResult {
            source: extracted.source.clone(),
            output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let file_name = format!("{}_{}.xml", result.source.stem(), timestamp());
        let output_path = join_path(self.config.output_dir(), &file_name);

        tracing::debug!(
            "Writing XML file ({} bytes) to {}",
            result.output.xml.len(),
            output_path
        );
        self.storage
            .write_file(&output_path, result.output.xml.as_bytes())
            .await?;

        Ok(output_path)
    }

    async fn reject(&self, report: ErrorReport) -> Result<String> {
        let stem = SourceFile::new(report.file_name.as_str(), "").stem().to_string();
        let (extension, body) = match self.config.report_format() {
            "json" => ("json", serde_json::to_string_pretty(&report)?),
            _ => ("txt", report.to_text()),
        };
        let file_name = format!(
            "{}_{}_{}.{}",
            stem,
            report.category.file_suffix(),
            timestamp(),
            extension
        );
        let error_path = join_path(self.config.error_dir(), &file_name);

        self.storage.write_file(&error_path, body.as_bytes()).await?;
        Ok(error_path)
    }
}
