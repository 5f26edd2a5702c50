use crate::domain::model::{ErrorReport, ExtractedFile, SourceFile, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 列出目錄下指定副檔名的檔案名稱（依名稱排序）
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn move_file(
        &self,
        from: &str,
        to: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn error_dir(&self) -> &str;
    fn processed_dir(&self) -> String;
    fn template_path(&self) -> &str;
    fn concurrent_files(&self) -> usize;
    fn retry_delay(&self) -> Duration;
    fn report_format(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, source: &SourceFile) -> Result<ExtractedFile>;
    async fn transform(&self, extracted: &ExtractedFile) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
    async fn reject(&self, report: ErrorReport) -> Result<String>;
}
