use crate::domain::model::{ErrorReport, FileOutcome, SourceFile};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Duration;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// 逐檔執行 extract → transform → load，失敗時依錯誤分類重試，最後寫出錯誤報告。
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    retry_delay: Duration,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 只有錯誤報告本身寫不出去時才回傳 `Err`
    pub async fn process(&self, source: &SourceFile) -> Result<FileOutcome> {
        tracing::info!("Start processing file: {}", source.name);
        let mut redeliveries = 0;

        loop {
            let mut raw_content = None;
            match self.run(source, &mut raw_content).await {
                Ok(output_path) => {
                    tracing::info!("✅ File processed: {} -> {}", source.name, output_path);
                    return Ok(FileOutcome::Written { output_path });
                }
                Err(e) if redeliveries < e.category().max_redeliveries() => {
                    redeliveries += 1;
                    tracing::warn!(
                        "Processing {} failed ({}), redelivery {} of {}",
                        source.name,
                        e,
                        redeliveries,
                        e.category().max_redeliveries()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Error while processing file {} (category: {:?}): {}",
                        source.name,
                        e.category(),
                        e
                    );
                    let kind = e.kind().to_string();
                    let report = ErrorReport {
                        file_name: source.name.clone(),
                        category: e.category(),
                        kind: kind.clone(),
                        message: e.to_string(),
                        raw_content,
                    };
                    let error_path = self.pipeline.reject(report).await?;
                    tracing::info!("📁 Error report saved to: {}", error_path);
                    return Ok(FileOutcome::Rejected { error_path, kind });
                }
            }
        }
    }

    async fn run(&self, source: &SourceFile, raw_content: &mut Option<String>) -> Result<String> {
        let extracted = self.pipeline.extract(source).await?;
        *raw_content = Some(extracted.raw_content.clone());

        let result = self.pipeline.transform(&extracted).await?;
        self.pipeline.load(result).await
    }
}
