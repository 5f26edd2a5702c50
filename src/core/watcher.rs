use crate::core::etl::EtlEngine;
use crate::core::pipeline::{join_path, CsvFilePipeline};
use crate::domain::model::{BatchSummary, FileOutcome, SourceFile};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

pub const INPUT_EXTENSION: &str = "csv";

/// 輪詢輸入目錄，每個 CSV 檔交給 `EtlEngine` 處理後搬到已處理目錄。
///
/// 不同檔案可以同時轉換，彼此只共用唯讀的模板。
pub struct DirectoryWatcher<S, C>
where
    S: Storage + 'static,
    C: ConfigProvider + 'static,
{
    engine: Arc<EtlEngine<CsvFilePipeline<S, C>>>,
    /// 已處理但搬不走的輸入檔路徑，之後的掃描會略過
    stranded: Mutex<HashSet<String>>,
}

impl<S, C> DirectoryWatcher<S, C>
where
    S: Storage + 'static,
    C: ConfigProvider + 'static,
{
    pub fn new(engine: EtlEngine<CsvFilePipeline<S, C>>) -> Self {
        Self {
            engine: Arc::new(engine),
            stranded: Mutex::new(HashSet::new()),
        }
    }

    fn storage(&self) -> &S {
        self.engine.pipeline().storage()
    }

    fn config(&self) -> &C {
        self.engine.pipeline().config()
    }

    /// 列出輸入目錄中待處理的 CSV 檔（依檔名排序）
    pub async fn scan(&self) -> Result<Vec<SourceFile>> {
        let input_dir = self.config().input_dir();
        let names = self.storage().list_files(input_dir, INPUT_EXTENSION).await?;
        let stranded = self.stranded.lock().await;

        Ok(names
            .into_iter()
            .map(|name| {
                let path = join_path(input_dir, &name);
                SourceFile::new(name, path)
            })
            .filter(|source| !stranded.contains(&source.path))
            .collect())
    }

    pub async fn run_once(&self) -> Result<BatchSummary> {
        let sources = self.scan().await?;
        let mut summary = BatchSummary::default();
        if sources.is_empty() {
            tracing::debug!("No new files in {}", self.config().input_dir());
            return Ok(summary);
        }

        tracing::info!("Found {} new file(s)", sources.len());
        let semaphore = Arc::new(Semaphore::new(self.config().concurrent_files()));
        let mut tasks = JoinSet::new();

        for (index, source) in sources.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = engine.process(&source).await;
                (index, source, outcome)
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => finished.push(done),
                Err(e) => tracing::error!("File worker aborted: {}", e),
            }
        }
        finished.sort_by_key(|(index, _, _)| *index);

        for (_, source, outcome) in finished {
            match outcome {
                Ok(FileOutcome::Written { output_path }) => {
                    if self.archive(&source, &output_path).await {
                        summary.written.push(output_path);
                    } else {
                        summary.failed.push(source.name);
                    }
                }
                Ok(FileOutcome::Rejected { error_path, .. }) => {
                    if self.archive(&source, &error_path).await {
                        summary.rejected.push(error_path);
                    } else {
                        summary.failed.push(source.name);
                    }
                }
                Err(e) => {
                    // 錯誤報告寫不出去時保留原檔，下次輪詢再處理
                    tracing::error!("Could not record failure for {}: {}", source.name, e);
                    summary.failed.push(source.name);
                }
            }
        }

        tracing::info!(
            "Batch finished: {} written, {} rejected, {} failed",
            summary.written.len(),
            summary.rejected.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    pub async fn run(&self, initial_delay: Duration, interval: Duration) -> Result<()> {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(initial_delay, interval, shutdown).await
    }

    pub async fn run_until<F>(
        &self,
        initial_delay: Duration,
        interval: Duration,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Watching {} for CSV files", self.config().input_dir());

        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = &mut shutdown => return Ok(()),
        }

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!("Polling {} failed: {}", self.config().input_dir(), e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping watcher");
                    return Ok(());
                }
            }
        }
    }

    /// 搬到已處理目錄。失敗時記住這個檔案，避免每次輪詢都重新輸出一份。
    async fn archive(&self, source: &SourceFile, result_path: &str) -> bool {
        let target = join_path(&self.config().processed_dir(), &source.name);
        match self.storage().move_file(&source.path, &target).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Could not move {} to {} ({}); result kept at {}, file will be skipped until restart",
                    source.path,
                    target,
                    e,
                    result_path
                );
                self.stranded.lock().await.insert(source.path.clone());
                false
            }
        }
    }
}
