use clap::Parser;
use csvxml_etl::domain::ports::ConfigProvider;
use csvxml_etl::utils::{logger, validation::Validate};
use csvxml_etl::{
    CliConfig, CsvFilePipeline, DirectoryWatcher, EtlEngine, LocalStorage, Template, TomlConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入配置（日誌尚未初始化，錯誤直接輸出）
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.monitoring.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting csvxml-etl");
    tracing::debug!("Resolved config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 模板只在啟動時載入一次
    let template = match Template::load_with_fragment(
        config.template_path(),
        &config.template.fragment,
    ) {
        Ok(template) => Arc::new(template),
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(3);
        }
    };

    display_config_summary(&config, &cli);

    let retry_delay = config.retry_delay();
    let initial_delay = config.initial_delay();
    let interval = config.poll_interval();

    let storage = LocalStorage::new(".".to_string());
    let pipeline = CsvFilePipeline::new(storage, config, template);
    let engine = EtlEngine::new(pipeline).with_retry_delay(retry_delay);
    let watcher = DirectoryWatcher::new(engine);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        let pending = watcher.scan().await?;
        println!("🔍 {} pending file(s):", pending.len());
        for source in pending {
            println!("  {}", source.path);
        }
        return Ok(());
    }

    if cli.once {
        let summary = watcher.run_once().await?;
        println!(
            "✅ Processed {} file(s): {} written, {} rejected, {} failed",
            summary.total(),
            summary.written.len(),
            summary.rejected.len(),
            summary.failed.len()
        );
        for path in &summary.written {
            println!("📁 {}", path);
        }
        for path in &summary.rejected {
            eprintln!("❌ {}", path);
        }
        if !summary.rejected.is_empty() || !summary.failed.is_empty() {
            std::process::exit(2);
        }
        return Ok(());
    }

    watcher.run(initial_delay, interval).await?;
    tracing::info!("👋 csvxml-etl stopped");
    Ok(())
}

fn display_config_summary(config: &TomlConfig, cli: &CliConfig) {
    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.input_dir());
    println!("  Output: {}", config.output_dir());
    println!("  Errors: {}", config.error_dir());
    println!("  Processed: {}", config.processed_dir());
    println!("  Template: {}", config.template_path());
    println!("  Concurrent Files: {}", config.concurrent_files());
    println!("  Report Format: {}", config.report_format());
    if cli.once {
        println!("  Mode: single batch");
    } else {
        println!("  Mode: watching every {:?}", config.poll_interval());
    }
    println!();
}
