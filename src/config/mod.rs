pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::TomlConfig;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "csvxml-etl")]
#[command(about = "Watch a directory for CSV files and render them as grouped XML profiles")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, help = "Directory watched for incoming CSV files")]
    pub input_dir: Option<String>,

    #[arg(long, help = "Directory for generated XML files")]
    pub output_dir: Option<String>,

    #[arg(long, help = "Directory for error reports")]
    pub error_dir: Option<String>,

    #[arg(long, help = "XML template containing the Profile fragment")]
    pub template: Option<String>,

    #[arg(long, help = "Maximum number of files transformed at the same time")]
    pub concurrent_files: Option<usize>,

    #[arg(long, help = "Process the files currently in the input directory and exit")]
    pub once: bool,

    #[arg(long, help = "List pending files without processing them")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 讀取設定檔（若有），再套用命令列覆蓋
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(input) = &self.input_dir {
            config.directories.input = input.clone();
        }
        if let Some(output) = &self.output_dir {
            config.directories.output = output.clone();
        }
        if let Some(error) = &self.error_dir {
            config.directories.error = error.clone();
        }
        if let Some(template) = &self.template {
            config.template.path = template.clone();
        }
        if let Some(concurrent) = self.concurrent_files {
            config.polling.concurrent_files = concurrent;
        }
        if self.json_logs {
            config.monitoring.json_logs = true;
        }

        Ok(config)
    }
}
