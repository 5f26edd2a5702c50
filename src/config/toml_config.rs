use crate::core::template::PROFILE_TAG;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
    validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const REPORT_FORMATS: [&str; 2] = ["text", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub directories: DirectoriesConfig,
    pub template: TemplateConfig,
    pub polling: PollingConfig,
    pub error_handling: ErrorHandlingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    pub input: String,
    pub output: String,
    pub error: String,
    /// 處理完的輸入檔搬移位置，預設為 `<input>/.processed`
    pub processed: Option<String>,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            input: "input".to_string(),
            output: "output".to_string(),
            error: "error".to_string(),
            processed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub path: String,
    pub fragment: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: "templates/profile.xml".to_string(),
            fragment: PROFILE_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub initial_delay_ms: u64,
    pub interval_ms: u64,
    pub concurrent_files: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            interval_ms: 5000,
            concurrent_files: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    pub retry_delay_ms: u64,
    pub report_format: String,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
            report_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub json_logs: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INPUT_DIR})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_path("directories.input", &self.directories.input)?;
        validate_path("directories.output", &self.directories.output)?;
        validate_path("directories.error", &self.directories.error)?;
        if let Some(processed) = &self.directories.processed {
            validate_path("directories.processed", processed)?;
        }

        validate_path("template.path", &self.template.path)?;
        validate_non_empty_string("template.fragment", &self.template.fragment)?;

        validate_positive_number(
            "polling.concurrent_files",
            self.polling.concurrent_files,
            1,
        )?;
        validate_range("polling.interval_ms", self.polling.interval_ms, 100, 3_600_000)?;
        validate_range(
            "polling.initial_delay_ms",
            self.polling.initial_delay_ms,
            0,
            3_600_000,
        )?;

        validate_range(
            "error_handling.retry_delay_ms",
            self.error_handling.retry_delay_ms,
            0,
            600_000,
        )?;
        validate_one_of(
            "error_handling.report_format",
            &self.error_handling.report_format,
            &REPORT_FORMATS,
        )?;

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.polling.initial_delay_ms)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_dir(&self) -> &str {
        &self.directories.input
    }

    fn output_dir(&self) -> &str {
        &self.directories.output
    }

    fn error_dir(&self) -> &str {
        &self.directories.error
    }

    fn processed_dir(&self) -> String {
        self.directories.processed.clone().unwrap_or_else(|| {
            Path::new(&self.directories.input)
                .join(".processed")
                .to_string_lossy()
                .into_owned()
        })
    }

    fn template_path(&self) -> &str {
        &self.template.path
    }

    fn concurrent_files(&self) -> usize {
        self.polling.concurrent_files
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.error_handling.retry_delay_ms)
    }

    fn report_format(&self) -> &str {
        &self.error_handling.report_format
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_watched_layout() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.input_dir(), "input");
        assert_eq!(config.output_dir(), "output");
        assert_eq!(config.error_dir(), "error");
        assert_eq!(config.template_path(), "templates/profile.xml");
        assert_eq!(config.template.fragment, "Profile");
        assert_eq!(config.poll_interval(), Duration::from_millis(5000));
        assert_eq!(config.initial_delay(), Duration::from_millis(1000));
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.report_format(), "text");
        assert!(Path::new(&config.processed_dir()).ends_with("input/.processed"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[directories]
input = "/data/in"
output = "/data/out"
error = "/data/err"
processed = "/data/done"

[template]
path = "/etc/csvxml/profile.xml"

[polling]
interval_ms = 2000
concurrent_files = 8

[error_handling]
retry_delay_ms = 0
report_format = "json"

[monitoring]
json_logs = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.input_dir(), "/data/in");
        assert_eq!(config.processed_dir(), "/data/done");
        assert_eq!(config.concurrent_files(), 8);
        assert_eq!(config.polling.initial_delay_ms, 1000);
        assert_eq!(config.retry_delay(), Duration::ZERO);
        assert_eq!(config.report_format(), "json");
        assert!(config.monitoring.json_logs);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CSVXML_TEST_INPUT_DIR", "/tmp/csv-in");

        let toml_content = r#"
[directories]
input = "${CSVXML_TEST_INPUT_DIR}"
output = "${CSVXML_TEST_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input_dir(), "/tmp/csv-in");
        assert_eq!(config.output_dir(), "${CSVXML_TEST_UNSET_VARIABLE}");

        std::env::remove_var("CSVXML_TEST_INPUT_DIR");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[polling]
concurrent_files = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[error_handling]
report_format = "yaml"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = TomlConfig::from_toml_str("[directories\ninput = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[directories]
input = "incoming"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.input_dir(), "incoming");
        assert_eq!(config.output_dir(), "output");
    }
}
