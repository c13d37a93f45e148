use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SAMPLE_ROWS: usize = 20;
const DEFAULT_DATE_SERIAL_MIN: f64 = 0.0;
const DEFAULT_DATE_SERIAL_MAX: f64 = 50_000.0;
const DEFAULT_TYPE_THRESHOLD: f64 = 0.7;
const DEFAULT_REPORT_SHEET_NAME: &str = "Report";
const DEFAULT_ORIGINAL_SHEET_PREFIX: &str = "Original";
const DEFAULT_FALLBACK_MAX_SHEETS: usize = 3;
const DEFAULT_MAX_UNWRAP_DEPTH: usize = 3;
const DEFAULT_DATE_KEYWORDS: &[&str] = &[
    "日期", "时间", "date", "time", "下单", "提交", "创建", "付款", "发货", "签收", "day", "月份",
];
const DEFAULT_INCLUSION_PHRASES: &[&str] = &[
    "只保留",
    "仅保留",
    "只要",
    "只需要",
    "仅需",
    "只显示",
    "keep only",
    "only keep",
    "only include",
    "retain only",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Data rows inspected per column by the type detector.
    pub sample_rows: usize,
    /// Exclusive bounds of a plausible date serial.
    pub date_serial_min: f64,
    pub date_serial_max: f64,
    /// Fraction of sampled cells a class needs before a column takes that type.
    pub type_threshold: f64,
    pub date_keywords: Vec<String>,
    pub inclusion_phrases: Vec<String>,
    pub auto_date_fix: bool,
    pub report_sheet_name: String,
    pub original_sheet_prefix: String,
    pub fallback_max_sheets: usize,
    pub max_unwrap_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            date_serial_min: DEFAULT_DATE_SERIAL_MIN,
            date_serial_max: DEFAULT_DATE_SERIAL_MAX,
            type_threshold: DEFAULT_TYPE_THRESHOLD,
            date_keywords: to_strings(DEFAULT_DATE_KEYWORDS),
            inclusion_phrases: to_strings(DEFAULT_INCLUSION_PHRASES),
            auto_date_fix: true,
            report_sheet_name: DEFAULT_REPORT_SHEET_NAME.to_string(),
            original_sheet_prefix: DEFAULT_ORIGINAL_SHEET_PREFIX.to_string(),
            fallback_max_sheets: DEFAULT_FALLBACK_MAX_SHEETS,
            max_unwrap_depth: DEFAULT_MAX_UNWRAP_DEPTH,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl EngineConfig {
    pub fn from_args(args: EngineArgs) -> Result<Self> {
        let EngineArgs {
            config,
            sample_rows: cli_sample_rows,
            type_threshold: cli_type_threshold,
            date_keywords: cli_date_keywords,
            inclusion_phrases: cli_inclusion_phrases,
            no_auto_date_fix: cli_no_auto_date_fix,
            report_sheet_name: cli_report_sheet_name,
            original_sheet_prefix: cli_original_sheet_prefix,
            fallback_max_sheets: cli_fallback_max_sheets,
            max_unwrap_depth: cli_max_unwrap_depth,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            sample_rows: file_sample_rows,
            date_serial_min: file_date_serial_min,
            date_serial_max: file_date_serial_max,
            type_threshold: file_type_threshold,
            date_keywords: file_date_keywords,
            inclusion_phrases: file_inclusion_phrases,
            auto_date_fix: file_auto_date_fix,
            report_sheet_name: file_report_sheet_name,
            original_sheet_prefix: file_original_sheet_prefix,
            fallback_max_sheets: file_fallback_max_sheets,
            max_unwrap_depth: file_max_unwrap_depth,
        } = file_config;

        let defaults = Self::default();

        let date_keywords = cli_date_keywords
            .or(file_date_keywords)
            .map(normalize_vocabulary)
            .unwrap_or(defaults.date_keywords);

        let inclusion_phrases = cli_inclusion_phrases
            .or(file_inclusion_phrases)
            .map(normalize_vocabulary)
            .unwrap_or(defaults.inclusion_phrases);

        let auto_date_fix = if cli_no_auto_date_fix {
            false
        } else {
            file_auto_date_fix.unwrap_or(defaults.auto_date_fix)
        };

        let config = Self {
            sample_rows: cli_sample_rows
                .or(file_sample_rows)
                .unwrap_or(defaults.sample_rows),
            date_serial_min: file_date_serial_min.unwrap_or(defaults.date_serial_min),
            date_serial_max: file_date_serial_max.unwrap_or(defaults.date_serial_max),
            type_threshold: cli_type_threshold
                .or(file_type_threshold)
                .unwrap_or(defaults.type_threshold),
            date_keywords,
            inclusion_phrases,
            auto_date_fix,
            report_sheet_name: cli_report_sheet_name
                .or(file_report_sheet_name)
                .unwrap_or(defaults.report_sheet_name),
            original_sheet_prefix: cli_original_sheet_prefix
                .or(file_original_sheet_prefix)
                .unwrap_or(defaults.original_sheet_prefix),
            fallback_max_sheets: cli_fallback_max_sheets
                .or(file_fallback_max_sheets)
                .unwrap_or(defaults.fallback_max_sheets),
            max_unwrap_depth: cli_max_unwrap_depth
                .or(file_max_unwrap_depth)
                .unwrap_or(defaults.max_unwrap_depth),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_args(EngineArgs {
            config: Some(path.as_ref().to_path_buf()),
            ..EngineArgs::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.sample_rows > 0, "sample_rows must be at least 1");
        anyhow::ensure!(
            self.fallback_max_sheets > 0,
            "fallback_max_sheets must be at least 1"
        );
        anyhow::ensure!(
            self.max_unwrap_depth > 0,
            "max_unwrap_depth must be at least 1"
        );
        anyhow::ensure!(
            self.type_threshold > 0.0 && self.type_threshold < 1.0,
            "type_threshold must lie strictly between 0 and 1 (got {})",
            self.type_threshold
        );
        anyhow::ensure!(
            self.date_serial_min < self.date_serial_max,
            "date_serial_min ({}) must be below date_serial_max ({})",
            self.date_serial_min,
            self.date_serial_max
        );
        anyhow::ensure!(
            !self.report_sheet_name.trim().is_empty(),
            "report_sheet_name must not be blank"
        );
        Ok(())
    }

    /// True when `value` falls strictly inside the plausible date-serial range.
    pub fn is_date_serial(&self, value: f64) -> bool {
        value > self.date_serial_min && value < self.date_serial_max
    }
}

fn normalize_vocabulary(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Command-line and environment overrides. Hosts flatten this into their own
/// parser with `#[command(flatten)]`.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "sheetplan", about = "Guided tabular transformation engine")]
pub struct EngineArgs {
    #[arg(
        long = "sheetplan-config",
        env = "SHEETPLAN_CONFIG",
        value_name = "FILE",
        help = "Path to an engine configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETPLAN_SAMPLE_ROWS",
        value_name = "N",
        help = "Data rows sampled per column when detecting types (default: 20)",
        value_parser = clap::value_parser!(usize)
    )]
    pub sample_rows: Option<usize>,

    #[arg(
        long,
        env = "SHEETPLAN_TYPE_THRESHOLD",
        value_name = "FRACTION",
        help = "Majority fraction for date/numeric classification (default: 0.7)"
    )]
    pub type_threshold: Option<f64>,

    #[arg(
        long,
        env = "SHEETPLAN_DATE_KEYWORDS",
        value_name = "WORD",
        value_delimiter = ',',
        help = "Header keywords that mark a column as a date candidate"
    )]
    pub date_keywords: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHEETPLAN_INCLUSION_PHRASES",
        value_name = "PHRASE",
        value_delimiter = ',',
        help = "Phrases that mark an instruction as a strict column inclusion request"
    )]
    pub inclusion_phrases: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHEETPLAN_NO_AUTO_DATE_FIX",
        help = "Disable automatic date formatting of detected date columns"
    )]
    pub no_auto_date_fix: bool,

    #[arg(
        long,
        env = "SHEETPLAN_REPORT_SHEET_NAME",
        value_name = "NAME",
        help = "Name of the diagnostic report sheet (default: Report)"
    )]
    pub report_sheet_name: Option<String>,

    #[arg(
        long,
        env = "SHEETPLAN_ORIGINAL_SHEET_PREFIX",
        value_name = "PREFIX",
        help = "Prefix for retained pre-transform sheets (default: Original)"
    )]
    pub original_sheet_prefix: Option<String>,

    #[arg(
        long,
        env = "SHEETPLAN_FALLBACK_MAX_SHEETS",
        value_name = "N",
        help = "Original sheets copied into a fallback workbook (default: 3)",
        value_parser = clap::value_parser!(usize)
    )]
    pub fallback_max_sheets: Option<usize>,

    #[arg(
        long,
        env = "SHEETPLAN_MAX_UNWRAP_DEPTH",
        value_name = "N",
        help = "Nesting bound when unwrapping function-call payloads (default: 3)",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_unwrap_depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    sample_rows: Option<usize>,
    date_serial_min: Option<f64>,
    date_serial_max: Option<f64>,
    type_threshold: Option<f64>,
    date_keywords: Option<Vec<String>>,
    inclusion_phrases: Option<Vec<String>>,
    auto_date_fix: Option<bool>,
    report_sheet_name: Option<String>,
    original_sheet_prefix: Option<String>,
    fallback_max_sheets: Option<usize>,
    max_unwrap_depth: Option<usize>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
