use crate::{format_bytes, format_duration, CaptureError, CaptureReport, Config};
use clap::Parser;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Every flag is optional. With none given the tool captures the local admin
/// page exactly as configured by `Config::default()`.
#[derive(Parser, Debug)]
#[command(name = "admin-capture")]
#[command(about = "Capture a screenshot of the local admin page with headless Chrome")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "URL to capture")]
    pub url: Option<String>,

    #[arg(short, long, help = "Output file path (.png, .jpg or .jpeg)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Wait time in milliseconds before taking the screenshot")]
    pub wait: Option<u64>,

    #[arg(long, help = "Viewport width")]
    pub width: Option<u32>,

    #[arg(long, help = "Viewport height")]
    pub height: Option<u32>,

    #[arg(long, help = "Capture the full scrollable page")]
    pub full_page: bool,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Print the capture report as JSON")]
    pub json: bool,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    /// Override `config` with whatever flags were given.
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(url) = &self.url {
            config.target_url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(wait) = self.wait {
            config.settle_delay_ms = wait;
        }
        if let Some(width) = self.width {
            config.viewport.width = width;
        }
        if let Some(height) = self.height {
            config.viewport.height = height;
        }
        if self.full_page {
            config.full_page = true;
        }
        if let Some(chrome_path) = &self.chrome_path {
            config.chrome_path = Some(chrome_path.clone());
        }
        config
    }
}

/// Defaults, then the config file if one was given, then CLI flags.
pub async fn load_config(args: &Cli) -> Result<Config, CaptureError> {
    let config = if let Some(config_path) = &args.config {
        let config_content = fs::read_to_string(config_path).await?;
        serde_json::from_str(&config_content)?
    } else {
        Config::default()
    };

    let config = args.apply_to(config);
    config.validate()?;

    info!("Target URL: {}", config.target_url);
    info!("Output path: {}", config.output_path.display());
    info!("Settle delay: {}", format_duration(config.settle_delay()));

    Ok(config)
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
}

pub fn print_report(report: &CaptureReport, json: bool) -> Result<(), CaptureError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Screenshot captured successfully:");
    println!("  URL: {}", report.target_url);
    println!("  Output: {}", report.output_path.display());
    println!("  Format: {}", report.format.extension());
    println!("  Size: {}", format_bytes(report.file_size));
    println!("  Dimensions: {}x{}", report.width, report.height);
    println!("  Duration: {}", format_duration(report.elapsed));

    if let Some(title) = &report.page_title {
        println!("  Title: {title}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_OUTPUT_PATH, DEFAULT_SETTLE_DELAY_MS, DEFAULT_TARGET_URL};

    #[test]
    fn test_no_arguments_keeps_defaults() {
        let cli = Cli::try_parse_from(["admin-capture"]).unwrap();
        let config = cli.apply_to(Config::default());

        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.settle_delay_ms, DEFAULT_SETTLE_DELAY_MS);
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!(!cli.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "admin-capture",
            "--url",
            "http://localhost:8080/",
            "-o",
            "out/shot.jpg",
            "--wait",
            "250",
            "--width",
            "800",
            "--full-page",
        ])
        .unwrap();
        let config = cli.apply_to(Config::default());

        assert_eq!(config.target_url, "http://localhost:8080/");
        assert_eq!(config.output_path, PathBuf::from("out/shot.jpg"));
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.viewport.width, 800);
        assert_eq!(config.viewport.height, 720);
        assert!(config.full_page);
    }

    #[tokio::test]
    async fn test_load_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(
            &path,
            r#"{"target_url": "http://localhost:4000/", "settle_delay_ms": 10}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "admin-capture",
            "--config",
            path.to_str().unwrap(),
            "--wait",
            "20",
        ])
        .unwrap();
        let config = load_config(&cli).await.unwrap();

        assert_eq!(config.target_url, "http://localhost:4000/");
        assert_eq!(config.settle_delay_ms, 20);
    }

    #[tokio::test]
    async fn test_load_config_rejects_bad_output() {
        let cli = Cli::try_parse_from(["admin-capture", "--output", "shot.bmp"]).unwrap();
        assert!(matches!(
            load_config(&cli).await,
            Err(CaptureError::UnsupportedOutputFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_load_config_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cli =
            Cli::try_parse_from(["admin-capture", "--config", path.to_str().unwrap()]).unwrap();
        assert!(matches!(
            load_config(&cli).await,
            Err(CaptureError::SerializationError(_))
        ));
    }
}
