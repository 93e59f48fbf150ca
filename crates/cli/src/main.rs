use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mealscan_vision::{write_result, HttpScanPipeline, RunConfig, Secrets};

#[derive(Parser)]
#[command(name = "mealscan")]
#[command(about = "Read receipt items or identify foods in a photo")]
#[command(version)]
struct Cli {
    /// Run config (TOML). Defaults to ./mealscan.toml, then the user config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one image and emit the aggregated JSON result
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ScanArgs {
    /// Image to scan. Resized in place if it turns out to be a food photo.
    image: PathBuf,

    /// Secrets file (JSON), overriding the config
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Write the result here, overriding the config
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result to stdout even if the config names an output file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
}

impl ScanArgs {
    fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(secrets) = &self.secrets {
            config.secrets_file = secrets.clone();
        }
        if self.stdout {
            config.output = None;
        } else if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RunConfig::discover(cli.config.as_deref())
        .await
        .context("Failed to load run config")?;

    match cli.command {
        Commands::Scan(args) => scan(args.apply(config), &args.image).await,
    }
}

async fn scan(config: RunConfig, image: &std::path::Path) -> Result<()> {
    let secrets = Secrets::load(&config.secrets_file)
        .await
        .context("Failed to load secrets")?;
    let pipeline = HttpScanPipeline::from_config(&config, &secrets)
        .context("Failed to set up providers")?;

    tracing::info!(image = %image.display(), "Scanning image");
    let result = pipeline
        .scan_file(image)
        .await
        .with_context(|| format!("Scan of {} failed", image.display()))?;

    write_result(&result, config.output.as_deref())
        .await
        .context("Failed to write result")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scan_with_overrides() {
        let cli = Cli::parse_from([
            "mealscan", "--config", "run.toml", "scan", "meal.jpg", "--secrets", "s.json", "-o", "out.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("run.toml")));
        let Commands::Scan(args) = cli.command;
        let config = args.apply(RunConfig::default());
        assert_eq!(args.image, PathBuf::from("meal.jpg"));
        assert_eq!(config.secrets_file, PathBuf::from("s.json"));
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn stdout_flag_clears_configured_output() {
        let config = RunConfig { output: Some(PathBuf::from("result.json")), ..RunConfig::default() };
        let args = ScanArgs { image: PathBuf::from("x.jpg"), stdout: true, ..ScanArgs::default() };
        assert!(args.apply(config).output.is_none());
    }

    #[test]
    fn stdout_conflicts_with_output() {
        let parsed = Cli::try_parse_from(["mealscan", "scan", "x.jpg", "--stdout", "-o", "y.json"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn missing_secrets_file_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig { secrets_file: dir.path().join("absent.json"), ..RunConfig::default() };
        let err = scan(config, &dir.path().join("x.jpg")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load secrets"));
    }
}
