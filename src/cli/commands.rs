//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// List the public repositories of a GitHub organization
#[derive(Parser, Debug)]
#[command(name = "org-crawler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Organization login (e.g. `Azure`)
    pub org: String,

    /// Configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Root of the REST API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Retries after the first attempt on transient failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Backoff factor in seconds
    #[arg(long)]
    pub backoff_factor: Option<f64>,

    /// Cancel the crawl after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Records to print
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON record per line
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["org-crawler", "Azure"]).unwrap();
        assert_eq!(cli.org, "Azure");
        assert_eq!(cli.limit, 5);
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.deadline_secs.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "org-crawler",
            "rust-lang",
            "--max-retries",
            "5",
            "--backoff-factor",
            "1.5",
            "--api-url",
            "http://localhost:9000",
            "--deadline-secs",
            "30",
            "--limit",
            "10",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.org, "rust-lang");
        assert_eq!(cli.max_retries, Some(5));
        assert_eq!(cli.backoff_factor, Some(1.5));
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cli.deadline_secs, Some(30));
        assert_eq!(cli.limit, 10);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }

    #[test]
    fn test_org_is_required() {
        assert!(Cli::try_parse_from(["org-crawler"]).is_err());
    }
}
