//! CLI runner - executes a crawl

use crate::cli::commands::{Cli, OutputFormat};
use crate::config::CrawlerConfig;
use crate::crawler::{OrgCrawler, OrgRepos};
use crate::error::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the crawl and print the result
    pub async fn run(&self) -> Result<()> {
        let config = self.build_config()?;
        let cancel = CancellationToken::new();
        self.spawn_cancellers(&cancel);

        let crawler = OrgCrawler::new(config)?.with_cancellation(cancel.clone());
        let repos = crawler.fetch_organization_repos(&self.cli.org).await;
        cancel.cancel();

        self.print(&repos?);
        Ok(())
    }

    /// Merge the config file with command-line overrides
    fn build_config(&self) -> Result<CrawlerConfig> {
        let mut config = match &self.cli.config {
            Some(path) => CrawlerConfig::from_file(path)?,
            None => CrawlerConfig::default(),
        };

        if let Some(token) = &self.cli.token {
            config = config.with_token(token.clone());
        }
        if let Some(api_url) = &self.cli.api_url {
            config = config.with_api_url(api_url.clone());
        }
        if let Some(max_retries) = self.cli.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(backoff_factor) = self.cli.backoff_factor {
            config.backoff_factor = backoff_factor;
        }

        config.validate()?;
        Ok(config)
    }

    /// Cancel on Ctrl-C or when the deadline passes
    fn spawn_cancellers(&self, cancel: &CancellationToken) {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => tracing::warn!("Interrupted, returning what was fetched so far"),
                        Err(e) => tracing::warn!("Failed to install Ctrl-C handler: {e}"),
                    }
                    token.cancel();
                }
            }
        });

        if let Some(secs) = self.cli.deadline_secs {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = token.cancelled() => {}
                    () = tokio::time::sleep(Duration::from_secs(secs)) => {
                        tracing::warn!("Deadline of {secs}s reached, cancelling");
                        token.cancel();
                    }
                }
            });
        }
    }

    fn print(&self, repos: &OrgRepos) {
        println!("Total repositories fetched: {}", repos.len());

        for record in repos.records.iter().take(self.cli.limit) {
            match self.cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string(record).unwrap_or_default());
                }
                OutputFormat::Pretty => {
                    println!("{record}");
                    println!("{}", "-".repeat(40));
                }
            }
        }

        if repos.partial {
            let reason = repos.abort_reason.as_deref().unwrap_or("unknown error");
            eprintln!("Note: the list is incomplete ({reason})");
        }
        if !repos.skipped.is_empty() {
            eprintln!(
                "Note: {} item(s) skipped for missing or invalid fields",
                repos.skipped.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["org-crawler"];
        argv.extend_from_slice(args);
        Runner::new(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let config = runner(&[
            "acme",
            "--token",
            "abc",
            "--api-url",
            "http://localhost:1234",
            "--max-retries",
            "0",
            "--backoff-factor",
            "2",
        ])
        .build_config()
        .unwrap();

        assert_eq!(config.token(), Some("abc".to_string()));
        assert_eq!(config.api_url, "http://localhost:1234");
        assert_eq!(config.max_retries, 0);
        assert!((config.backoff_factor - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries: 9\nlow_water_mark: 25").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = runner(&["acme", "--config", &path, "--max-retries", "2"])
            .build_config()
            .unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.low_water_mark, 25);
    }

    #[test]
    fn test_build_config_rejects_bad_flag() {
        assert!(runner(&["acme", "--backoff-factor=-3"])
            .build_config()
            .is_err());
    }
}
