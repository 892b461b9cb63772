use crate::adapters::github::DEFAULT_API_BASE;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_repo_slug, validate_url, Validate,
};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pr-etl")]
#[command(about = "Collects and charts pull-request lifecycle timing data", version)]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct CliConfig {
    /// Forge API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Tracked upstream repository ("owner/name")
    #[arg(long, default_value = "google/xls")]
    pub repo: String,

    /// Head repository the render stages filter to
    #[arg(long, default_value = "xlsynth/xlsynth")]
    pub filter_repo: String,

    /// Label whose application marks the start of internal review
    #[arg(long, default_value = "reviewing internally")]
    pub watch_label: String,

    /// Directory holding the CSV table and generated artifacts
    #[arg(long, default_value = ".")]
    pub output_path: String,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch PRs from the forge API and append newly observed records to the CSV table
    Accumulate,
    /// Render the lifecycle delay box plot
    PlotDelays,
    /// Render the monthly PR count bar chart
    PlotCounts,
    /// Rewrite the PR links table in README.md
    LinksTable,
    /// Accumulate, then regenerate charts and README when new data appeared
    Update {
        /// Regenerate artifacts even when no new rows were added
        #[arg(long)]
        force: bool,
    },
    /// Scan a local git checkout for Piper-originated commits
    PiperCommits {
        /// Path to the target git repository to scan
        #[arg(long, default_value = ".")]
        repo: String,

        /// Output CSV path, relative to --output-path
        #[arg(long, default_value = "piper_commits.csv")]
        output: String,
    },
}

impl ConfigProvider for CliConfig {
    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn filter_repo(&self) -> &str {
        &self.filter_repo
    }

    fn watch_label(&self) -> &str {
        &self.watch_label
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn token(&self) -> Option<String> {
        std::env::var("GITHUB_TOKEN").ok()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_repo_slug("repo", &self.repo)?;
        validate_repo_slug("filter_repo", &self.filter_repo)?;
        validate_non_empty_string("watch_label", &self.watch_label)?;
        validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CliConfig {
        CliConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            repo: "google/xls".to_string(),
            filter_repo: "xlsynth/xlsynth".to_string(),
            watch_label: "reviewing internally".to_string(),
            output_path: ".".to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut bad = config();
        bad.api_base = "not a url".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.repo = "no-slash".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.watch_label = "  ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["pr-etl", "update", "--force"]);
        assert!(matches!(cli.command, Command::Update { force: true }));

        let cli = Cli::parse_from(["pr-etl", "--filter-repo", "a/b", "plot-delays"]);
        assert_eq!(cli.config.filter_repo, "a/b");
        assert!(matches!(cli.command, Command::PlotDelays));
    }
}
