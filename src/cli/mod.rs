//! CLI argument definitions for Mandala.

use clap::{Parser, Subcommand};

/// Mandala - A hierarchical goal chart.
///
/// Run with no command for a summary of the chart, then `mandala open <id>`
/// to drill into a major or middle goal.
#[derive(Parser, Debug)]
#[command(name = "mandala")]
#[command(author, version, about = "A goal chart that tracks achievement across a three-level goal tree", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// User whose chart to use. Each user has a separate data directory.
    /// Can also be set via MANDALA_USER environment variable.
    #[arg(short = 'u', long = "user", global = true, env = "MANDALA_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the current chart view
    Show,

    /// Open the chart under a major or middle goal
    Open {
        /// Cell ID (e.g., major-3 or major-3-middle-2)
        id: String,
    },

    /// Go back one level
    Back {
        /// From a minor chart, return straight to the major chart
        #[arg(long)]
        to_major: bool,
    },

    /// Set the title of the center goal or a cell
    ///
    /// Titles keep their first 22 characters, wrapped into lines of 8.
    Title {
        /// `center` or a cell ID (e.g., major-1-middle-2-minor-3)
        target: String,

        /// New title text
        #[arg(allow_hyphen_values = true)]
        text: String,
    },

    /// Check or uncheck a minor goal
    Toggle {
        /// Minor cell ID (e.g., major-1-middle-2-minor-3)
        id: String,
    },

    /// Show ring progress for a major or middle goal
    Progress {
        /// Cell ID (e.g., major-1 or major-1-middle-2)
        id: String,
    },

    /// Yearly target commands
    Targets {
        #[command(subcommand)]
        command: TargetsCommands,
    },

    /// Apply actual yearly results to goals
    ///
    /// Minor goals whose title names a revenue or profit amount are checked
    /// when the actual meets it.
    Actuals {
        /// Fiscal year (defaults to the configured default-year)
        #[arg(long)]
        year: Option<i32>,

        /// Actual revenue
        #[arg(long)]
        revenue: Option<i64>,

        /// Actual gross profit (accepted, not compared)
        #[arg(long)]
        gross_profit: Option<i64>,

        /// Actual operating profit
        #[arg(long)]
        operating_profit: Option<i64>,
    },

    /// Show the target a title would produce
    Extract {
        /// Goal title to analyze
        #[arg(allow_hyphen_values = true)]
        title: String,
    },

    /// Delete all chart data for the user
    Reset,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Yearly target subcommands
#[derive(Subcommand, Debug)]
pub enum TargetsCommands {
    /// Rebuild targets from the major goal titles
    Sync,

    /// List the last synchronized targets
    List,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration values and their sources
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value in the user's config.kdl
    Set {
        /// Configuration key (output-format, default-year, log-level, action-log)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_title_with_leading_hyphen() {
        let cli = Cli::parse_from(["mandala", "title", "major-1", "-10% cost"]);
        match cli.command {
            Some(Commands::Title { target, text }) => {
                assert_eq!(target, "major-1");
                assert_eq!(text, "-10% cost");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_actuals() {
        let cli = Cli::parse_from([
            "mandala",
            "-H",
            "actuals",
            "--year",
            "2024",
            "--revenue",
            "1000",
            "--gross-profit",
            "5",
        ]);
        assert!(cli.human_readable);
        match cli.command {
            Some(Commands::Actuals {
                year,
                revenue,
                gross_profit,
                operating_profit,
            }) => {
                assert_eq!(year, Some(2024));
                assert_eq!(revenue, Some(1000));
                assert_eq!(gross_profit, Some(5));
                assert_eq!(operating_profit, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
