//! Command-line interface definitions for Schriftje.
//!
//! The program is meant to be started by a scheduler such as cron; almost
//! everything lives in the configuration file.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one run.
///
/// # Examples
///
/// ```sh
/// # Today's journal, configuration from ./config.yaml
/// schriftje
///
/// # Catch up on a specific day with another configuration file
/// schriftje -c /etc/schriftje.yaml --date 2021-05-21
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "SCHRIFTJE_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Fetch the journal of this day (YYYY-MM-DD) instead of today's
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["schriftje"]);
        assert!(cli.date.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["schriftje", "-c", "/etc/schriftje.yaml", "-d", "2021-05-21"]);
        assert_eq!(cli.config, PathBuf::from("/etc/schriftje.yaml"));
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2021, 5, 21));
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["schriftje", "--date", "21-05-2021"]).is_err());
    }
}
