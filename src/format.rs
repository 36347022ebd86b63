use std::fmt;
use std::io::IsTerminal as _;

use clap::ValueEnum;

/// Report format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-oriented table with a summary and failure list
    #[default]
    Table,
    /// Machine-readable JSON array of results
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl OutputFormat {
    /// Whether table output should carry ANSI color: stdout is a terminal and
    /// `NO_COLOR` is unset. JSON never does.
    #[must_use]
    pub fn should_use_color(self) -> bool {
        self == Self::Table
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_formats() {
        assert_eq!(OutputFormat::from_str("table", true).unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("JSON", true).unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("toon", true).is_err());
    }

    #[test]
    fn display_matches_cli_value() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn json_is_never_colored() {
        assert!(!OutputFormat::Json.should_use_color());
    }
}
