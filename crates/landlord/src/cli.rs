//! Command-line interface handling for the Landlord server.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option overrides the matching configuration file setting.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the listen address
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// Optional override for the rating file
    pub rating_db: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

/// Builds the clap command describing the server's arguments.
pub fn command() -> Command {
    Command::new("landlord")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Networked Landlord (Dou Dizhu) table server")
        .arg(
            Arg::new("address")
                .value_name("ADDR")
                .help("IP address to listen on (e.g., 0.0.0.0)"),
        )
        .arg(
            Arg::new("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("rating-db")
                .value_name("RATING_DB_PATH")
                .help("JSON file holding player ratings"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("landlord.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("landlord.toml")),
            bind_address: matches.get_one::<String>("address").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            rating_db: matches.get_one::<String>("rating-db").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(&command().get_matches_from(args))
    }

    #[test]
    fn test_positional_arguments() {
        let args = parse(&["landlord", "0.0.0.0", "2333", "elo.json"]);
        assert_eq!(args.bind_address.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(2333));
        assert_eq!(args.rating_db, Some(PathBuf::from("elo.json")));
        assert_eq!(args.config_path, PathBuf::from("landlord.toml"));
        assert!(!args.json_logs);
    }

    #[test]
    fn test_options_without_positionals() {
        let args = parse(&["landlord", "-c", "other.toml", "-l", "debug", "--json-logs"]);
        assert_eq!(args.config_path, PathBuf::from("other.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert!(args.bind_address.is_none());
        assert!(args.port.is_none());
    }

    #[test]
    fn test_port_must_be_numeric() {
        assert!(command()
            .try_get_matches_from(["landlord", "127.0.0.1", "http"])
            .is_err());
    }
}
