use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Default max depth: ", crate::core::dispatcher::DEFAULT_MAX_DEPTH, "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Run scripted event dispatch scenarios and print the invocation trace
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Scenario JSON file (reads stdin when omitted)
    #[arg(value_name = "SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Enable debug logging to file (default: evdispatch.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Settings file (default: evdispatch.json in the config directory)
    #[arg(long = "settings", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Nested dispatch ceiling, overrides the settings file
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Print the report on one line
    #[arg(long = "compact")]
    pub compact: bool,

    /// Write the effective settings back to the settings file
    #[arg(long = "save-settings")]
    pub save_settings: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "evdispatch", "scene.json", "-vv", "--max-depth", "7", "--compact", "-l",
        ])
        .unwrap();
        assert_eq!(args.scenario, Some(PathBuf::from("scene.json")));
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.max_depth, Some(7));
        assert!(args.compact);
        assert_eq!(args.log_file, Some(None));
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["evdispatch"]).unwrap();
        assert!(args.scenario.is_none());
        assert!(args.log_file.is_none());
        assert_eq!(args.verbosity, 0);
        assert!(!args.save_settings);
    }
}
