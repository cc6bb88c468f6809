//! Command-line arguments.

use clap::Parser;
use pgbridge_core::InvocationArgs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pgbridge")]
#[command(version)]
#[command(about = "Load a stream of SCHEMA/RECORD/STATE messages into PostgreSQL")]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Read messages from this file instead of standard input
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Write output to this file instead of standard output
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Check connectivity and print a JSON result instead of loading
    #[arg(long, default_value_t = false)]
    pub test: bool,
}

impl Args {
    pub fn into_invocation_args(self) -> InvocationArgs {
        InvocationArgs {
            config_path: self.config,
            input_path: self.input,
            output_path: self.output,
            test_mode: self.test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_required() {
        assert!(Args::try_parse_from(["pgbridge"]).is_err());
        assert!(Args::try_parse_from(["pgbridge", "--input", "in.jsonl"]).is_err());
    }

    #[test]
    fn test_short_and_long_config() {
        let short = Args::try_parse_from(["pgbridge", "-c", "config.json"]).unwrap();
        let long = Args::try_parse_from(["pgbridge", "--config", "config.json"]).unwrap();
        assert_eq!(short.config, PathBuf::from("config.json"));
        assert_eq!(long.config, short.config);
        assert!(!short.test);
    }

    #[test]
    fn test_all_flags_map_to_invocation() {
        let args = Args::try_parse_from([
            "pgbridge",
            "--config",
            "config.json",
            "--input",
            "in.jsonl",
            "--output",
            "out.txt",
            "--test",
        ])
        .unwrap();

        let invocation = args.into_invocation_args();
        assert_eq!(invocation.config_path, PathBuf::from("config.json"));
        assert_eq!(invocation.input_path, Some(PathBuf::from("in.jsonl")));
        assert_eq!(invocation.output_path, Some(PathBuf::from("out.txt")));
        assert!(invocation.test_mode);
    }
}
