use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "groundcontrol", version, about = "Ground Control job server")]
pub struct CliArgs {
    /// Path to configuration file (JSON, YAML or TOML).
    #[arg(short = 'c', long = "config-path", env = "GROUNDCONTROL_CONFIG_PATH")]
    pub config_path: Option<String>,
}
