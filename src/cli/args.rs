//! CLI argument definitions
//!
//! All Clap derive structs for `roastbout` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Match engine for a turn-based insult boxing party game.
#[derive(Parser, Debug)]
#[command(name = "roastbout", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "ROASTBOUT_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "ROASTBOUT_LOG_FORMAT")]
    pub log_format: LogFormatArg,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a complete all-bot match in memory and print the result.
    Simulate(SimulateArgs),

    /// Inspect and validate game configuration.
    Config(ConfigCommand),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Simulate
// ============================================================================

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to YAML game configuration.
    #[arg(short, long, env = "ROASTBOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of bot fighters.
    #[arg(short = 'n', long, default_value_t = 6)]
    pub fighters: usize,

    /// Seed for prompt draws, bot timing and bot choices.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the JSONL event stream to this file instead of stderr.
    #[arg(long, env = "ROASTBOUT_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port while the match runs.
    #[arg(long, env = "ROASTBOUT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Summary format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Config
// ============================================================================

/// Configuration commands.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Config subcommand.
    #[command(subcommand)]
    pub subcommand: ConfigSubcommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Validate configuration files.
    Validate(ConfigValidateArgs),

    /// Print the default configuration as YAML.
    Defaults,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["roastbout", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.fighters, 6);
        assert!(args.seed.is_none());
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn simulate_with_options() {
        let cli = Cli::try_parse_from([
            "roastbout",
            "-vv",
            "simulate",
            "--fighters",
            "8",
            "--seed",
            "42",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.fighters, 8);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn config_validate_requires_files() {
        let result = Cli::try_parse_from(["roastbout", "config", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_validate_strict() {
        let cli =
            Cli::try_parse_from(["roastbout", "config", "validate", "a.yaml", "b.yaml", "--strict"])
                .unwrap();
        let Commands::Config(ConfigCommand {
            subcommand: ConfigSubcommand::Validate(args),
        }) = cli.command
        else {
            panic!("expected config validate");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.strict);
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["roastbout", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["roastbout", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn color_flag_is_global() {
        let cli = Cli::try_parse_from(["roastbout", "version", "--color", "never"]).unwrap();
        assert_eq!(cli.color, ColorChoice::Never);
    }
}
