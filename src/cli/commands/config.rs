//! `config` command handlers
//!
//! Implements `config validate` and `config defaults`.

use serde::Serialize;

use crate::cli::args::{ConfigValidateArgs, OutputFormat};
use crate::config::{ConfigLoader, GameConfig};
use crate::error::{ConfigError, RoastboutError};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validates each file and reports every issue.
///
/// # Errors
///
/// [`ConfigError::ValidationFailed`] when any file has errors, or warnings
/// under `--strict`.
pub fn validate(args: &ConfigValidateArgs) -> Result<(), RoastboutError> {
    let loader = ConfigLoader::default();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let report = match loader.load(path) {
            Ok(loaded) => {
                let warnings: Vec<String> = loaded
                    .warnings
                    .iter()
                    .map(|w| match &w.location {
                        Some(at) => format!("{} at {at}", w.message),
                        None => w.message.clone(),
                    })
                    .collect();
                FileReport {
                    file: path.display().to_string(),
                    valid: !(args.strict && !warnings.is_empty()),
                    errors: Vec::new(),
                    warnings,
                }
            }
            Err(ConfigError::ValidationError { errors, .. }) => FileReport {
                file: path.display().to_string(),
                valid: false,
                errors: errors.iter().map(ToString::to_string).collect(),
                warnings: Vec::new(),
            },
            Err(other) => FileReport {
                file: path.display().to_string(),
                valid: false,
                errors: vec![other.to_string()],
                warnings: Vec::new(),
            },
        };
        reports.push(report);
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Human => {
            for report in &reports {
                let mark = if report.valid { "ok" } else { "FAILED" };
                println!("{}: {mark}", report.file);
                for e in &report.errors {
                    println!("  {e}");
                }
                for w in &report.warnings {
                    println!("  warning: {w}");
                }
            }
        }
    }

    let count = reports.iter().filter(|r| !r.valid).count();
    if count > 0 {
        return Err(ConfigError::ValidationFailed { count }.into());
    }
    Ok(())
}

/// Prints the built-in configuration as YAML.
///
/// # Errors
///
/// Returns a YAML error if serialization fails.
pub fn defaults() -> Result<(), RoastboutError> {
    print!("{}", serde_yaml::to_string(&GameConfig::default())?);
    Ok(())
}
