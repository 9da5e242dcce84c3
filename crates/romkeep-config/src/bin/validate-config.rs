//! Config validation CLI tool
//!
//! Validates a romkeep configuration file and reports any errors.

use romkeep_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a romkeep configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match romkeep_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", romkeep_config::CURRENT_CONFIG_VERSION);
            println!("  Data: {}", config.paths.data_dir.display());
            println!("  Recovery file: {}", config.paths.recovery_file.display());
            if config.input.gamepad {
                println!(
                    "  Switch combo: {} + {}",
                    config.input.combo[0], config.input.combo[1]
                );
            } else {
                println!("  Switch combo: disabled");
            }

            if !config.systems.is_empty() {
                println!();
                println!("Systems:");
                for (name, system) in &config.systems {
                    let marker = if system.launcher.is_file() { "" } else { " (missing)" };
                    println!("  - {}: {}{}", name, system.launcher.display(), marker);
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                romkeep_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                romkeep_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                romkeep_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                romkeep_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        romkeep_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
