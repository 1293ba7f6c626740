//! `replica config` command implementations

use crate::error::CliError;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use replica_kernel::ResilienceConfig;
use serde_json::Value;

const REDACTED: &str = "***";

/// Execute the `replica config check` command
///
/// Loading already validated the configuration; this reports what was found.
pub fn run_check(config: &ResilienceConfig) {
    println!("{}", "Configuration is valid".green());
    match (&config.providers.primary, &config.providers.secondary) {
        (None, _) => println!("{}", "No providers configured".yellow()),
        (Some(primary), None) => println!("Provider: {} ({})", primary.name, primary.base_url),
        (Some(primary), Some(secondary)) => {
            println!("Primary: {} ({})", primary.name, primary.base_url);
            println!("Secondary: {} ({})", secondary.name, secondary.base_url);
        }
    }
}

/// Execute the `replica config show` command
pub fn run_show(config: &ResilienceConfig, format: OutputFormat) -> Result<(), CliError> {
    let value = redacted(config)?;
    let rendered = match output::serialize(&value, format)? {
        Some(rendered) => rendered,
        None => serde_yaml::to_string(&value)?,
    };
    println!("{rendered}");
    Ok(())
}

fn redacted(config: &ResilienceConfig) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(config)?;
    for slot in ["primary", "secondary"] {
        if let Some(secret) = value
            .pointer_mut(&format!("/providers/{slot}/organization_secret"))
            .filter(|v| !v.is_null())
        {
            *secret = Value::String(REDACTED.to_string());
        }
    }
    Ok(value)
}
