//! `replica reconcile` command implementation

use crate::cli::ProviderChoice;
use crate::error::CliError;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use replica_foundation::KnowledgeIngestionService;
use replica_kernel::ResilienceConfig;
use serde_json::json;

pub async fn run(
    resource: &str,
    title: &str,
    provider: ProviderChoice,
    config: &ResilienceConfig,
    format: OutputFormat,
) -> Result<(), CliError> {
    let providers = super::providers(config)?;
    let handle = match provider {
        ProviderChoice::Primary => providers.primary(),
        ProviderChoice::Secondary => providers.secondary().ok_or_else(|| {
            CliError::ConfigError("no secondary provider configured".to_string())
        })?,
    };

    let service = KnowledgeIngestionService::new(config);
    let found = service.reconcile_pending(handle, resource, title).await?;

    let result = json!({
        "resource_id": resource,
        "title": title,
        "provider": handle.name,
        "entry_id": found,
    });
    if let Some(rendered) = output::serialize(&result, format)? {
        println!("{rendered}");
        return Ok(());
    }
    match found {
        Some(id) => println!("{} {}", "Entry id:".green(), id),
        None => println!("{}", "No unique entry with that title yet".yellow()),
    }
    Ok(())
}
