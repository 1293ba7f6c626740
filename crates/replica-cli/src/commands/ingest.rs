//! `replica ingest` command implementation

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::output::{self, OutputFormat};
use replica_foundation::KnowledgeIngestionService;
use replica_kernel::{EntryContent, ResilienceConfig};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_TEXT_TITLE: &str = "Training Content";
const DEFAULT_URL_TITLE: &str = "URL Content";

/// Execute the `replica ingest` command
pub async fn run(
    args: IngestArgs,
    config: &ResilienceConfig,
    format: OutputFormat,
) -> Result<(), CliError> {
    let items = collect_items(&args)?;
    let providers = super::providers(config)?;
    let service = KnowledgeIngestionService::new(config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling ingestion");
            on_signal.cancel();
        }
    });

    info!(
        resource = %args.resource,
        items = items.len(),
        provider = %providers.primary().name,
        "Ingesting"
    );
    let report = service
        .ingest_batch(&args.resource, items, &providers, &cancel)
        .await;
    service.shutdown().await;

    output::print_batch(&report, format)?;
    if args.health {
        output::print_health(&service.health_snapshot(), format)?;
    }

    let ready = report.ready_count();
    if ready < report.items.len() {
        return Err(CliError::Incomplete {
            ready,
            total: report.items.len(),
        });
    }
    Ok(())
}

/// Turn the command line into content items: texts, then files, then URLs.
pub fn collect_items(args: &IngestArgs) -> Result<Vec<EntryContent>, CliError> {
    let title_or = |default: &str| args.title.clone().unwrap_or_else(|| default.to_string());
    let mut items = Vec::new();

    for text in &args.text {
        if text.trim().is_empty() {
            return Err(CliError::InvalidInput("empty --text value".to_string()));
        }
        items.push(EntryContent::text(title_or(DEFAULT_TEXT_TITLE), text.trim()));
    }

    for path in &args.file {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CliError::InvalidInput(format!("not a file: {}", path.display())))?
            .to_string();
        items.push(EntryContent::file(
            title_or(&filename),
            filename,
            content_type(path),
            bytes,
        ));
    }

    for url in &args.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CliError::InvalidInput(format!("not an http(s) URL: {url}")));
        }
        items.push(EntryContent::url(title_or(DEFAULT_URL_TITLE), url.as_str()));
    }

    if items.is_empty() {
        return Err(CliError::InvalidInput(
            "nothing to ingest; pass --text, --file or --url".to_string(),
        ));
    }
    Ok(items)
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_titles_per_kind() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(b"# notes").unwrap();

        let args = IngestArgs {
            resource: "rep-1".into(),
            text: vec![" about me ".into()],
            file: vec![file.path().to_path_buf()],
            url: vec!["https://example.com".into()],
            ..Default::default()
        };
        let items = collect_items(&args).unwrap();

        assert_eq!(items[0], EntryContent::text("Training Content", "about me"));
        let EntryContent::File {
            title,
            content_type,
            bytes,
            ..
        } = &items[1]
        else {
            panic!("expected file");
        };
        assert!(title.ends_with(".md"));
        assert_eq!(content_type, "text/markdown");
        assert_eq!(bytes, b"# notes");
        assert_eq!(items[2], EntryContent::url("URL Content", "https://example.com"));
    }

    #[test]
    fn title_override_applies_to_all() {
        let args = IngestArgs {
            resource: "rep-1".into(),
            text: vec!["x".into()],
            url: vec!["http://a".into()],
            title: Some("Bio".into()),
            ..Default::default()
        };
        let items = collect_items(&args).unwrap();
        assert!(items.iter().all(|i| i.title() == "Bio"));
    }

    #[test]
    fn rejects_bad_input() {
        let empty = IngestArgs {
            resource: "rep-1".into(),
            ..Default::default()
        };
        assert!(matches!(collect_items(&empty), Err(CliError::InvalidInput(_))));

        let bad_url = IngestArgs {
            resource: "rep-1".into(),
            url: vec!["ftp://x".into()],
            ..Default::default()
        };
        assert!(matches!(collect_items(&bad_url), Err(CliError::InvalidInput(_))));

        let missing = IngestArgs {
            resource: "rep-1".into(),
            file: vec!["/definitely/not/here.txt".into()],
            ..Default::default()
        };
        assert!(matches!(collect_items(&missing), Err(CliError::Io(_))));
    }
}
