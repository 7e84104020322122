//! Subcommand execution.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use marketdata_storage::StorageClient;
use serde_json::{Map, Value};

use crate::TRACING_TARGET_COMMAND;
use crate::config::Command;

/// Runs `command` against `client`, writing results to stdout.
pub(crate) async fn run(client: &StorageClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Store { path, files } => store(client, &path, &files).await,
        Command::List { prefix } => list(client, &prefix).await,
        Command::Load {
            prefix,
            file_names,
            compact,
        } => load(client, &prefix, file_names, compact).await,
    }
}

async fn store(client: &StorageClient, path: &str, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut objects = Vec::new();
    for file in files {
        objects.extend(read_objects(file).await?);
    }

    let count = objects.len();
    client
        .store(path, objects)
        .await
        .with_context(|| format!("failed to store objects under '{path}'"))?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        path,
        count,
        files = files.len(),
        "objects stored"
    );
    Ok(())
}

async fn list(client: &StorageClient, prefix: &str) -> anyhow::Result<()> {
    let file_names = client
        .list(prefix)
        .await
        .with_context(|| format!("failed to list '{prefix}'"))?;

    let mut stdout = std::io::stdout().lock();
    for file_name in &file_names {
        writeln!(stdout, "{file_name}")?;
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        prefix,
        count = file_names.len(),
        "objects listed"
    );
    Ok(())
}

async fn load(
    client: &StorageClient,
    prefix: &str,
    file_names: Vec<String>,
    compact: bool,
) -> anyhow::Result<()> {
    let objects = client
        .load(prefix, file_names)
        .await
        .with_context(|| format!("failed to load objects from '{prefix}'"))?;

    let count = objects.len();
    let output: Map<String, Value> = objects.into_iter().collect();
    let rendered = if compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    writeln!(std::io::stdout().lock(), "{rendered}")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        prefix,
        count,
        "objects loaded"
    );
    Ok(())
}

/// Reads one JSON document from `file` and returns the objects it holds.
async fn read_objects(file: &Path) -> anyhow::Result<Vec<Value>> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document: Value = serde_json::from_slice(&contents)
        .with_context(|| format!("invalid JSON in {}", file.display()))?;
    Ok(split_document(document))
}

/// A top-level array yields its elements; any other value is one object.
fn split_document(document: Value) -> Vec<Value> {
    match document {
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn split_document_flattens_arrays() {
        let document = json!([
            {"Meta Data": {"2. Symbol": "AAPL"}},
            {"Meta Data": {"2. Symbol": "MSFT"}},
        ]);
        assert_eq!(split_document(document).len(), 2);
    }

    #[test]
    fn split_document_keeps_single_object() {
        let document = json!({"Meta Data": {"2. Symbol": "AAPL"}});
        assert_eq!(split_document(document.clone()), vec![document]);
    }

    #[tokio::test]
    async fn read_objects_reports_missing_file() {
        let err = read_objects(Path::new("does/not/exist.json")).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
