//! Local file packaging
//!
//! A `local_file` destination hands its records back instead of writing
//! them; this module turns that payload into a CSV or JSON file on disk.
//!
//! Format, delimiter and header options usually live on the destination
//! connection; the node config can override them and names the file.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sluice_core::domain::node::{ConfigMap, FileFormat, LocalFileOptions};
use sluice_core::domain::record::{Record, RecordSet};
use std::path::{Path, PathBuf};

/// Connection config overlaid with the node config
pub fn packaging_config(connection: Option<&Value>, node: &ConfigMap) -> ConfigMap {
    let mut merged = match connection {
        Some(Value::Object(map)) => map.clone(),
        _ => ConfigMap::new(),
    };
    for (key, value) in node {
        if !value.is_null() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Writes `data` to a file in `out_dir`
///
/// Returns `None` without touching the filesystem when there are no records.
pub fn write_payload(
    data: &RecordSet,
    config: &ConfigMap,
    pipeline_name: &str,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    if data.is_empty() {
        return Ok(None);
    }

    let options: LocalFileOptions = serde_json::from_value(Value::Object(config.clone()))
        .context("Invalid local_file options")?;

    let path = out_dir.join(file_name(&options, pipeline_name));
    let contents = match options.format {
        FileFormat::Csv => to_csv(
            data,
            options.delimiter.unwrap_or(','),
            options.include_headers,
        )?,
        FileFormat::Json => serde_json::to_string_pretty(data)?,
    };

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(Some(path))
}

/// Explicit file name if configured, else `<pipeline>_<timestamp>.<ext>`
///
/// Names never carry directories, so the file always lands in `out_dir`.
fn file_name(options: &LocalFileOptions, pipeline_name: &str) -> String {
    let extension = options.format.extension();

    if let Some(name) = options.file_name.as_deref().map(sanitize).filter(|n| !n.is_empty()) {
        return if Path::new(&name).extension().is_some() {
            name
        } else {
            format!("{name}.{extension}")
        };
    }

    let base: String = pipeline_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let base = if base.is_empty() { "export" } else { base.as_str() };

    format!("{base}_{}.{extension}", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Last path component of `name`, restricted to a safe character set
fn sanitize(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Union of all record keys, in the order they are first seen
fn columns(data: &RecordSet) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for record in data {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

fn cell(record: &Record, column: &str) -> String {
    match record.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn to_csv(data: &RecordSet, delimiter: char, include_headers: bool) -> Result<String> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("CSV delimiter '{delimiter}' must be a single ASCII character"))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let columns = columns(data);
    if include_headers {
        writer.write_record(&columns)?;
    }
    for record in data {
        writer.write_record(columns.iter().map(|column| cell(record, column)))?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    Ok(String::from_utf8(bytes)?)
}
