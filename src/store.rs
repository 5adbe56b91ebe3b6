use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reserved name of the condensed document; never read back as an input.
pub const ALL_REVIEWS_FILE: &str = "all_reviews.json";

/// Writes one pretty JSON document. Refuses to replace an existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(parent_dir)
                .with_context(|| format!("create output dir: {}", parent_dir.display()))?;
        }
    }

    let file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create output file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)
        .with_context(|| format!("serialize json: {}", path.display()))?;
    out.write_all(b"\n").context("write trailing newline")?;
    out.flush()
        .with_context(|| format!("flush output file: {}", path.display()))?;

    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open json: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse json: {}", path.display()))
}

pub fn condense_inputs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read results dir: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".json")
            || file_name.starts_with('.')
            || file_name == ALL_REVIEWS_FILE
        {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();
    Ok(inputs)
}

/// Concatenates every per-invocation document in `dir`. No deduplication.
pub fn condense<T: DeserializeOwned>(dir: &Path) -> anyhow::Result<Vec<T>> {
    let mut combined = Vec::new();
    for path in condense_inputs(dir)? {
        let records: Vec<T> = read_json(&path)?;
        tracing::debug!(path = %path.display(), records = records.len(), "condensed");
        combined.extend(records);
    }
    Ok(combined)
}
