//! Newline-delimited JSON files for the two-phase export/import path.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::document::model::Document;
use crate::error::MigrationError;

/// Write one document per line. Returns the number written.
pub fn write_ndjson<'a>(
    path: &Path,
    documents: impl IntoIterator<Item = &'a Document>,
) -> Result<usize, MigrationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for document in documents {
        serde_json::to_writer(&mut writer, &document.to_value())?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Read a file of consolidated documents.
///
/// The outer error is for the file itself; each line yields its own result,
/// with failures tagged by 1-based line number. Blank lines are skipped.
pub fn read_ndjson(path: &Path) -> Result<Vec<Result<Document, MigrationError>>, MigrationError> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = parse_line(&line).map_err(|source| MigrationError::Ndjson {
            line: index + 1,
            source: Box::new(source),
        });
        documents.push(parsed);
    }
    Ok(documents)
}

fn parse_line(line: &str) -> Result<Document, MigrationError> {
    let value: Value = serde_json::from_str(line)?;
    Ok(Document::from_value(value)?)
}
