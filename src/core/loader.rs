//! Task file loading.
//!
//! Each non-blank record is one task: `Process,Name1,Value1,...,NameN,ValueN`.
//! Fields follow the usual comma-separated dialect: a field wrapped in
//! double quotes may contain commas and line breaks, and `""` inside it is a
//! literal quote. A leading byte-order mark is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::task::spawn_blocking;

use crate::core::task::{Parameter, TaskRecord};
use crate::{Error, Result};

/// Load task records from the file at `path`.
///
/// The path is checked before anything is read.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskRecord>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    parse_tasks(&contents)
}

/// [`load_tasks`] on the blocking pool, for callers inside the runtime.
pub async fn load_tasks_async(path: PathBuf) -> Result<Vec<TaskRecord>> {
    spawn_blocking(move || load_tasks(&path))
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
}

/// Parse task records from file contents.
///
/// Sequence numbers start at 1 and follow file order. Blank lines are
/// skipped without consuming a number; errors report the 1-based line on
/// which the offending record starts.
pub fn parse_tasks(contents: &str) -> Result<Vec<TaskRecord>> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut tasks = Vec::new();
    for record in split_records(contents)? {
        if record.is_blank() {
            continue;
        }
        tasks.push(parse_row(tasks.len() + 1, record.row, record.fields)?);
    }
    Ok(tasks)
}

fn parse_row(seq: usize, row: usize, fields: Vec<String>) -> Result<TaskRecord> {
    let mut fields = fields.into_iter();
    let procedure = match fields.next() {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(Error::MalformedRow {
                row,
                reason: "missing process name".to_string(),
            })
        }
    };

    let rest: Vec<String> = fields.collect();
    if rest.len() % 2 != 0 {
        return Err(Error::MalformedRow {
            row,
            reason: format!(
                "parameter '{}' has no value",
                rest.last().map(String::as_str).unwrap_or_default()
            ),
        });
    }

    let parameters = rest
        .chunks_exact(2)
        .map(|pair| Parameter::new(pair[0].clone(), pair[1].clone()))
        .collect();
    Ok(TaskRecord::new(seq, procedure, parameters))
}

struct Record {
    /// Line on which the record starts.
    row: usize,
    fields: Vec<String>,
    quoted: bool,
}

impl Record {
    fn is_blank(&self) -> bool {
        !self.quoted && self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

fn split_records(contents: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut row = 1;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            '\n' if in_quotes => {
                line += 1;
                field.push('\n');
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(Record {
                    row,
                    fields: std::mem::take(&mut fields),
                    quoted,
                });
                quoted = false;
                line += 1;
                row = line;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::MalformedRow {
            row,
            reason: "unterminated quoted field".to_string(),
        });
    }
    fields.push(field);
    records.push(Record {
        row,
        fields,
        quoted,
    });
    Ok(records)
}
