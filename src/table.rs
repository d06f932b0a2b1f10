use std::borrow::Cow;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ReconcileError;
use crate::fs_util;

#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub name: String,
    pub preamble: Vec<String>,
    pub delimiter: u8,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path, skip_rows: usize) -> Result<Self, ReconcileError> {
        let reader = fs_util::open_text(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let hint = delimiter_for_name(&fs_util::logical_name(path));
        Self::from_reader(path, &name, reader, skip_rows, hint)
    }

    pub fn from_reader(
        path: &Path,
        name: &str,
        mut reader: impl BufRead,
        skip_rows: usize,
        delimiter_hint: Option<u8>,
    ) -> Result<Self, ReconcileError> {
        let mut preamble = Vec::with_capacity(skip_rows);
        let mut lossy = false;
        for _ in 0..skip_rows {
            let mut line = Vec::new();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|err| ReconcileError::table_read(path, err))?;
            if read == 0 {
                break;
            }
            let (line, replaced) = decode(&line);
            lossy |= replaced;
            preamble.push(line.trim_end_matches(['\r', '\n']).to_string());
        }

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| ReconcileError::table_read(path, err))?;
        let (body, replaced) = decode(&bytes);
        if lossy || replaced {
            warn!(table = %name, "table is not valid UTF-8; undecodable bytes replaced");
        }
        let body = body.strip_prefix('\u{feff}').unwrap_or(&body);
        let delimiter = delimiter_hint.unwrap_or_else(|| sniff_delimiter(body));

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());
        let headers = csv_reader
            .headers()
            .map_err(|err| ReconcileError::table_read(path, err))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        if headers.iter().all(|header| header.trim().is_empty()) {
            return Err(ReconcileError::table_read(path, "table has no header row"));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|err| ReconcileError::table_read(path, err))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            path: path.to_path_buf(),
            name: name.to_string(),
            preamble,
            delimiter,
            headers,
            rows,
        })
    }

    pub fn find_column(&self, column: &str) -> Option<usize> {
        let wanted = column.trim();
        self.headers
            .iter()
            .position(|header| header.trim() == wanted)
    }

    pub fn column_index(&self, column: &str) -> Result<usize, ReconcileError> {
        self.find_column(column)
            .ok_or_else(|| ReconcileError::MissingColumn {
                column: column.to_string(),
                table: self.name.clone(),
                available: self.available_columns(),
            })
    }

    pub fn available_columns(&self) -> String {
        self.headers
            .iter()
            .map(|header| header.trim())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column_values(&self, column: usize) -> Vec<&str> {
        (0..self.rows.len())
            .map(|row| self.cell(row, column))
            .collect()
    }

    /// Serializes the table with one extra trailing column, preamble included.
    pub fn to_bytes_with_column(
        &self,
        header: &str,
        values: &[String],
    ) -> Result<Vec<u8>, ReconcileError> {
        let mut out = Vec::new();
        for line in &self.preamble {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(out);
        let mut header_row = self.headers.clone();
        header_row.push(header.to_string());
        writer
            .write_record(&header_row)
            .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;

        for (idx, row) in self.rows.iter().enumerate() {
            let mut record = row.clone();
            if record.len() < self.headers.len() {
                record.resize(self.headers.len(), String::new());
            }
            record.push(values.get(idx).cloned().unwrap_or_default());
            writer
                .write_record(&record)
                .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|err| ReconcileError::Filesystem(err.to_string()))
    }
}

pub fn delimiter_for_name(name: &str) -> Option<u8> {
    let lower = name.to_lowercase();
    if lower.ends_with(".tsv") || lower.ends_with(".tab") || lower.ends_with(".txt") {
        Some(b'\t')
    } else if lower.ends_with(".csv") {
        Some(b',')
    } else {
        None
    }
}

/// Decodes text as UTF-8, replacing invalid sequences (Latin-1 exports).
fn decode(bytes: &[u8]) -> (String, bool) {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => (text.to_string(), false),
        Cow::Owned(text) => (text, true),
    }
}

fn sniff_delimiter(body: &str) -> u8 {
    let header = body.lines().next().unwrap_or("");
    if header.contains('\t') && !header.contains(',') {
        b'\t'
    } else {
        b','
    }
}
