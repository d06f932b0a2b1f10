use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::ReconcileError;

/// Opens a text file, decompressing it on the fly when it ends in `.gz`.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, ReconcileError> {
    let file = File::open(path).map_err(|err| ReconcileError::table_read(path, err))?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// File name with a trailing `.gz` removed, used for extension sniffing.
pub fn logical_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    name.strip_suffix(".gz").map(str::to_string).unwrap_or(name)
}

pub fn gzip_bytes(content: &[u8]) -> Result<Vec<u8>, ReconcileError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| ReconcileError::Filesystem(err.to_string()))
}

pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<(), ReconcileError> {
    let parent = path
        .parent()
        .ok_or_else(|| ReconcileError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent).map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("kira-lr-file")
        .tempfile_in(parent)
        .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('_');
            last_dash = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_gzipped_text() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("genes.tsv.gz");
        fs::write(&path, gzip_bytes(b"locus_tag\nPMM0001\n").unwrap()).unwrap();

        let lines = open_text(&path)
            .unwrap()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(lines, vec!["locus_tag", "PMM0001"]);
        assert_eq!(logical_name(&path), "genes.tsv");
    }

    #[test]
    fn slug_normalizes_names() {
        assert_eq!(slug("Prochlorococcus MED4"), "prochlorococcus_med4");
        assert_eq!(slug("  Smith et al. (2020) "), "smith_et_al_2020");
        assert_eq!(slug("***"), "unnamed");
    }
}
