use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::ReconcileError;
use crate::fs_util::{self, slug};

/// Layout of everything a run writes under the output root.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn xref_path(&self, organism: &str) -> Utf8PathBuf {
        self.root
            .join("xref")
            .join(format!("{}_id_crossref.csv", slug(organism)))
    }

    pub fn collisions_path(&self, organism: &str) -> Utf8PathBuf {
        self.root
            .join("xref")
            .join(format!("{}_alias_collisions.csv", slug(organism)))
    }

    /// One directory per analysis; analyses over the same table file get separate copies.
    pub fn augmented_path(
        &self,
        paper: &str,
        analysis_id: &str,
        table_name: &str,
    ) -> Utf8PathBuf {
        self.root
            .join("augmented")
            .join(slug(paper))
            .join(slug(analysis_id))
            .join(table_name)
    }

    pub fn diagnostics_path(&self) -> Utf8PathBuf {
        self.root.join("diagnostics").join("id_diagnostics.txt")
    }

    pub fn ensure_root(&self) -> Result<(), ReconcileError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| ReconcileError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ReconcileError> {
        fs_util::write_bytes_atomic(path.as_std_path(), content)
    }

    pub fn write_csv<T: Serialize>(path: &Utf8Path, rows: &[T]) -> Result<(), ReconcileError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer
                .serialize(row)
                .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ReconcileError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = OutputStore::new(Utf8PathBuf::from("out"));
        assert!(
            store
                .xref_path("Prochlorococcus MED4")
                .ends_with("xref/prochlorococcus_med4_id_crossref.csv")
        );
        assert!(
            store
                .augmented_path("Smith et al. 2020", "light", "Table_S1.csv")
                .ends_with("augmented/smith_et_al_2020/light/Table_S1.csv")
        );
        assert!(
            store
                .diagnostics_path()
                .ends_with("diagnostics/id_diagnostics.txt")
        );
    }
}
