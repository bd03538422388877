//! Ordered list of bundle entries.

use super::entry::{FileEntry, MIN_ENTRY_LEN};
use super::reader::Reader;
use super::{ManifestError, ManifestResult};

/// Entries of a bundle manifest, in stream order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    files: Vec<FileEntry>,
    need_extraction: bool,
}

impl Manifest {
    /// Read exactly `num_files` entries starting at the reader's position.
    ///
    /// Any entry that cannot be read fails the whole manifest.
    pub fn read(reader: &mut Reader<'_>, num_files: usize) -> ManifestResult<Manifest> {
        // The count comes from the bundle header; never reserve more entries
        // than the remaining bytes could hold.
        let capacity = num_files.min(reader.remaining() / MIN_ENTRY_LEN);
        let mut manifest = Manifest {
            files: Vec::with_capacity(capacity),
            need_extraction: false,
        };

        for index in 0..num_files {
            let entry = FileEntry::read(reader).map_err(|err| {
                log::error!("Bundle manifest entry {} of {} is invalid: {}", index, num_files, err);
                ManifestError::Entry {
                    index,
                    expected: num_files,
                    source: Box::new(err),
                }
            })?;
            log::trace!("Manifest entry {}: {}", index, entry);

            manifest.need_extraction |= entry.needs_extraction();
            manifest.files.push(entry);
        }

        log::debug!(
            "Read bundle manifest: {} files, extraction {}",
            manifest.files.len(),
            if manifest.need_extraction { "required" } else { "not required" }
        );

        Ok(manifest)
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// True if any entry must be extracted to disk.
    pub fn need_extraction(&self) -> bool {
        self.need_extraction
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entry with the given relative path.
    pub fn find(&self, relative_path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }
}
