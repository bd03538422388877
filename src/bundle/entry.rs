//! Manifest file entries.
//!
//! Layout of one entry, all integers little-endian:
//!
//! | field           | encoding                        |
//! |-----------------|---------------------------------|
//! | offset          | i64                             |
//! | size            | i64                             |
//! | compressed size | i64 (0 when stored uncompressed)|
//! | type            | u8                              |
//! | relative path   | 7-bit length prefix + UTF-8     |

use std::fmt;

use super::reader::{write_7bit_length, Reader};
use super::{ManifestError, ManifestResult};

/// Smallest encoded entry: three i64 fields, the type byte and a one-byte
/// path length.
pub const MIN_ENTRY_LEN: usize = 3 * 8 + 1 + 1;

/// Kind of file embedded in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FileType {
    Unknown = 0,
    Assembly = 1,
    NativeBinary = 2,
    DepsJson = 3,
    RuntimeConfigJson = 4,
    Symbols = 5,
}

impl TryFrom<u8> for FileType {
    type Error = ManifestError;

    fn try_from(value: u8) -> ManifestResult<Self> {
        match value {
            0 => Ok(FileType::Unknown),
            1 => Ok(FileType::Assembly),
            2 => Ok(FileType::NativeBinary),
            3 => Ok(FileType::DepsJson),
            4 => Ok(FileType::RuntimeConfigJson),
            5 => Ok(FileType::Symbols),
            other => Err(ManifestError::InvalidFileType(other)),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Unknown => "unknown",
            FileType::Assembly => "assembly",
            FileType::NativeBinary => "native",
            FileType::DepsJson => "deps.json",
            FileType::RuntimeConfigJson => "runtimeconfig.json",
            FileType::Symbols => "symbols",
        };
        f.write_str(name)
    }
}

/// One embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub offset: i64,
    pub size: i64,
    pub compressed_size: i64,
    pub file_type: FileType,
    pub relative_path: String,
}

impl FileEntry {
    /// Read and validate one entry.
    pub fn read(reader: &mut Reader<'_>) -> ManifestResult<FileEntry> {
        let offset = reader.read_i64()?;
        let size = reader.read_i64()?;
        let compressed_size = reader.read_i64()?;
        let file_type = FileType::try_from(reader.read_u8()?)?;
        let relative_path = reader.read_path()?.to_string();

        let entry = FileEntry {
            offset,
            size,
            compressed_size,
            file_type,
            relative_path,
        };
        entry.validate()?;
        Ok(entry)
    }

    fn validate(&self) -> ManifestResult<()> {
        let reason = if self.offset <= 0 {
            "offset must be positive"
        } else if self.size < 0 {
            "size is negative"
        } else if self.compressed_size < 0 {
            "compressed size is negative"
        } else {
            return Ok(());
        };

        Err(ManifestError::InvalidEntry {
            path: self.relative_path.clone(),
            reason,
        })
    }

    /// Whether the file must be written to disk before the app can run.
    ///
    /// Assemblies and the json configuration files are consumed straight
    /// from the bundle image.
    pub fn needs_extraction(&self) -> bool {
        !matches!(
            self.file_type,
            FileType::Assembly | FileType::DepsJson | FileType::RuntimeConfigJson
        )
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// Append this entry in manifest layout.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.push(self.file_type as u8);
        write_7bit_length(out, self.relative_path.len());
        out.extend_from_slice(self.relative_path.as_bytes());
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] offset={} size={}",
            self.relative_path, self.file_type, self.offset, self.size
        )?;
        if self.is_compressed() {
            write!(f, " compressed={}", self.compressed_size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file_type: FileType, path: &str) -> FileEntry {
        FileEntry {
            offset: 4096,
            size: 1024,
            compressed_size: 0,
            file_type,
            relative_path: path.to_string(),
        }
    }

    #[test]
    fn test_read_entry() {
        let original = entry(FileType::NativeBinary, "libcoreclr.so");
        let mut data = Vec::new();
        original.write_to(&mut data);

        let mut reader = Reader::new(&data);
        assert_eq!(FileEntry::read(&mut reader).unwrap(), original);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_needs_extraction() {
        assert!(!entry(FileType::Assembly, "app.dll").needs_extraction());
        assert!(!entry(FileType::DepsJson, "app.deps.json").needs_extraction());
        assert!(!entry(FileType::RuntimeConfigJson, "app.runtimeconfig.json").needs_extraction());
        assert!(entry(FileType::NativeBinary, "libclrjit.so").needs_extraction());
        assert!(entry(FileType::Symbols, "app.pdb").needs_extraction());
        assert!(entry(FileType::Unknown, "readme.txt").needs_extraction());
    }

    #[test]
    fn test_unknown_file_type() {
        let mut data = Vec::new();
        entry(FileType::Assembly, "app.dll").write_to(&mut data);
        data[24] = 9;
        assert_eq!(
            FileEntry::read(&mut Reader::new(&data)),
            Err(ManifestError::InvalidFileType(9))
        );
    }

    #[test]
    fn test_invalid_offset() {
        let mut bad = entry(FileType::Assembly, "app.dll");
        bad.offset = 0;
        let mut data = Vec::new();
        bad.write_to(&mut data);
        assert!(matches!(
            FileEntry::read(&mut Reader::new(&data)),
            Err(ManifestError::InvalidEntry { reason: "offset must be positive", .. })
        ));
    }

    #[test]
    fn test_zero_sizes_are_valid() {
        let empty = FileEntry {
            size: 0,
            ..entry(FileType::RuntimeConfigJson, "app.runtimeconfig.json")
        };
        let mut data = Vec::new();
        empty.write_to(&mut data);
        assert!(data.len() >= MIN_ENTRY_LEN);
        assert_eq!(FileEntry::read(&mut Reader::new(&data)), Ok(empty));

        let mut negative = entry(FileType::Assembly, "app.dll");
        negative.compressed_size = -1;
        let mut data = Vec::new();
        negative.write_to(&mut data);
        assert!(matches!(
            FileEntry::read(&mut Reader::new(&data)),
            Err(ManifestError::InvalidEntry { reason: "compressed size is negative", .. })
        ));
    }

    #[test]
    fn test_display() {
        let mut e = entry(FileType::Assembly, "app.dll");
        assert_eq!(e.to_string(), "app.dll [assembly] offset=4096 size=1024");
        e.compressed_size = 300;
        assert!(e.to_string().ends_with("compressed=300"));
    }
}
