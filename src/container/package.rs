use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PipelineError;

/// An office container (docx/xlsx) held fully in memory as an ordered entry
/// list. Entry order, compression method, timestamps and permissions are
/// kept so that untouched parts survive the round trip unchanged.
pub struct ContainerPackage {
    pub entries: Vec<PackageEntry>,
}

pub struct PackageEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl ContainerPackage {
    pub fn from_bytes(buf: &[u8]) -> Result<Self, PipelineError> {
        let mut zip = ZipArchive::new(Cursor::new(buf))
            .map_err(|e| PipelineError::InvalidContainer(format!("not a zip archive: {e}")))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| PipelineError::InvalidContainer(format!("zip entry {i}: {e}")))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|e| {
                PipelineError::InvalidContainer(format!("read zip entry {}: {e}", file.name()))
            })?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    /// Serialize the container back to bytes, substituting the parts named
    /// in `replacements` and copying every other entry verbatim.
    pub fn to_bytes(
        &self,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for ent in &self.entries {
            let data = replacements.get(&ent.name).unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(&ent.name, opts).map_err(|e| {
                    PipelineError::Serialization(format!("add zip dir {}: {e}", ent.name))
                })?;
            } else {
                zout.start_file(&ent.name, opts).map_err(|e| {
                    PipelineError::Serialization(format!("start zip file {}: {e}", ent.name))
                })?;
                zout.write_all(data).map_err(|e| {
                    PipelineError::Serialization(format!("write zip file {}: {e}", ent.name))
                })?;
            }
        }
        let cursor = zout
            .finish()
            .map_err(|e| PipelineError::Serialization(format!("finish zip: {e}")))?;
        Ok(cursor.into_inner())
    }

    pub fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::ContainerPackage;
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn sample_zip() -> Vec<u8> {
        let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        zw.start_file("a.xml", opts).expect("start a");
        zw.write_all(b"<a/>").expect("write a");
        zw.start_file("b.bin", opts).expect("start b");
        zw.write_all(&[0u8, 1, 2, 3]).expect("write b");
        zw.finish().expect("finish").into_inner()
    }

    #[test]
    fn round_trip_keeps_untouched_entries() {
        let buf = sample_zip();
        let pkg = ContainerPackage::from_bytes(&buf).expect("read");
        let mut repl = HashMap::new();
        repl.insert("a.xml".to_string(), b"<b/>".to_vec());
        let out = pkg.to_bytes(&repl).expect("write");

        let mut zip = zip::ZipArchive::new(Cursor::new(out)).expect("reopen");
        let mut a = String::new();
        zip.by_name("a.xml")
            .expect("a")
            .read_to_string(&mut a)
            .expect("read a");
        assert_eq!(a, "<b/>");
        let mut b = Vec::new();
        zip.by_name("b.bin")
            .expect("b")
            .read_to_end(&mut b)
            .expect("read b");
        assert_eq!(b, vec![0u8, 1, 2, 3]);
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(ContainerPackage::from_bytes(b"plain text").is_err());
    }
}
