// bspxfile.rs - BSPX extension directory appended after the last lump

use std::collections::BTreeMap;

use crate::error::{BspError, BspResult};
use crate::stream::{align4, put_i32, BspReader};

/// BSPX magic: "BSPX" in little-endian
pub const BSPXHEADER: i32 =
    (b'X' as i32) << 24 | (b'P' as i32) << 16 | (b'S' as i32) << 8 | b'B' as i32;

/// On-disk length of a BSPX entry name, zero padded.
pub const BSPX_NAME_LEN: usize = 24;

/// Named extension blobs riding after the lump directory. Unknown
/// entries survive load and write byte for byte. Entries are kept
/// sorted by name so output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BspxEntries {
    entries: BTreeMap<String, Vec<u8>>,
}

impl BspxEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(|v| v.as_slice())
    }

    /// Move `data` into the directory, leaving the source empty.
    /// Names longer than 24 bytes are truncated on write.
    pub fn transfer(&mut self, name: &str, data: &mut Vec<u8>) {
        self.entries.insert(name.to_string(), std::mem::take(data));
    }

    /// Insert a copy of `data` under `name`, replacing any old entry.
    pub fn copy(&mut self, name: &str, data: &[u8]) {
        self.entries.insert(name.to_string(), data.to_vec());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Scan for a BSPX directory at the 4-aligned end of the lump data.
    /// A file that simply ends there has no extensions; a directory that
    /// starts but overruns the file is an error.
    pub(crate) fn parse(file: &[u8], lumps_end: usize) -> BspResult<Self> {
        let mut out = BspxEntries::new();
        let start = (lumps_end + 3) & !3;
        if start + 8 > file.len() {
            return Ok(out);
        }

        let mut r = BspReader::new(file);
        r.seek(start)?;
        if r.read_i32()? != BSPXHEADER {
            return Ok(out);
        }
        let count = r.read_i32()?;
        if count <= 0 {
            return Ok(out);
        }

        for _ in 0..count {
            let name_bytes = r.read_bytes(BSPX_NAME_LEN)?;
            let end = name_bytes
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(BSPX_NAME_LEN);
            let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
            let fileofs = r.read_i32()?;
            let filelen = r.read_i32()?;
            if fileofs < 0 || filelen < 0 {
                return Err(BspError::TruncatedFile {
                    lump: "BSPX",
                    offset: fileofs.unsigned_abs() as usize,
                    length: filelen.unsigned_abs() as usize,
                    file_size: file.len(),
                });
            }
            let (ofs, len) = (fileofs as usize, filelen as usize);
            if ofs + len > file.len() {
                return Err(BspError::TruncatedFile {
                    lump: "BSPX",
                    offset: ofs,
                    length: len,
                    file_size: file.len(),
                });
            }
            log::debug!("BSPX lump {} ({} bytes)", name, len);
            out.entries.insert(name, file[ofs..ofs + len].to_vec());
        }
        Ok(out)
    }

    /// Append the directory and its blobs. Writes nothing when empty.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        if self.entries.is_empty() {
            return;
        }
        align4(out);
        put_i32(out, BSPXHEADER);
        put_i32(out, self.entries.len() as i32);

        // Directory first, then the blobs; offsets are known up front
        // because every blob start is 4-aligned.
        let mut ofs = out.len() + self.entries.len() * (BSPX_NAME_LEN + 8);
        for (name, data) in &self.entries {
            let mut name_bytes = [0u8; BSPX_NAME_LEN];
            let n = name.len().min(BSPX_NAME_LEN);
            name_bytes[..n].copy_from_slice(&name.as_bytes()[..n]);
            out.extend_from_slice(&name_bytes);
            ofs = (ofs + 3) & !3;
            put_i32(out, ofs as i32);
            put_i32(out, data.len() as i32);
            ofs += data.len();
        }
        for data in self.entries.values() {
            align4(out);
            out.extend_from_slice(data);
        }
    }
}
