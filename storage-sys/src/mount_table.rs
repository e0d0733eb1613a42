// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot of the OS mount table
//!
//! Mount points in `/proc/mounts` are octal-escaped (`\040` for a space).

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SysError};

/// Unescape octal sequences in mount table paths (e.g. `\040` -> ` `)
fn unescape_mount_path(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..index + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let octal = &s[index + 1..index + 4];
            if let Ok(byte) = u8::from_str_radix(octal, 8) {
                out.push(byte);
                index += 4;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    mount_points: BTreeSet<PathBuf>,
}

impl MountTable {
    /// Read the table at `path`. A missing file yields an empty table so the
    /// tool still works where no mount table is exposed.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Mount table {:?} not found, assuming nothing is mounted", path);
                Ok(Self::default())
            }
            Err(e) => Err(SysError::io(path, e)),
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mount_points = contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _device = fields.next()?;
                let mount_point = fields.next()?;
                Some(PathBuf::from(unescape_mount_path(mount_point)))
            })
            .collect();
        Self { mount_points }
    }

    pub fn is_mounted(&self, path: &Path) -> bool {
        if self.mount_points.contains(path) {
            return true;
        }
        path.canonicalize()
            .map(|canonical| self.mount_points.contains(&canonical))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.mount_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mount_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
https://acme/dav /mnt/cloud/parts/acme.alice fuse rw,nosuid,nodev 0 0
mhddfs /mnt/cloud/raid/.acme fuse.mhddfs rw,allow_other 0 0
https://x/dav /mnt/with\\040space fuse rw 0 0
";

    #[test]
    fn parses_mount_points() {
        let table = MountTable::parse(SAMPLE);
        assert_eq!(table.len(), 4);
        assert!(table.is_mounted(Path::new("/mnt/cloud/parts/acme.alice")));
        assert!(table.is_mounted(Path::new("/mnt/cloud/raid/.acme")));
        assert!(!table.is_mounted(Path::new("/mnt/cloud/parts/acme.bob")));
    }

    #[test]
    fn unescapes_octal_sequences() {
        let table = MountTable::parse(SAMPLE);
        assert!(table.is_mounted(Path::new("/mnt/with space")));
        assert_eq!(unescape_mount_path("/a\\134b"), "/a\\b");
        assert_eq!(unescape_mount_path("/trailing\\04"), "/trailing\\04");
    }

    #[test]
    fn missing_table_is_empty() {
        let table = MountTable::load(Path::new("/nonexistent/cloudpool/mounts")).unwrap();
        assert!(table.is_empty());
    }
}
