//! Host filename -> ISO 9660 / Joliet identifier mangling (spec.md §4.1).

use crate::error::IsoError;

/// Which d-character budget a mangled identifier must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterchangeLevel {
    /// 8.3 filenames, 8 character directory identifiers (ECMA-119 level 1).
    Level1,
    /// Up to 30 d-characters per identifier (ECMA-119 level 2), still ASCII/d-chars only.
    Level2Relaxed,
}

fn to_d_chars(name: &str) -> String {
    name.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Mangles a host directory name into a bare ISO 9660 directory identifier.
///
/// Directories carry no extension and no version number.
pub fn mangle_directory_identifier(
    host_name: &str,
    level: InterchangeLevel,
) -> Result<Vec<u8>, IsoError> {
    let cap = match level {
        InterchangeLevel::Level1 => 8,
        InterchangeLevel::Level2Relaxed => 30,
    };
    let mut base = to_d_chars(host_name);
    if base.is_empty() {
        return Err(IsoError::InvalidArgument(format!(
            "host name \"{host_name}\" has no d-characters to mangle"
        )));
    }
    base.truncate(cap);
    Ok(base.into_bytes())
}

/// Mangles a host file name into a `BASE.EXT;VERSION` (or `BASE.;VERSION`) identifier.
pub fn mangle_file_identifier(
    host_name: &str,
    version: u16,
    level: InterchangeLevel,
) -> Result<Vec<u8>, IsoError> {
    let (base_cap, ext_cap) = match level {
        InterchangeLevel::Level1 => (8, 3),
        InterchangeLevel::Level2Relaxed => (26, 3),
    };
    let (base, ext) = match host_name.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (host_name, ""),
    };
    let mut base = to_d_chars(base);
    let mut ext = to_d_chars(ext);
    if base.is_empty() {
        return Err(IsoError::InvalidArgument(format!(
            "host name \"{host_name}\" has no d-characters to mangle"
        )));
    }
    base.truncate(base_cap);
    ext.truncate(ext_cap);
    Ok(format!("{base}.{ext};{version}").into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_with_extension() {
        let id = mangle_file_identifier("readme.txt", 1, InterchangeLevel::Level1).unwrap();
        assert_eq!(id, b"README.TXT;1");
    }

    #[test]
    fn file_without_extension_still_has_dot() {
        let id = mangle_file_identifier("foo", 1, InterchangeLevel::Level1).unwrap();
        assert_eq!(id, b"FOO.;1");
    }

    #[test]
    fn directory_has_no_dot_or_version() {
        let id = mangle_directory_identifier("dir1", InterchangeLevel::Level1).unwrap();
        assert_eq!(id, b"DIR1");
    }

    #[test]
    fn level1_truncates_long_names() {
        let id =
            mangle_file_identifier("areallylongfilename.txt", 1, InterchangeLevel::Level1)
                .unwrap();
        assert_eq!(id, b"AREALLYL.TXT;1");
    }
}
