//! Utility functions

use std::path::{Component, Path, PathBuf};

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Path of the JSON header stored next to a raster file: `<file>.json`
pub fn sidecar_path(raster: &Path) -> PathBuf {
    let mut name = raster.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Whether `name` is a single plain path component, so joining it onto a
/// directory stays inside that directory
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Match `name` against a pattern where `*` matches any run of characters
/// and `?` matches exactly one
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/image01_grey-label.png")),
            PathBuf::from("/tmp/image01_grey-label.png.json")
        );
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("image01_grey-label"));
        assert!(is_plain_file_name("scan.v2"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../escape_grey-label"));
        assert!(!is_plain_file_name("scans/image01"));
        assert!(!is_plain_file_name("/abs"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name("dir\\name"));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("image01", "image01"));
        assert!(glob_match("image*", "image01_grey"));
        assert!(glob_match("*-label", "image01_grey-label"));
        assert!(glob_match("image0?_grey", "image01_grey"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "aXXbYYc"));
        assert!(!glob_match("image0?", "image012"));
        assert!(!glob_match("*-label", "image01_grey"));
        assert!(!glob_match("a*b", "acb_"));
    }
}
