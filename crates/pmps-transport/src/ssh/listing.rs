//! Parsing of the PLC's `ls -l -D %s` output
//!
//! The TwinCAT/BSD `ls` prints one header line followed by lines of the form
//!
//! ```text
//! -rw-r--r--  1 Administrator  wheel  1024 1700000000 plc-tst-motion.json
//! ```
//!
//! with the modification time as a UNIX timestamp.

use chrono::{DateTime, Utc};

use crate::RemoteEntry;

/// Split off `count` whitespace-separated fields, returning them and the
/// remainder of the line with leading whitespace removed.
fn split_fields(line: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    Some((fields, rest))
}

/// Parse one listing line. Returns `None` for non-file entries and for lines
/// that do not have the expected shape.
pub fn parse_line(line: &str) -> Option<RemoteEntry> {
    let (fields, name) = split_fields(line, 6)?;
    let name = name.trim_end();
    if name.is_empty() || !fields[0].starts_with('-') {
        return None;
    }
    let size = fields[4].parse::<u64>().ok()?;
    let modified_at = fields[5]
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    Some(RemoteEntry {
        name: name.to_string(),
        size,
        modified_at,
    })
}

/// Parse a full listing, skipping the `total` header and anything that is
/// not a regular file.
pub fn parse_listing(host: &str, output: &str) -> Vec<RemoteEntry> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("total") {
            continue;
        }
        match parse_line(trimmed) {
            Some(entry) => entries.push(entry),
            None if trimmed.starts_with('-') => {
                tracing::warn!(host, line = trimmed, "unparseable listing line");
            }
            None => {}
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "total 16
drwxr-xr-x  2 Administrator  wheel   512 1699990000 old
-rw-r--r--  1 Administrator  wheel  1024 1700000000 plc-tst-motion.json
-rw-r--r--  1 Administrator  wheel    17 1700000100 notes with spaces.txt
";

    #[test]
    fn parses_files_and_skips_directories() {
        let entries = parse_listing("plc-tst-motion", SAMPLE);

        assert_eq!(
            entries,
            vec![
                RemoteEntry {
                    name: "plc-tst-motion.json".to_string(),
                    size: 1024,
                    modified_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0),
                },
                RemoteEntry {
                    name: "notes with spaces.txt".to_string(),
                    size: 17,
                    modified_at: DateTime::<Utc>::from_timestamp(1_700_000_100, 0),
                },
            ]
        );
    }

    #[test]
    fn garbage_lines_are_skipped() {
        assert!(parse_line("-rw-r--r-- 1 a b notanumber 1700000000 x").is_none());
        assert!(parse_line("-rw-r--r-- 1 a b").is_none());
        assert!(parse_listing("h", "total 0\n").is_empty());
    }

    #[test]
    fn unparseable_timestamp_keeps_entry() {
        let entry = parse_line("-rw-r--r-- 1 a b 5 Nov x.json").unwrap();
        assert_eq!(entry.size, 5);
        assert_eq!(entry.modified_at, None);
    }
}
