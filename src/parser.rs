//! Parses migration filenames of the form
//! `<version>_<name>.<up|down|alwaysup|alwaysdown>.<ext>`.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::direction::Direction;
use crate::error::Error;

/// The parsed fields of a migration filename.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParsedFilename {
    pub version: u64,
    pub name: String,
    pub direction: Direction,
    pub always: bool,
}

static FILENAME_REGEX_CACHE: Lazy<std::sync::Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

/// Builds (and caches) the filename regex for a given extension.
fn filename_regex(extension: &str) -> Regex {
    let mut cache = FILENAME_REGEX_CACHE.lock().expect("regex cache poisoned");
    cache
        .entry(extension.to_string())
        .or_insert_with(|| {
            let pattern = format!(
                r"^([0-9]+)_([^.]+)\.(up|down|alwaysup|alwaysdown)\.{}$",
                regex::escape(extension)
            );
            Regex::new(&pattern).expect("migration filename regex")
        })
        .clone()
}

/// Parses a single migration filename against the expected extension.
///
/// Returns `Error::Parse` on any mismatch: missing version prefix, empty
/// name, wrong or missing direction token, or wrong extension. There is
/// no partial result on failure.
pub fn parse_filename(filename: &str, extension: &str) -> Result<ParsedFilename, Error> {
    let re = filename_regex(extension);
    let captures = re
        .captures(filename)
        .ok_or_else(|| Error::Parse(filename.to_string()))?;

    let version: u64 = captures
        .get(1)
        .unwrap()
        .as_str()
        .parse()
        .map_err(|_| Error::Parse(filename.to_string()))?;
    let name = captures.get(2).unwrap().as_str().to_string();
    let token = captures.get(3).unwrap().as_str();

    let (direction, always) = match token {
        "up" => (Direction::Up, false),
        "down" => (Direction::Down, false),
        "alwaysup" => (Direction::Up, true),
        "alwaysdown" => (Direction::Down, true),
        _ => return Err(Error::Parse(filename.to_string())),
    };

    Ok(ParsedFilename {
        version,
        name,
        direction,
        always,
    })
}

/// Formats a migration filename from its fields. The inverse of
/// [`parse_filename`]; used by property tests and by [`crate::create`].
pub fn format_filename(version: u64, name: &str, direction: Direction, always: bool, extension: &str) -> String {
    format!("{}_{}.{}.{}", version, name, direction.token(always), extension)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        let cases = [
            ("001_test_file.up.sql", 1u64, "test_file", Direction::Up, false),
            ("001_test_file.down.sql", 1, "test_file", Direction::Down, false),
            ("10034_test_file.down.sql", 10034, "test_file", Direction::Down, false),
            ("001_test_file.alwaysup.sql", 1, "test_file", Direction::Up, true),
            ("001_test_file.alwaysdown.sql", 1, "test_file", Direction::Down, true),
            (
                "10034_test_file.alwaysdown.sql",
                10034,
                "test_file",
                Direction::Down,
                true,
            ),
        ];

        for (filename, version, name, direction, always) in cases {
            let parsed = parse_filename(filename, "sql").expect(filename);
            assert_eq!(parsed.version, version);
            assert_eq!(parsed.name, name);
            assert_eq!(parsed.direction, direction);
            assert_eq!(parsed.always, always);
        }
    }

    #[test]
    fn test_invalid_filenames() {
        let cases = [
            "-1_test_file.down.sql",
            "test_file.down.sql",
            "100_test_file.down",
            "100_test_file.sql",
            "100_test_file",
            "test_file",
            "100",
            ".sql",
            "up.sql",
            "down.sql",
            "-1_test_file.alwaysdown.sql",
            "test_file.alwaysdown.sql",
            "100_test_file.alwaysdown",
            "alwaysup.sql",
            "alwaysdown.sql",
        ];

        for filename in cases {
            assert!(
                parse_filename(filename, "sql").is_err(),
                "expected error for {filename}"
            );
        }
    }

    #[test]
    fn test_round_trip() {
        let name = format_filename(1234, "name_long", Direction::Up, false, "sql");
        assert_eq!(name, "1234_name_long.up.sql");
        let parsed = parse_filename(&name, "sql").unwrap();
        assert_eq!(parsed.version, 1234);
        assert_eq!(parsed.name, "name_long");
        assert_eq!(parsed.direction, Direction::Up);
        assert!(!parsed.always);

        let name = format_filename(7, "views", Direction::Down, true, "cql");
        let parsed = parse_filename(&name, "cql").unwrap();
        assert_eq!(parsed.version, 7);
        assert_eq!(parsed.name, "views");
        assert_eq!(parsed.direction, Direction::Down);
        assert!(parsed.always);
    }

    #[test]
    fn test_wrong_extension_rejected() {
        assert!(parse_filename("001_test.up.cql", "sql").is_err());
    }
}
