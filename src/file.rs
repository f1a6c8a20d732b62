//! The migration file model: a single script, a version pair, and the
//! ordered set of all version pairs discovered on disk.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs::{read, read_dir};

use crate::direction::{Direction, Version};
use crate::error::Error;
use crate::parser::parse_filename;

/// A single migration script.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub file_name: String,
    pub version: Version,
    pub name: String,
    pub direction: Direction,
    pub always: bool,
    pub content: Option<Vec<u8>>,
}

impl File {
    fn new(path: PathBuf, file_name: String, version: Version, name: String, direction: Direction, always: bool) -> Self {
        Self {
            path,
            file_name,
            version,
            name,
            direction,
            always,
            content: None,
        }
    }

    /// Loads the file's content from disk, if it hasn't been loaded yet.
    pub async fn load_content(&mut self) -> Result<&[u8], Error> {
        if self.content.is_none() {
            self.content = Some(read(&self.path).await?);
        }
        Ok(self.content.as_deref().unwrap())
    }
}

/// The up and down files for a single version. At least one is present.
#[derive(Debug, Clone, Default)]
pub struct MigrationFile {
    pub version: Version,
    pub up: Option<File>,
    pub down: Option<File>,
}

impl MigrationFile {
    fn file(&self, direction: Direction) -> Option<&File> {
        match direction {
            Direction::Up => self.up.as_ref(),
            Direction::Down => self.down.as_ref(),
        }
    }
}

/// The full, immutable set of migration files discovered for one
/// migrations directory, sorted ascending by version.
#[derive(Debug, Clone, Default)]
pub struct MigrationFileSet {
    files: Vec<MigrationFile>,
}

impl MigrationFileSet {
    /// Scans `path` non-recursively, parsing every regular file against
    /// `extension`. A single nonconforming entry aborts discovery for
    /// the whole directory.
    pub async fn discover(path: &Path, extension: &str) -> Result<Self, Error> {
        let mut by_version: HashMap<Version, MigrationFile> = HashMap::new();
        let mut dir = read_dir(path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') {
                continue;
            }

            let parsed = parse_filename(&file_name, extension)?;
            let file = File::new(
                entry.path(),
                file_name.clone(),
                parsed.version,
                parsed.name,
                parsed.direction,
                parsed.always,
            );

            let slot = by_version.entry(parsed.version).or_insert_with(|| MigrationFile {
                version: parsed.version,
                up: None,
                down: None,
            });

            let occupied = match parsed.direction {
                Direction::Up => slot.up.is_some(),
                Direction::Down => slot.down.is_some(),
            };
            if occupied {
                return Err(Error::DuplicateVersion {
                    version: parsed.version,
                    direction: parsed.direction,
                });
            }

            match parsed.direction {
                Direction::Up => slot.up = Some(file),
                Direction::Down => slot.down = Some(file),
            }
        }

        let mut files: Vec<MigrationFile> = by_version.into_values().collect();
        files.sort_by_key(|f| f.version);

        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn versions(&self) -> Vec<Version> {
        self.files.iter().map(|f| f.version).collect()
    }

    pub fn highest_version(&self) -> Version {
        self.files.iter().map(|f| f.version).max().unwrap_or(0)
    }

    /// All `Up` files (regular and `always` alike) with version greater
    /// than `current`, ascending. Used for the `up` and `reset` plans.
    pub fn to_last_from(&self, current: Version) -> Vec<File> {
        let mut out: Vec<File> = self
            .files
            .iter()
            .filter(|f| f.version > current)
            .filter_map(|f| f.file(Direction::Up).cloned())
            .collect();
        out.sort_by_key(|f| f.version);
        out
    }

    /// All `Down` files with version less than or equal to `current`,
    /// descending. Used for the `down` and `reset` plans.
    pub fn to_first_from(&self, current: Version) -> Vec<File> {
        let mut out: Vec<File> = self
            .files
            .iter()
            .filter(|f| f.version <= current)
            .filter_map(|f| f.file(Direction::Down).cloned())
            .collect();
        out.sort_by(|a, b| b.version.cmp(&a.version));
        out
    }

    /// The subset of files with `always == true` in `direction`, in
    /// version order (ascending for `Up`, descending for `Down`).
    pub fn always(&self, direction: Direction) -> Vec<File> {
        let mut out: Vec<File> = self
            .files
            .iter()
            .filter_map(|f| f.file(direction).cloned())
            .filter(|f| f.always)
            .collect();
        match direction {
            Direction::Up => out.sort_by_key(|f| f.version),
            Direction::Down => out.sort_by(|a, b| b.version.cmp(&a.version)),
        }
        out
    }

    /// Steps `relative` migrations from `current`. Positive moves
    /// forward through `Up` files with version `> current`; negative
    /// moves backward through `Down` files with version `<= current`.
    ///
    /// The result is the version-sorted union of the first
    /// `relative.abs()` non-`always` files in range with *every*
    /// `always` file of that direction — `always` files run regardless
    /// of version range, so they are never filtered by the `current`
    /// boundary — but only when `relative != 0`. A step count larger
    /// than the number of available files silently truncates; it is not
    /// an error.
    pub fn from(&self, current: Version, relative: i64) -> Vec<File> {
        if relative == 0 {
            return Vec::new();
        }

        let direction = if relative > 0 { Direction::Up } else { Direction::Down };
        let count = relative.unsigned_abs() as usize;

        let mut candidates: Vec<File> = self
            .files
            .iter()
            .filter(|f| match direction {
                Direction::Up => f.version > current,
                Direction::Down => f.version <= current,
            })
            .filter_map(|f| f.file(direction).cloned())
            .collect();

        match direction {
            Direction::Up => candidates.sort_by_key(|f| f.version),
            Direction::Down => candidates.sort_by(|a, b| b.version.cmp(&a.version)),
        }

        let regular: Vec<File> = candidates.iter().filter(|f| !f.always).take(count).cloned().collect();

        let mut selected: HashMap<Version, File> = HashMap::new();
        for f in regular.into_iter().chain(self.always(direction)) {
            selected.insert(f.version, f);
        }

        let mut out: Vec<File> = selected.into_values().collect();
        match direction {
            Direction::Up => out.sort_by_key(|f| f.version),
            Direction::Down => out.sort_by(|a, b| b.version.cmp(&a.version)),
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    async fn scenario_dir() -> tempfile::TempDir {
        let dir = tempdir().expect("tempdir");
        let names = [
            "002_m.up.sql",
            "002_m.down.sql",
            "001_m.up.sql",
            "001_m.down.sql",
            "010_m.alwaysup.sql",
            "101_create.up.sql",
            "101_drop.down.sql",
            "301_m.up.sql",
            "401_m.down.sql",
        ];
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_basic_discovery_order() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();
        assert_eq!(set.versions(), vec![1, 2, 10, 101, 301, 401]);
    }

    #[tokio::test]
    async fn test_nonconforming_file_is_fatal() {
        let dir = scenario_dir().await;
        fs::write(dir.path().join("nonsense.txt"), b"").unwrap();
        let result = MigrationFileSet::discover(dir.path(), "sql").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_from_scenarios() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();

        let cases: &[(Version, i64, &[Version])] = &[
            (0, 2, &[1, 2, 10]),
            (1, 4, &[2, 10, 101, 301]),
            (1, 0, &[]),
            (0, 1, &[1, 10]),
            (0, 0, &[]),
            (101, -2, &[101, 2]),
            (401, -1, &[401]),
        ];

        for (current, relative, expected) in cases {
            let result = set.from(*current, *relative);
            let versions: Vec<Version> = result.iter().map(|f| f.version).collect();
            assert_eq!(&versions, expected, "from({current}, {relative})");
        }
    }

    #[tokio::test]
    async fn test_from_always_file_ignores_version_boundary() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();

        // current is past the always-up file's version (10) and there's
        // nothing left in range to step through; the always file must
        // still surface, since it runs regardless of version range.
        let result = set.from(301, 1);
        let versions: Vec<Version> = result.iter().map(|f| f.version).collect();
        assert_eq!(versions, vec![10]);
    }

    #[tokio::test]
    async fn test_to_first_from() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();
        let files = set.to_first_from(401);
        let versions: Vec<Version> = files.iter().map(|f| f.version).collect();
        assert_eq!(versions, vec![401, 101, 2, 1]);
        assert!(files.iter().all(|f| f.direction == Direction::Down));
    }

    #[tokio::test]
    async fn test_to_last_from() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();
        let files = set.to_last_from(0);
        let versions: Vec<Version> = files.iter().map(|f| f.version).collect();
        assert_eq!(versions, vec![1, 2, 10, 101, 301]);
        assert!(files.iter().all(|f| f.direction == Direction::Up));
    }

    #[tokio::test]
    async fn test_content_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("401_m.down.sql"), b"test").unwrap();
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();
        let mut file = set.to_first_from(401).remove(0);
        let content = file.load_content().await.unwrap().to_vec();
        assert_eq!(content, b"test");
    }

    #[tokio::test]
    async fn test_single_file_name() {
        let dir = scenario_dir().await;
        let set = MigrationFileSet::discover(dir.path(), "sql").await.unwrap();
        let up = set.to_last_from(0).remove(0);
        assert_eq!(up.name, "m");
        assert_eq!(up.file_name, "001_m.up.sql");
    }
}
