//! Scaffolds a new migration: picks the next version and writes a pair
//! of empty `up`/`down` files for it.
use std::path::{Path, PathBuf};

use tokio::fs::File as TokioFile;

use crate::direction::{Direction, Version};
use crate::error::Error;
use crate::file::MigrationFileSet;

/// The pair of paths written for a newly scaffolded migration.
#[derive(Debug, Clone)]
pub struct CreatedMigration {
    pub version: Version,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Creates the next version's empty `up`/`down` pair under `path`, named
/// `<version>_<name>.<up|down>.<extension>`. The next version is one
/// past the highest currently discovered, or `1` if the directory has
/// no conforming files yet.
pub async fn create(path: &Path, name: &str, extension: &str) -> Result<CreatedMigration, Error> {
    let existing = MigrationFileSet::discover(path, extension).await?;
    let version = if existing.is_empty() { 1 } else { existing.highest_version() + 1 };

    let up_path = path.join(format_name(version, name, Direction::Up, extension));
    let down_path = path.join(format_name(version, name, Direction::Down, extension));

    TokioFile::create(&up_path).await?;
    TokioFile::create(&down_path).await?;

    Ok(CreatedMigration {
        version,
        up_path,
        down_path,
    })
}

fn format_name(version: Version, name: &str, direction: Direction, extension: &str) -> String {
    crate::parser::format_filename(version, name, direction, false, extension)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_first_migration() {
        let dir = tempdir().unwrap();
        let created = create(dir.path(), "init", "sql").await.unwrap();
        assert_eq!(created.version, 1);
        assert!(created.up_path.ends_with("1_init.up.sql"));
        assert!(created.down_path.ends_with("1_init.down.sql"));
        assert!(tokio::fs::metadata(&created.up_path).await.is_ok());
        assert!(tokio::fs::metadata(&created.down_path).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_increments_from_existing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("005_first.up.sql"), b"").unwrap();
        std::fs::write(dir.path().join("005_first.down.sql"), b"").unwrap();
        let created = create(dir.path(), "second", "sql").await.unwrap();
        assert_eq!(created.version, 6);
    }
}
