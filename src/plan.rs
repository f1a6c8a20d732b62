//! Computes the ordered list of files to execute for a requested
//! migration direction or target version. Pure: touches neither disk
//! nor any driver.
use std::collections::HashMap;

use crate::direction::{Direction, Version};
use crate::error::Error;
use crate::file::{File, MigrationFileSet};

/// What the caller wants to happen to the schema.
#[derive(Debug, Clone, Copy)]
pub enum PlanRequest {
    /// Apply every outstanding `Up` migration, plus every `always`
    /// up-file regardless of version range.
    Up,
    /// Revert every applied migration, plus every `always` down-file
    /// regardless of version range.
    Down,
    /// Move `n` steps: positive applies, negative reverts.
    Migrate(i64),
    /// Move to an absolute target version.
    Goto(Version),
    /// Revert the most recently applied migration, then re-apply it.
    Redo,
    /// `Down` followed by `Up`, as a single plan.
    Reset,
}

/// Computes the ordered `Vec<File>` for `request` given `current`.
pub fn plan(set: &MigrationFileSet, current: Version, request: PlanRequest) -> Result<Vec<File>, Error> {
    match request {
        PlanRequest::Up => Ok(up_plan(set, current)),
        PlanRequest::Down => Ok(down_plan(set, current)),
        PlanRequest::Migrate(n) => Ok(set.from(current, n)),
        PlanRequest::Goto(target) => {
            let n = target as i64 - current as i64;
            Ok(set.from(current, n))
        }
        PlanRequest::Redo => {
            let down = set.from(current, -1);
            match down.first() {
                Some(latest) => {
                    let reverted_version = latest.version;
                    let before = reverted_version.checked_sub(1).unwrap_or(0);
                    let mut out = down;
                    out.extend(set.from(before, 1));
                    Ok(out)
                }
                None => Ok(Vec::new()),
            }
        }
        PlanRequest::Reset => {
            let mut out = down_plan(set, current);
            out.extend(up_plan(set, 0));
            Ok(out)
        }
    }
}

/// `ToLastFrom(current)` with `Always(Up)` appended — unioned, not
/// concatenated, since `to_last_from` already carries any always-up
/// file whose version happens to be in range and appending it again
/// would run it twice in the same plan.
fn up_plan(set: &MigrationFileSet, current: Version) -> Vec<File> {
    union_by_version(set.to_last_from(current), set.always(Direction::Up), Direction::Up)
}

/// `ToFirstFrom(current)` with `Always(Down)` appended, unioned for the
/// same reason as [`up_plan`].
fn down_plan(set: &MigrationFileSet, current: Version) -> Vec<File> {
    union_by_version(set.to_first_from(current), set.always(Direction::Down), Direction::Down)
}

/// Merges `primary` with `extra`, deduplicating by version (an entry in
/// `extra` that's already in `primary` doesn't run twice) and
/// re-sorting for `direction` — ascending for `Up`, descending for
/// `Down`.
fn union_by_version(primary: Vec<File>, extra: Vec<File>, direction: Direction) -> Vec<File> {
    let mut by_version: HashMap<Version, File> = HashMap::new();
    for f in primary.into_iter().chain(extra) {
        by_version.insert(f.version, f);
    }

    let mut out: Vec<File> = by_version.into_values().collect();
    match direction {
        Direction::Up => out.sort_by_key(|f| f.version),
        Direction::Down => out.sort_by(|a, b| b.version.cmp(&a.version)),
    }
    out
}
