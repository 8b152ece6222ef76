//! Backup and quarantine stores

mod backup;
mod quarantine;

pub use backup::BackupStore;
pub use quarantine::QuarantineStore;

use crate::probe::FileRecord;
use nix::sys::stat::utimes;
use nix::sys::time::TimeVal;
use nix::unistd::{chown, Gid, Uid};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

/// Reapply the captured mode, owner, and modification time to `path`.
///
/// Owner reapplication is best-effort: unprivileged processes cannot chown,
/// and ownership is not part of the drift check anyway. Mode and mtime
/// failures are real errors, since equality against the baseline depends on
/// them.
pub(crate) fn apply_attributes(path: &Path, record: &FileRecord) -> anyhow::Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(record.mode))?;

    if let Err(e) = chown(
        path,
        Some(Uid::from_raw(record.uid)),
        Some(Gid::from_raw(record.gid)),
    ) {
        debug!("could not restore owner of {:?}: {}", path, e);
    }

    let mtime = TimeVal::new(record.mtime, 0);
    utimes(path, &mtime, &mtime)?;

    Ok(())
}
