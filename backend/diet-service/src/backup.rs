// Dataset backup
//
// Optional caller-side side effect: dump the current generation to a
// delimited file that `CsvFoodSource` can read back. Failures are reported to
// the caller and never touch recommender state.

use crate::services::recommender::Snapshot;
use crate::services::source::CsvRow;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Write every record of `snapshot` to `path`, creating parent directories.
/// Returns the number of rows written.
pub fn write_backup(path: &Path, snapshot: &Snapshot) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating backup directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("opening backup file {}", path.display()))?;

    for record in snapshot.records() {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;

    info!(
        "Backed up generation {} ({} records) to {}",
        snapshot.generation(),
        snapshot.len(),
        path.display()
    );

    Ok(snapshot.len())
}
