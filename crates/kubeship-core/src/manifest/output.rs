//! Writing rendered manifests to an output directory.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{Manifest, ManifestSet};
use crate::cluster::ResourceKind;

pub fn manifest_path(dir: &Path, manifest: &Manifest) -> PathBuf {
    dir.join(manifest.file_name())
}

/// Write every manifest in the set to `dir`, creating it if needed.
///
/// A route file left over from an earlier run is removed when the set has no
/// external exposure, so the directory always mirrors what will be applied.
pub fn write_manifest_set(set: &ManifestSet, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(set.len());
    for manifest in set.iter() {
        let path = manifest_path(dir, manifest);
        let content = manifest.to_yaml()?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        tracing::debug!(path = %path.display(), kind = %manifest.kind(), "wrote manifest");
        written.push(path);
    }

    if set.external_exposure().is_none() {
        let stale = dir.join(format!(
            "{}-{}.yaml",
            set.app_name(),
            ResourceKind::Route.file_suffix()
        ));
        if stale.exists() {
            std::fs::remove_file(&stale).with_context(|| {
                format!("Failed to remove stale manifest: {}", stale.display())
            })?;
            tracing::debug!(path = %stale.display(), "removed stale route manifest");
        }
    }

    Ok(written)
}
