use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

/// Copies the viewer artifacts plus the organized tree into the publish
/// directory. Retained originals under `dcm/` are never published.
pub fn run_sync(viewer: &Path, root: &Path, docs: &Path, clean: bool) -> Result<()> {
    if !viewer.is_dir() {
        bail!("{:?} does not exist or is not a directory", viewer);
    }
    if !root.is_dir() {
        bail!("{:?} does not exist or is not a directory", root);
    }

    if clean && docs.exists() {
        purge_dir(docs)?;
    }
    fs::create_dir_all(docs).context("Failed to create docs directory")?;

    let copied = copy_tree(viewer, docs, false)? + copy_tree(root, docs, true)?;
    println!("Synced {} + {} -> {} ({copied} files)", viewer.display(), root.display(), docs.display());
    Ok(())
}

/// Empties the target without removing the directory itself (it may be a
/// mount point or a git worktree path).
fn purge_dir(target: &Path) -> Result<()> {
    for entry in fs::read_dir(target).with_context(|| format!("Failed to read {target:?}"))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, skip_dcm: bool) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(from).min_depth(1).into_iter();
    for entry in walker.filter_entry(|e| {
        !(skip_dcm && e.file_type().is_dir() && e.file_name() == "dcm")
    }) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(from)?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
