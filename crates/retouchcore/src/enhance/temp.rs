use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Temp files belonging to one work item.
///
/// Names are derived from the item id, so concurrent items never collide. Call
/// [`TempFiles::release`] when the item is done; if the guard is dropped without it
/// (worker task aborted) the files are removed synchronously.
#[derive(Debug)]
pub struct TempFiles {
    input: PathBuf,
    output: PathBuf,
    released: bool,
}

impl TempFiles {
    pub fn for_item(dir: &Path, id: Uuid) -> Self {
        Self {
            input: dir.join(format!("{}_input", id)),
            output: dir.join(format!("{}_output.jpg", id)),
            released: false,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Deletes both files. Absent files are fine; other errors are logged only.
    pub async fn release(mut self) {
        self.released = true;
        for path in [&self.input, &self.output] {
            remove_temp_file(path).await;
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for path in [&self.input, &self.output] {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    log::warn!("Failed to remove temp file {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Removes a file, treating "already gone" as success.
pub async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Removed temp file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove temp file {}: {}", path.display(), e),
    }
}
