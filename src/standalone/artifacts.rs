//! Names of the files a run creates in its work directory.
//!
//! | stage      | name                                  |
//! |------------|---------------------------------------|
//! | map output | `tmp-map-out-p<run>-f<mapper>.<part>` |
//! | sorted     | `tmp-red-in-p<run>.<part>`            |
//! | output     | `red-out-p<run>.<part>`               |
//!
//! Partitions are zero padded to four digits. Each map worker owns its
//! own mapper index, so no two workers ever write the same file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::{glob, Pattern};
use tracing::warn;

use crate::emitter::PartitionedEmitter;

#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    dir: PathBuf,
    run_id: u32,
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>, run_id: u32) -> Self {
        Self {
            dir: dir.into(),
            run_id,
        }
    }

    /// The template handed to the partitioned emitter of map worker `mapper`.
    pub fn map_output_template(&self, mapper: usize) -> PathBuf {
        self.dir
            .join(format!("tmp-map-out-p{}-f{}", self.run_id, mapper))
    }

    /// Every map output written for `partition` so far.
    pub fn map_outputs(&self, partition: u32) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/tmp-map-out-p{}-f*.{:04}",
            self.escaped_dir(),
            self.run_id,
            partition
        );
        Ok(glob(&pattern)?.flatten().collect())
    }

    /// The sorted input of the reducer for `partition`.
    pub fn reduce_input(&self, partition: u32) -> PathBuf {
        PartitionedEmitter::partition_path(
            &self.dir.join(format!("tmp-red-in-p{}", self.run_id)),
            partition,
        )
    }

    /// The final output for `partition`.
    pub fn reduce_output(&self, partition: u32) -> PathBuf {
        PartitionedEmitter::partition_path(
            &self.dir.join(format!("red-out-p{}", self.run_id)),
            partition,
        )
    }

    /// Temporary files of this run still present in the work directory.
    pub fn leftovers(&self) -> Result<Vec<PathBuf>> {
        let dir = self.escaped_dir();
        let mut found = Vec::new();
        for pattern in [
            format!("{}/tmp-map-out-p{}-f*", dir, self.run_id),
            format!("{}/tmp-red-in-p{}.*", dir, self.run_id),
        ] {
            found.extend(glob(&pattern)?.flatten());
        }
        Ok(found)
    }

    /// Removes whatever [`leftovers`](Self::leftovers) finds, returning how
    /// many files went away.
    pub fn remove_leftovers(&self) -> usize {
        match self.leftovers() {
            Ok(paths) => remove_files(&paths),
            Err(e) => {
                warn!("could not list leftovers in {}: {:#}", self.dir.display(), e);
                0
            }
        }
    }

    fn escaped_dir(&self) -> String {
        Pattern::escape(&self.dir.to_string_lossy())
    }
}

/// Best-effort removal. Files that are already gone are not an error.
pub fn remove_files<P: AsRef<Path>>(paths: &[P]) -> usize {
    let mut removed = 0;
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_convention() {
        let layout = ArtifactLayout::new("/work", 42);
        assert_eq!(
            layout.map_output_template(3),
            PathBuf::from("/work/tmp-map-out-p42-f3")
        );
        assert_eq!(layout.reduce_input(7), PathBuf::from("/work/tmp-red-in-p42.0007"));
        assert_eq!(layout.reduce_output(0), PathBuf::from("/work/red-out-p42.0000"));
    }

    #[test]
    fn map_outputs_match_one_partition_of_one_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path(), 5);
        for name in [
            "tmp-map-out-p5-f0.0001",
            "tmp-map-out-p5-f1.0001",
            "tmp-map-out-p5-f1.0002",
            "tmp-map-out-p55-f0.0001",
            "tmp-map-out-p6-f0.0001",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let found = layout.map_outputs(1).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("tmp-map-out-p5-f0.0001"),
                dir.path().join("tmp-map-out-p5-f1.0001"),
            ]
        );
    }

    #[test]
    fn leftovers_skip_outputs_and_other_runs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path(), 9);
        for name in [
            "tmp-map-out-p9-f0.0000",
            "tmp-red-in-p9.0000",
            "red-out-p9.0000",
            "tmp-red-in-p91.0000",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        assert_eq!(layout.remove_leftovers(), 2);
        assert!(dir.path().join("red-out-p9.0000").exists());
        assert!(dir.path().join("tmp-red-in-p91.0000").exists());
        assert!(layout.leftovers().unwrap().is_empty());
    }

    #[test]
    fn removing_missing_files_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(remove_files(&[dir.path().join("nope")]), 0);
    }
}
