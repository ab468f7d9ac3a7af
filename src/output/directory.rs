// src/output/directory.rs
//! One pretty-printed JSON file per matched certificate

use crate::output::{OutputHandler, sanitize_file_component};
use crate::types::CertificateEvent;
use anyhow::Context;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes `<YYYYmmdd_HHMMSS>_<domain>.json` into a directory.
///
/// Events that would land on an existing name get a `_<n>` suffix instead
/// of replacing the earlier file.
pub struct DirectoryOutput {
    dir: PathBuf,
}

impl DirectoryOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(event: &CertificateEvent) -> String {
        format!(
            "{}_{}",
            event.observed_at.format("%Y%m%d_%H%M%S"),
            sanitize_file_component(&event.matched_domain)
        )
    }

    /// Create a file that did not exist before, trying suffixed names on collision
    async fn create_unique(&self, stem: &str) -> anyhow::Result<(PathBuf, fs::File)> {
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{}.json", stem),
                n => format!("{}_{}.json", stem, n),
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }
    }
}

#[async_trait]
impl OutputHandler for DirectoryOutput {
    async fn handle(&self, event: &CertificateEvent) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;

        let data = serde_json::to_vec_pretty(event).context("Failed to serialize event")?;
        let (path, mut file) = self.create_unique(&Self::file_stem(event)).await?;

        file.write_all(&data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", path.display()))?;

        debug!("Certificate data written to: {}", path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::create_test_event;

    #[tokio::test]
    async fn test_writes_one_file_per_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out_dir = temp_dir.path().join("certs");
        let handler = DirectoryOutput::new(&out_dir);

        let mut event = create_test_event();
        event.matched_domain = "*.test.com".to_string();
        handler.handle(&event).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("___test_com.json"));

        let written = std::fs::read_to_string(out_dir.join(&files[0])).unwrap();
        let parsed: CertificateEvent = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, event);
    }

    #[tokio::test]
    async fn test_same_second_matches_do_not_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let handler = DirectoryOutput::new(temp_dir.path());

        let first = create_test_event();
        let mut second = first.clone();
        second.index = 124;
        second.serial_number = "67890".to_string();

        handler.handle(&first).await.unwrap();
        handler.handle(&second).await.unwrap();

        let mut files: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("_test_com.json"));
        assert!(files[1].ends_with("_test_com_1.json"));

        let mut serials: Vec<String> = files
            .iter()
            .map(|f| {
                let written = std::fs::read_to_string(temp_dir.path().join(f)).unwrap();
                serde_json::from_str::<CertificateEvent>(&written).unwrap().serial_number
            })
            .collect();
        serials.sort();
        assert_eq!(serials, vec!["12345", "67890"]);
    }
}
