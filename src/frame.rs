//! Captured-frame handles and the sources that produce them.
//!
//! A [`Frame`] owns its file on disk and removes it when dropped, so the
//! temp image is released on the success path and the discard path alike,
//! and is never retained across capture cycles.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use uuid::Uuid;

const FRAME_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub struct Frame {
    path: PathBuf,
}

impl Frame {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("frame.jpg")
            .to_string()
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read frame {}", self.path.display()))
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Produce one frame. The returned handle owns (and will delete) the file.
    async fn capture(&self) -> Result<Frame>;
}

/// Runs a camera capture command per cycle, e.g. `libcamera-jpeg -n -o`;
/// the output path is appended as the final argument.
pub struct CommandFrameSource {
    program: String,
    args: Vec<String>,
    out_dir: PathBuf,
}

impl CommandFrameSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            out_dir: std::env::temp_dir(),
        }
    }
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn capture(&self) -> Result<Frame> {
        let path = self.out_dir.join(format!("sightline-{}.jpg", Uuid::new_v4()));

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .status()
            .await
            .with_context(|| format!("failed to spawn capture command '{}'", self.program))?;

        if !status.success() {
            bail!("capture command exited with {}", status);
        }
        if !path.exists() {
            bail!("capture command produced no frame at {}", path.display());
        }
        Ok(Frame::new(path))
    }
}

/// Drains the oldest image from a spool directory filled by an external
/// capture pipeline. The claimed file is moved out of the spool so its
/// lifetime belongs to the returned handle.
pub struct DirectoryFrameSource {
    dir: PathBuf,
}

impl DirectoryFrameSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn capture(&self) -> Result<Frame> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || claim_oldest_frame(&dir))
            .await
            .context("frame scan worker join failed")?
    }
}

fn claim_oldest_frame(dir: &Path) -> Result<Frame> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read spool directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_frame {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    candidates.sort_by_key(|(modified, _)| *modified);
    let (_, path) = candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no frame waiting in {}", dir.display()))?;

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    let claimed = std::env::temp_dir().join(format!("sightline-{}.{}", Uuid::new_v4(), ext));

    // rename fails across filesystems; fall back to copy + remove.
    if std::fs::rename(&path, &claimed).is_err() {
        std::fs::copy(&path, &claimed)
            .with_context(|| format!("failed to claim frame {}", path.display()))?;
        let _ = std::fs::remove_file(&path);
    }

    Ok(Frame::new(claimed))
}

/// Downscale oversized frames to keep uploads bounded; anything whose long
/// edge fits under `max_dim` passes through untouched. Returns the bytes to
/// upload and the file name they should carry.
pub fn bound_upload_size(bytes: Vec<u8>, file_name: &str, max_dim: u32) -> (Vec<u8>, String) {
    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(_) => return (bytes, file_name.to_string()),
    };

    if img.width().max(img.height()) <= max_dim {
        return (bytes, file_name.to_string());
    }

    let resized = DynamicImage::ImageRgb8(img.thumbnail(max_dim, max_dim).to_rgb8());
    let mut cursor = Cursor::new(Vec::new());
    if resized.write_to(&mut cursor, image::ImageFormat::Jpeg).is_err() {
        return (bytes, file_name.to_string());
    }
    (cursor.into_inner(), "frame.jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn frame_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        drop(Frame::new(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn small_frames_pass_through_unchanged() {
        let bytes = png_bytes(32, 32);
        let (out, name) = bound_upload_size(bytes.clone(), "frame.png", 1280);
        assert_eq!(out, bytes);
        assert_eq!(name, "frame.png");
    }

    #[test]
    fn oversized_frames_become_bounded_jpegs() {
        let bytes = png_bytes(200, 100);
        let (out, name) = bound_upload_size(bytes, "frame.png", 64);
        assert_eq!(name, "frame.jpg");

        let img = image::load_from_memory(&out).unwrap();
        assert!(img.width().max(img.height()) <= 64);
    }

    #[test]
    fn undecodable_bytes_pass_through() {
        let bytes = vec![1u8, 2, 3, 4];
        let (out, name) = bound_upload_size(bytes.clone(), "mystery.raw", 64);
        assert_eq!(out, bytes);
        assert_eq!(name, "mystery.raw");
    }

    #[tokio::test]
    async fn spool_source_claims_oldest_and_owns_it() {
        let spool = tempfile::tempdir().unwrap();
        let older = spool.path().join("a.jpg");
        std::fs::write(&older, b"old").unwrap();
        // Space the writes out so the mtimes order deterministically.
        std::thread::sleep(std::time::Duration::from_millis(25));
        let newer = spool.path().join("b.jpg");
        std::fs::write(&newer, b"new").unwrap();

        let source = DirectoryFrameSource::new(spool.path().to_path_buf());
        let frame = source.capture().await.unwrap();
        assert_eq!(frame.read().await.unwrap(), b"old");
        assert!(!older.exists());
        assert!(newer.exists());

        let path = frame.path().to_path_buf();
        drop(frame);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn empty_spool_is_an_error() {
        let spool = tempfile::tempdir().unwrap();
        let source = DirectoryFrameSource::new(spool.path().to_path_buf());
        assert!(source.capture().await.is_err());
    }
}
