//! Image format detection and archiving of uploaded photos.
//!
//! Recipes point at a resized copy of the photo they were generated from. Photos
//! judged not to be food are archived into a side directory so they can be reviewed.

use async_trait::async_trait;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;

use crate::fingerprint::ImageFingerprint;

/// Formats accepted for archiving.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Width archived images are scaled to; height follows the aspect ratio.
pub const ARCHIVE_WIDTH: u32 = 800;

/// Subdirectory for rejected (non-food) images.
pub const REJECTED_DIR: &str = "NoneFoodImages";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Archive task failed: {0}")]
    Task(String),
}

/// Which collection an image goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Image backing a generated recipe.
    Recipe,
    /// Image that was classified as not food.
    Rejected,
}

/// Guess the MIME type from magic bytes, defaulting to JPEG.
pub fn mime_type_of(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg")
}

/// Trait for image archives.
#[async_trait]
pub trait ImageArchive: Send + Sync {
    /// Store the image and return the path it can be served from.
    async fn archive(
        &self,
        fingerprint: &ImageFingerprint,
        data: &[u8],
        kind: ArchiveKind,
    ) -> Result<String, ArchiveError>;
}

/// Archive that writes resized copies under a root directory.
///
/// Layout: `{root}/{fingerprint}.{ext}` for recipes and
/// `{root}/NoneFoodImages/{fingerprint}.{ext}` for rejected images.
#[derive(Debug, Clone)]
pub struct DiskImageArchive {
    root: PathBuf,
}

impl DiskImageArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory from `SNAPCHEF_IMAGE_DIR`, defaulting to `images`.
    pub fn from_env() -> Self {
        let root = std::env::var("SNAPCHEF_IMAGE_DIR").unwrap_or_else(|_| "images".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

/// Decode, scale to [`ARCHIVE_WIDTH`] and write in the original format.
fn write_resized(
    dir: PathBuf,
    fingerprint: &str,
    data: &[u8],
) -> Result<PathBuf, ArchiveError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ArchiveError::Decode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| ArchiveError::Decode("Could not detect image format".to_string()))?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(ArchiveError::UnsupportedFormat(format!("{:?}", format)));
    }

    let img = reader
        .decode()
        .map_err(|e| ArchiveError::Decode(e.to_string()))?;

    let resized = img.resize(ARCHIVE_WIDTH, u32::MAX, FilterType::Lanczos3);
    // The JPEG encoder has no alpha support.
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };

    std::fs::create_dir_all(&dir)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let path = dir.join(format!("{}.{}", fingerprint, extension));

    resized
        .save_with_format(&path, format)
        .map_err(|e| ArchiveError::Encode(e.to_string()))?;

    Ok(path)
}

#[async_trait]
impl ImageArchive for DiskImageArchive {
    async fn archive(
        &self,
        fingerprint: &ImageFingerprint,
        data: &[u8],
        kind: ArchiveKind,
    ) -> Result<String, ArchiveError> {
        let dir = match kind {
            ArchiveKind::Recipe => self.root.clone(),
            ArchiveKind::Rejected => self.root.join(REJECTED_DIR),
        };
        let name = fingerprint.as_str().to_string();
        let data = data.to_vec();

        let path = tokio::task::spawn_blocking(move || write_resized(dir, &name, &data))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))??;

        Ok(path.to_string_lossy().into_owned())
    }
}

/// Archive that only records what it was asked to store. Useful in tests and when
/// running without a writable image directory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    archived: Mutex<Vec<(ImageFingerprint, ArchiveKind)>>,
    fail: bool,
    delay: Duration,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// An archive whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep this long before every call, to simulate a slow disk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn archived(&self) -> Vec<(ImageFingerprint, ArchiveKind)> {
        self.archived
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageArchive for MemoryArchive {
    async fn archive(
        &self,
        fingerprint: &ImageFingerprint,
        _data: &[u8],
        kind: ArchiveKind,
    ) -> Result<String, ArchiveError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ArchiveError::Io(std::io::Error::other("archive disabled")));
        }
        if let Ok(mut archived) = self.archived.lock() {
            archived.push((fingerprint.clone(), kind));
        }
        let collection = match kind {
            ArchiveKind::Recipe => "recipes",
            ArchiveKind::Rejected => "rejected",
        };
        Ok(format!("memory://{}/{}", collection, fingerprint))
    }
}
