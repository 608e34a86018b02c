//! Image payloads ready for upload

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File name used for clipboard images
pub const PASTED_FILE_NAME: &str = "paste.png";

/// Errors building an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not an image")]
    NotAnImage(String),
    #[error("clipboard image has inconsistent size {width}x{height}")]
    BadDimensions { width: usize, height: usize },
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// An image held in memory, with the metadata the multipart part needs
#[derive(Clone)]
pub struct ImageUpload {
    pub bytes: Arc<[u8]>,
    pub file_name: String,
    pub mime: String,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    /// Read an image file from disk
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::from_bytes(file_name, bytes)
    }

    /// Wrap bytes that came without a path (e.g. a dropped payload)
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<Self, UploadError> {
        let file_name = file_name.into();
        let bytes = bytes.into();
        let mime = detect_mime(&file_name, &bytes)
            .ok_or_else(|| UploadError::NotAnImage(file_name.clone()))?;
        Ok(Self {
            bytes,
            file_name,
            mime: mime.to_string(),
        })
    }

    /// Encode raw RGBA pixels (clipboard contents) as a PNG
    pub fn from_rgba(width: usize, height: usize, rgba: Vec<u8>) -> Result<Self, UploadError> {
        let image = u32::try_from(width)
            .ok()
            .zip(u32::try_from(height).ok())
            .and_then(|(w, h)| RgbaImage::from_raw(w, h, rgba))
            .ok_or(UploadError::BadDimensions { width, height })?;

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(Self {
            bytes: png.into(),
            file_name: PASTED_FILE_NAME.to_string(),
            mime: "image/png".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Whether a MIME type names an image
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// MIME type from the file extension, falling back to sniffing the content
fn detect_mime(file_name: &str, bytes: &[u8]) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());

    let by_extension = match extension.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("heic") | Some("heif") => Some("image/heic"),
        Some("gif") => Some("image/gif"),
        Some("bmp") => Some("image/bmp"),
        Some("tif") | Some("tiff") => Some("image/tiff"),
        _ => None,
    };

    by_extension.or_else(|| {
        image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type())
            .filter(|mime| is_image_mime(mime))
    })
}

/// Extensions offered by the file dialog
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "heic", "heif", "gif", "bmp", "tif", "tiff",
];
