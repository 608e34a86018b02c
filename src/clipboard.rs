//! System clipboard access for pasted images

use anyhow::{Context, Result};
use tracing::debug;

use crate::job::ImageUpload;

/// Read an image from the clipboard, `None` if it holds something else
pub fn read_image() -> Result<Option<ImageUpload>> {
    let mut clipboard = arboard::Clipboard::new().context("Failed to open clipboard")?;

    let image = match clipboard.get_image() {
        Ok(image) => image,
        Err(arboard::Error::ContentNotAvailable) => {
            debug!("Clipboard holds no image");
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to read clipboard image"),
    };

    debug!(width = image.width, height = image.height, "Read clipboard image");
    let upload = ImageUpload::from_rgba(image.width, image.height, image.bytes.into_owned())?;
    Ok(Some(upload))
}
