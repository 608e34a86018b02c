//! Preview texture for the selected image
//!
//! The texture is rebuilt only when the selection revision changes. Replacing
//! or clearing the selection drops the old handle, which frees the GPU texture.

use image::ImageError;
use tracing::{debug, warn};

use crate::shared::SelectedImage;

/// Decode an encoded image into a downscaled egui image
pub fn decode_preview(bytes: &[u8], max_edge: u32) -> Result<egui::ColorImage, ImageError> {
    let image = image::load_from_memory(bytes)?;
    let max_edge = max_edge.max(1);
    let image = if image.width() > max_edge || image.height() > max_edge {
        image.thumbnail(max_edge, max_edge)
    } else {
        image
    };

    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Texture cache keyed by selection revision
#[derive(Default)]
pub struct PreviewSlot {
    revision: Option<u64>,
    texture: Option<egui::TextureHandle>,
    /// Why the current selection has no preview
    error: Option<String>,
}

impl std::fmt::Debug for PreviewSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSlot")
            .field("revision", &self.revision)
            .field("texture", &self.texture.as_ref().map(|_| "<texture>"))
            .field("error", &self.error)
            .finish()
    }
}

impl PreviewSlot {
    /// Bring the texture in line with the current selection
    pub fn sync(&mut self, ctx: &egui::Context, selection: Option<&SelectedImage>, max_edge: u32) {
        let Some(selected) = selection else {
            self.clear();
            return;
        };
        if self.revision == Some(selected.revision) {
            return;
        }

        self.revision = Some(selected.revision);
        self.texture = None;
        self.error = None;

        match decode_preview(&selected.upload.bytes, max_edge) {
            Ok(color_image) => {
                debug!(
                    revision = selected.revision,
                    width = color_image.size[0],
                    height = color_image.size[1],
                    "Preview decoded"
                );
                self.texture = Some(ctx.load_texture(
                    "selection_preview",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
            Err(e) => {
                warn!(file = %selected.upload.file_name, "Preview unavailable: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.revision = None;
        self.texture = None;
        self.error = None;
    }

    pub fn texture(&self) -> Option<&egui::TextureHandle> {
        self.texture.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ImageUpload;
    use crate::shared::{ImageSource, SharedAppState};

    fn png(width: usize, height: usize) -> ImageUpload {
        ImageUpload::from_rgba(width, height, vec![128; width * height * 4]).unwrap()
    }

    #[test]
    fn test_decode_preview_downscales() {
        let image = decode_preview(&png(800, 400).bytes, 360).unwrap();
        assert_eq!(image.size[0], 360);
        assert!(image.size[1] <= 180);
    }

    #[test]
    fn test_decode_preview_keeps_small_images() {
        let image = decode_preview(&png(20, 10).bytes, 360).unwrap();
        assert_eq!(image.size, [20, 10]);
    }

    #[test]
    fn test_decode_preview_rejects_garbage() {
        assert!(decode_preview(b"definitely not an image", 360).is_err());
    }

    #[test]
    fn test_slot_tracks_revision_and_clears() {
        let ctx = egui::Context::default();
        let mut state = SharedAppState::default();
        let mut slot = PreviewSlot::default();

        state.select_image(png(4, 4), ImageSource::Clipboard);
        slot.sync(&ctx, state.selection.as_ref(), 360);
        assert!(slot.texture().is_some());
        let first = slot.texture().unwrap().id();

        slot.sync(&ctx, state.selection.as_ref(), 360);
        assert_eq!(slot.texture().unwrap().id(), first);

        state.select_image(png(6, 6), ImageSource::Dropped);
        slot.sync(&ctx, state.selection.as_ref(), 360);
        assert_ne!(slot.texture().unwrap().id(), first);

        state.clear();
        slot.sync(&ctx, state.selection.as_ref(), 360);
        assert!(slot.texture().is_none());
    }

    #[test]
    fn test_slot_records_decode_error() {
        let ctx = egui::Context::default();
        let mut state = SharedAppState::default();
        let mut slot = PreviewSlot::default();

        let heic = ImageUpload::from_bytes("photo.heic", vec![0u8; 32]).unwrap();
        state.select_image(heic, ImageSource::Dropped);
        slot.sync(&ctx, state.selection.as_ref(), 360);

        assert!(slot.texture().is_none());
        assert!(slot.error().is_some());
    }
}
