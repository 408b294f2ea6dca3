//! Clipboard image source

use super::picture::IconImage;
use crate::error::ImageResult;

/// Anything that can hand out the image currently on a clipboard
pub trait ClipboardSource {
    /// `Ok(None)` when the clipboard holds no image
    fn read_image(&mut self) -> ImageResult<Option<IconImage>>;
}

/// The system clipboard, through `arboard`
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, arboard::Error> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_image(&mut self) -> ImageResult<Option<IconImage>> {
        match self.inner.get_image() {
            Ok(data) => {
                let icon = IconImage::from_rgba(
                    data.width as u32,
                    data.height as u32,
                    data.bytes.into_owned(),
                )?;
                Ok(Some(icon))
            }
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => {
                tracing::debug!(error = %err, "clipboard image unavailable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
pub(crate) struct FakeClipboard(pub Option<IconImage>);

#[cfg(test)]
impl ClipboardSource for FakeClipboard {
    fn read_image(&mut self) -> ImageResult<Option<IconImage>> {
        Ok(self.0.take())
    }
}
