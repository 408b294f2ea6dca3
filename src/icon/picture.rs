//! Icon images and content fingerprints
//!
//! Every icon that flows through the crate is held as PNG bytes. Two icons
//! are "the same" when the SHA-256 of those bytes matches.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ImageError, ImageResult};

/// Edge length of generated placeholder icons (square)
const PLACEHOLDER_SIZE: u32 = 32;

/// SHA-256 of an icon's PNG bytes, hex encoded
///
/// Ordering is lexicographic on the hex string, which is what the
/// inconsistency detector uses to break ties between equal-size groups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of raw bytes
    pub fn of(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Fingerprint(format!("{hash:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for logs
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// A PNG-encoded icon image
#[derive(Clone, PartialEq, Eq)]
pub struct IconImage {
    png: Vec<u8>,
}

impl IconImage {
    /// Wrap bytes that are already PNG encoded.
    ///
    /// Any other format is decoded and re-encoded to PNG.
    pub fn from_bytes(data: Vec<u8>) -> ImageResult<Self> {
        match image::guess_format(&data) {
            Ok(ImageFormat::Png) => Ok(Self { png: data }),
            Ok(_) => {
                let decoded = image::load_from_memory(&data)?;
                Self::from_dynamic(&decoded)
            }
            Err(err) => Err(ImageError::DecodingFailed(err.to_string())),
        }
    }

    /// Encode raw RGBA pixels (as handed out by the clipboard) to PNG
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> ImageResult<Self> {
        let buffer = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            ImageError::DecodingFailed(format!(
                "pixel buffer does not match {}x{} RGBA",
                width, height
            ))
        })?;
        Self::from_dynamic(&DynamicImage::ImageRgba8(buffer))
    }

    /// Read an image file from disk
    pub fn load(path: &Path) -> ImageResult<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    fn from_dynamic(img: &DynamicImage) -> ImageResult<Self> {
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self { png })
    }

    /// Deterministic stand-in for the system icon of an extension.
    ///
    /// The fill color is derived from the extension's hash, so every file
    /// of one extension without a custom icon shares a fingerprint.
    pub fn placeholder_for(extension: &str) -> Self {
        let digest = Sha256::digest(format!("iconsmith-default:{extension}").as_bytes());
        let color = image::Rgba([digest[0], digest[1], digest[2], 255]);
        let buffer = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, color);

        let mut png = Vec::new();
        // Encoding an in-memory RGBA buffer cannot fail; keep an empty icon if it ever does
        if DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .is_err()
        {
            png.clear();
        }
        Self { png }
    }

    /// Downscale to a square thumbnail, re-encoded as PNG
    pub fn thumbnail(&self, size: u32) -> ImageResult<Self> {
        let img = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
        let resized = img.resize(size, size, FilterType::Lanczos3);
        Self::from_dynamic(&resized)
    }

    /// Write the PNG bytes to disk
    pub fn save(&self, path: &Path) -> ImageResult<()> {
        fs::write(path, &self.png)?;
        Ok(())
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.png)
    }
}

impl fmt::Debug for IconImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconImage")
            .field("bytes", &self.png.len())
            .field("fingerprint", &self.fingerprint().to_string())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn solid_icon(r: u8, g: u8, b: u8) -> IconImage {
    let pixels = [r, g, b, 255].repeat(16 * 16);
    IconImage::from_rgba(16, 16, pixels).unwrap()
}
