//! Raw clipboard images and their PNG encoding.

use clipring_common::ImageBlob;
use sha2::{Digest, Sha256};

/// Image encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("failed to decode PNG: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("unsupported PNG color type {0:?}")]
    UnsupportedColor(png::ColorType),
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    Dimensions { width: usize, height: usize, len: usize },
}

/// An 8-bit RGBA pixel buffer as exchanged with the OS clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

impl RgbaImage {
    pub fn new(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self, ImageError> {
        if width.checked_mul(height).and_then(|px| px.checked_mul(4)) != Some(bytes.len()) {
            return Err(ImageError::Dimensions {
                width,
                height,
                len: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.bytes.is_empty()
    }

    /// Content signature used for change detection.
    ///
    /// Covers dimensions and pixels only, so two PNGs with different
    /// compression settings but the same pixels share a signature.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_be_bytes());
        hasher.update((self.height as u64).to_be_bytes());
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<ImageBlob, ImageError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width as u32, self.height as u32);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.bytes)?;
            writer.finish()?;
        }
        Ok(ImageBlob::from_png(out))
    }

    /// Decode any 8- or 16-bit PNG into RGBA.
    pub fn decode_png(data: &[u8]) -> Result<Self, ImageError> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;

        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());

        let bytes = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 0xff])
                .collect(),
            png::ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 0xff]).collect(),
            other => return Err(ImageError::UnsupportedColor(other)),
        };

        Self::new(info.width as usize, info.height as usize, bytes)
    }
}
