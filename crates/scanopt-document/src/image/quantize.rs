// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Palette quantizer — maps every channel of a raw scan onto three brightness
// bands (0, 102, 255), then forces achromatic pixels to pure black or pure
// white. Colored marks keep a little of their hue; text and paper come out
// crisp.

use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageReader, Rgb, RgbImage};
use rayon::prelude::*;
use scanopt_core::error::ImageError;
use tracing::{debug, info, instrument};

/// Channel values below this land in the dark band.
pub const DARK_LIMIT: u8 = 26;

/// Channel values at or above this land in the bright band.
pub const BRIGHT_LIMIT: u8 = 128;

/// Output level of the middle band.
pub const MID_LEVEL: u8 = 102;

/// Achromatic pixels whose original intensity is below this become black,
/// everything else white.
pub const GREY_THRESHOLD: u8 = 200;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Map a single channel value onto its band.
#[inline]
pub fn band(value: u8) -> u8 {
    if value < DARK_LIMIT {
        0
    } else if value < BRIGHT_LIMIT {
        MID_LEVEL
    } else {
        255
    }
}

/// Intensity of the original pixel (ITU-R BT.601 weights, integer maths).
/// Exact for true greys: `luma([v, v, v]) == v`.
#[inline]
pub fn luma(pixel: Rgb<u8>) -> u8 {
    let Rgb([r, g, b]) = pixel;
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    (weighted / 1000) as u8
}

/// Quantize one pixel.
///
/// The black/white decision for achromatic pixels compares the luma of the
/// original channels, not the banded ones, so a tint in one channel cannot
/// flip a near-white pixel to black.
#[inline]
pub fn quantize_pixel(pixel: Rgb<u8>) -> Rgb<u8> {
    let Rgb([r, g, b]) = pixel;
    let banded = [band(r), band(g), band(b)];

    if banded[0] == banded[1] && banded[1] == banded[2] {
        if luma(pixel) < GREY_THRESHOLD { BLACK } else { WHITE }
    } else {
        Rgb(banded)
    }
}

/// Quantize a whole image into a new buffer of the same dimensions.
///
/// Rows are independent, so they are processed in parallel.
pub fn quantize_image(source: &RgbImage) -> RgbImage {
    let (width, height) = source.dimensions();
    let mut output = RgbImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let row_len = width as usize * 3;
    output
        .par_chunks_exact_mut(row_len)
        .zip(source.par_chunks_exact(row_len))
        .for_each(|(dst_row, src_row)| {
            for (dst, src) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(3)) {
                let Rgb(q) = quantize_pixel(Rgb([src[0], src[1], src[2]]));
                dst.copy_from_slice(&q);
            }
        });

    output
}

/// Load the raw scan at `raw_path` and return its quantized raster.
pub fn quantize(raw_path: impl AsRef<Path>) -> Result<RgbImage, ImageError> {
    Ok(RasterQuantizer::open(raw_path)?.quantize().into_rgb())
}

/// Owns the pixel buffer of one scan while it is being quantized.
///
/// ```ignore
/// RasterQuantizer::open("tempScan.pnm")?
///     .quantize()
///     .save_png("scan.png")?;
/// ```
pub struct RasterQuantizer {
    image: RgbImage,
}

impl RasterQuantizer {
    // -- Construction ---------------------------------------------------------

    /// Decode a raw scan from disk. The format is sniffed from the content,
    /// so the extension does not have to match.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let decode_failed = |reason: String| ImageError::DecodeFailed {
            path: path.to_path_buf(),
            reason,
        };

        let decoded = ImageReader::open(path)
            .map_err(|err| decode_failed(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| decode_failed(err.to_string()))?
            .decode()
            .map_err(|err| decode_failed(err.to_string()))?;

        info!(
            width = decoded.width(),
            height = decoded.height(),
            color = ?decoded.color(),
            "Raw scan loaded"
        );
        Ok(Self {
            image: decoded.to_rgb8(),
        })
    }

    /// Wrap an already-decoded RGB raster.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb(self) -> RgbImage {
        self.image
    }

    // -- Transformation -------------------------------------------------------

    /// Apply the palette quantization to every pixel.
    #[instrument(skip(self), fields(width = self.width(), height = self.height()))]
    pub fn quantize(self) -> Self {
        let quantized = quantize_image(&self.image);
        debug!("Quantization complete");
        Self { image: quantized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG with the strongest compression and adaptive filtering.
    pub fn to_png_bytes(&self) -> image::ImageResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        self.image.write_with_encoder(encoder)?;
        Ok(buffer)
    }

    /// Write the raster to `path` as PNG, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let write_failed = |reason: String| ImageError::WriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = self
            .to_png_bytes()
            .map_err(|err| write_failed(format!("PNG encoding failed: {err}")))?;
        std::fs::write(path, &bytes).map_err(|err| write_failed(err.to_string()))?;
        info!(bytes = bytes.len(), "Wrote quantized PNG");
        Ok(())
    }
}

// -- Tests --------------------------------------------------------------------
