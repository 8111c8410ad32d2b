//! Camera frames handed to inference backends.
//!
//! - `Frame`: packed RGB8 pixels plus dimensions. Length is checked on construction.
//! - `write_chw`: nearest-neighbour resample into a normalized planar model input.
//!
//! Capture itself lives outside this crate; callers build frames from whatever
//! source they own.

use anyhow::{anyhow, Result};

/// Packed RGB8 frame. Dimensions are fixed at construction so they always
/// agree with the pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// All-black frame, used when no camera is attached.
    pub fn blank(width: u32, height: u32) -> Result<Self> {
        let len = rgb_len(width, height)?;
        Ok(Self {
            pixels: vec![0u8; len],
            width,
            height,
        })
    }

    /// Decode an image file (JPEG/PNG) into an RGB frame.
    #[cfg(feature = "image-input")]
    pub fn from_image_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Resample into `dst` as `[3][dst_h][dst_w]` floats in `[0, 1]`.
    ///
    /// `dst` must hold exactly `3 * dst_w * dst_h` values.
    pub fn write_chw(&self, dst: &mut [f32], dst_w: u32, dst_h: u32) -> Result<()> {
        let plane = dst_w as usize * dst_h as usize;
        if dst.len() != plane * 3 {
            return Err(anyhow!(
                "model input buffer holds {} values, expected {}",
                dst.len(),
                plane * 3
            ));
        }
        if self.is_empty() {
            dst.fill(0.0);
            return Ok(());
        }

        let src_w = self.width as usize;
        let (dw, dh) = (dst_w as usize, dst_h as usize);
        for y in 0..dh {
            let sy = y * self.height as usize / dh;
            for x in 0..dw {
                let sx = x * src_w / dw;
                let src = (sy * src_w + sx) * 3;
                for channel in 0..3 {
                    dst[channel * plane + y * dw + x] = self.pixels[src + channel] as f32 / 255.0;
                }
            }
        }
        Ok(())
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        assert!(Frame::new(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn blank_frame_has_rgb_len() {
        let frame = Frame::blank(640, 480).unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert_eq!(frame.pixels().len(), 640 * 480 * 3);
        assert!(frame.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn blank_frame_rejects_overflowing_dimensions() {
        assert!(Frame::blank(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn resampling_stays_inside_the_pixel_buffer() {
        // Dimensions are only reachable through constructors, so upsampling a
        // tiny frame into a large input never indexes past the buffer.
        let frame = Frame::new(vec![10, 20, 30], 1, 1).unwrap();
        let mut dst = vec![0.0f32; 3 * 64 * 48];
        frame.write_chw(&mut dst, 64, 48).unwrap();
        assert!(dst[..64 * 48].iter().all(|&v| v == 10.0 / 255.0));
        assert!(dst[2 * 64 * 48..].iter().all(|&v| v == 30.0 / 255.0));
    }

    #[test]
    fn chw_layout_and_scaling() {
        // 2x1 frame: red, then blue.
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1).unwrap();
        let mut dst = vec![0.0f32; 3 * 4 * 2];
        frame.write_chw(&mut dst, 4, 2).unwrap();

        let plane = 8;
        // Left half red, right half blue, on both rows.
        for y in 0..2 {
            for x in 0..4 {
                let red = dst[y * 4 + x];
                let blue = dst[2 * plane + y * 4 + x];
                if x < 2 {
                    assert_eq!((red, blue), (1.0, 0.0));
                } else {
                    assert_eq!((red, blue), (0.0, 1.0));
                }
                assert_eq!(dst[plane + y * 4 + x], 0.0);
            }
        }
    }

    #[test]
    fn chw_rejects_wrong_buffer() {
        let frame = Frame::blank(4, 4).unwrap();
        let mut dst = vec![0.0f32; 10];
        assert!(frame.write_chw(&mut dst, 4, 4).is_err());
    }
}
