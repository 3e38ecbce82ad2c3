//! Frame types and the fixed grayscale transform.

use image::RgbImage;

/// A color frame retrieved from a capture source.
///
/// Frames are transient: each one is owned by the loop iteration that
/// retrieved it and dropped once the converted frame has been displayed.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    /// RGB pixel data.
    pub image: RgbImage,
    /// Seconds since the source started.
    pub timestamp: f64,
    /// 1-based capture sequence number.
    pub frame_number: u64,
}

impl ColorFrame {
    pub fn new(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            timestamp,
            frame_number,
        }
    }

    /// Get frame dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Convert to a single-channel luminance frame.
    pub fn to_gray(&self) -> GrayFrame {
        GrayFrame::from_rgb(&self.image)
    }
}

/// A single-channel luminance frame, `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayFrame {
    /// Convert an RGB image with the standard ITU-R BT.601 weighting.
    ///
    /// Integer arithmetic, coefficients scaled by 1000: 299 + 587 + 114.
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);

        for rgb in image.as_raw().chunks_exact(3) {
            let r = rgb[0] as u32;
            let g = rgb[1] as u32;
            let b = rgb[2] as u32;
            let luminance = (299 * r + 587 * g + 114 * b) / 1000;
            data.push(luminance as u8);
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Get frame dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luminance values in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    #[test]
    fn gray_uses_bt601_channel_weights() {
        assert_eq!(GrayFrame::from_rgb(&solid(2, 2, [255, 0, 0])).data()[0], 76);
        assert_eq!(GrayFrame::from_rgb(&solid(2, 2, [0, 255, 0])).data()[0], 149);
        assert_eq!(GrayFrame::from_rgb(&solid(2, 2, [0, 0, 255])).data()[0], 29);
    }

    #[test]
    fn gray_preserves_extremes() {
        assert_eq!(
            GrayFrame::from_rgb(&solid(1, 1, [255, 255, 255])).data(),
            &[255]
        );
        assert_eq!(GrayFrame::from_rgb(&solid(1, 1, [0, 0, 0])).data(), &[0]);
    }

    #[test]
    fn gray_preserves_dimensions() {
        let gray = GrayFrame::from_rgb(&solid(7, 3, [10, 20, 30]));
        assert_eq!(gray.dimensions(), (7, 3));
        assert_eq!(gray.data().len(), 21);
    }

    #[test]
    fn gray_matches_equal_channel_input() {
        // With R = G = B the weights sum to 1000, so luma equals the input.
        for v in [0u8, 1, 127, 200, 255] {
            let gray = GrayFrame::from_rgb(&solid(1, 1, [v, v, v]));
            assert_eq!(gray.data(), &[v]);
        }
    }

    #[test]
    fn color_frame_converts_per_pixel() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 0, 255]));
        let frame = ColorFrame::new(image, 0.0, 1);

        let gray = frame.to_gray();
        assert_eq!(gray.data(), &[76, 29]);
    }
}
