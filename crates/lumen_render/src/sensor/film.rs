//! Image storage

use std::path::Path;
use std::sync::RwLock;

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Spectrum;

/// A single RGB film pixel
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PixelRgb {
    /// Red component (linear radiance)
    pub r: f32,
    /// Green component (linear radiance)
    pub g: f32,
    /// Blue component (linear radiance)
    pub b: f32,
}

/// Linear RGB image buffer a sensor renders into
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: RwLock<Vec<PixelRgb>>,
}

impl Film {
    /// Create a black film of the given resolution
    pub fn new(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: RwLock::new(vec![PixelRgb::zeroed(); count]),
        }
    }

    /// Film width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Film height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Store a pixel value, overwriting the previous one
    pub fn put(&self, x: u32, y: u32, value: Spectrum) {
        debug_assert!(x < self.width && y < self.height);
        let idx = (y as usize) * (self.width as usize) + x as usize;
        let mut pixels = self.pixels.write().unwrap();
        pixels[idx] = PixelRgb {
            r: value.x,
            g: value.y,
            b: value.z,
        };
    }

    /// Read back a pixel value
    pub fn get(&self, x: u32, y: u32) -> Spectrum {
        debug_assert!(x < self.width && y < self.height);
        let idx = (y as usize) * (self.width as usize) + x as usize;
        let p = self.pixels.read().unwrap()[idx];
        Spectrum::new(p.r, p.g, p.b)
    }

    /// Reset every pixel to black
    pub fn clear(&self) {
        let mut pixels = self.pixels.write().unwrap();
        pixels.fill(PixelRgb::zeroed());
    }

    /// Convert to 8-bit sRGB bytes (gamma 2.2, clamped)
    pub fn to_srgb8(&self) -> Vec<u8> {
        let pixels = self.pixels.read().unwrap();
        let raw: &[f32] = bytemuck::cast_slice(pixels.as_slice());
        raw.iter()
            .map(|&c| (c.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0 + 0.5) as u8)
            .collect()
    }

    /// Write the film to a PNG file
    pub fn save_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        let data = self.to_srgb8();
        let img = image::RgbImage::from_raw(self.width, self.height, data)
            .expect("film buffer has exactly width * height * 3 bytes");
        img.save(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_put_get_roundtrip() {
        let film = Film::new(4, 2);
        film.put(3, 1, Spectrum::new(0.1, 0.2, 0.3));
        let v = film.get(3, 1);
        assert_relative_eq!(v.x, 0.1);
        assert_relative_eq!(v.z, 0.3);
        assert_eq!(film.get(0, 0), Spectrum::zeros());
    }

    #[test]
    fn test_srgb8_has_expected_layout() {
        let film = Film::new(2, 1);
        film.put(0, 0, Spectrum::new(1.0, 0.0, 0.0));
        film.put(1, 0, Spectrum::new(0.0, 0.0, 2.0)); // clamped to 1.0

        let bytes = film.to_srgb8();
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes[5], 255);
    }

    #[test]
    fn test_clear_resets_pixels() {
        let film = Film::new(2, 2);
        film.put(1, 1, Spectrum::new(1.0, 1.0, 1.0));
        film.clear();
        assert_eq!(film.get(1, 1), Spectrum::zeros());
    }
}
