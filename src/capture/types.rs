//! Frame and source property types.

use std::time::{Duration, Instant};

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
}

/// A captured frame.
///
/// Immutable once produced; ownership moves from the source into the frame
/// queue, then into the detector and finally into the result record.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Wrap RGB bytes captured now.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    /// Get the number of bytes per pixel (3 for RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
        }
    }

    /// True if `data` holds exactly `width * height` pixels.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.width as usize * self.height as usize * self.bytes_per_pixel()
    }

    /// Geometric centre in integer pixel coordinates.
    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Mirror the frame horizontally (flip left-right).
    pub fn mirror_horizontal(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        let bpp = self.bytes_per_pixel();

        for y in 0..height {
            let row_start = y * width * bpp;
            let row = &mut self.data[row_start..row_start + width * bpp];

            for x in 0..width / 2 {
                let left = x * bpp;
                let right = (width - 1 - x) * bpp;
                for i in 0..bpp {
                    row.swap(left + i, right + i);
                }
            }
        }
    }

    /// Copy a `width`x`height` window at (`left`, `top`) out of a BGRA buffer
    /// whose rows are `stride` bytes apart, converting to RGB.
    pub fn from_bgra_region(
        bgra: &[u8],
        stride: usize,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let bottom = top.checked_add(height)?;
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);

        for y in top as usize..bottom as usize {
            let start = y * stride + left as usize * 4;
            let row = bgra.get(start..start + width as usize * 4)?;
            for px in row.chunks_exact(4) {
                data.extend_from_slice(&[px[2], px[1], px[0]]);
            }
        }

        Some(Self::rgb(data, width, height))
    }
}

/// True when the non-empty `[left, top, width, height]` window lies inside a
/// `screen_width`x`screen_height` screen.
pub fn region_fits(region: [u32; 4], screen_width: u32, screen_height: u32) -> bool {
    let [left, top, width, height] = region;
    width > 0
        && height > 0
        && left.checked_add(width).is_some_and(|right| right <= screen_width)
        && top.checked_add(height).is_some_and(|bottom| bottom <= screen_height)
}

/// Properties a source reports once it is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceProperties {
    pub width: u32,
    pub height: u32,
    /// Frames per second the device advertises (0 when unknown)
    pub nominal_fps: f64,
}

impl SourceProperties {
    /// Target time between frames, if the source advertises a rate.
    pub fn frame_interval(&self) -> Option<Duration> {
        if self.nominal_fps.is_finite() && self.nominal_fps >= 1.0 {
            Some(Duration::from_secs_f64(1.0 / self.nominal_fps))
        } else {
            None
        }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bytes_per_pixel() {
        let frame = Frame::rgb(vec![0; 6], 2, 1);
        assert_eq!(frame.bytes_per_pixel(), 3);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_frame_malformed() {
        let frame = Frame::rgb(vec![0; 5], 2, 1);
        assert!(!frame.is_well_formed());
        let empty = Frame::rgb(Vec::new(), 0, 0);
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_frame_center() {
        let frame = Frame::rgb(vec![0; 1920 * 1080 * 3], 1920, 1080);
        assert_eq!(frame.center(), (960, 540));
        let odd = Frame::rgb(vec![0; 5 * 3 * 3], 5, 3);
        assert_eq!(odd.center(), (2, 1));
    }

    #[test]
    fn test_mirror_horizontal_2x1() {
        let mut frame = Frame::rgb(vec![1, 2, 3, 4, 5, 6], 2, 1);
        frame.mirror_horizontal();
        assert_eq!(frame.data, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_odd_width_keeps_middle() {
        let mut frame = Frame::rgb(vec![1, 1, 1, 2, 2, 2, 3, 3, 3], 3, 1);
        frame.mirror_horizontal();
        assert_eq!(frame.data, vec![3, 3, 3, 2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_from_bgra_region_crops_and_swaps() {
        // 2x2 BGRA image, stride padded to 12 bytes
        let bgra = vec![
            10, 20, 30, 255, 11, 21, 31, 255, 0, 0, 0, 0, //
            12, 22, 32, 255, 13, 23, 33, 255, 0, 0, 0, 0,
        ];
        let frame = Frame::from_bgra_region(&bgra, 12, 1, 1, 1, 1).unwrap();
        assert_eq!(frame.width, 1);
        assert_eq!(frame.data, vec![33, 23, 13]);

        let full = Frame::from_bgra_region(&bgra, 12, 0, 0, 2, 2).unwrap();
        assert_eq!(full.data.len(), 12);
        assert_eq!(&full.data[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_from_bgra_region_out_of_bounds() {
        let bgra = vec![0u8; 16];
        assert!(Frame::from_bgra_region(&bgra, 8, 0, 0, 2, 3).is_none());
    }

    #[test]
    fn test_region_fits() {
        assert!(region_fits([0, 0, 1920, 1080], 1920, 1080));
        assert!(region_fits([100, 50, 800, 600], 1920, 1080));
        assert!(!region_fits([100, 50, 0, 600], 1920, 1080));
        assert!(!region_fits([1200, 0, 800, 600], 1920, 1080));
        assert!(!region_fits([0, 500, 800, 600], 1920, 1080));
    }

    #[test]
    fn test_region_fits_rejects_overflowing_edges() {
        assert!(!region_fits([u32::MAX, 0, 2, 10], 1920, 1080));
        assert!(!region_fits([0, 4_000_000_000, 10, 400_000_000], 1920, 1080));
        assert!(Frame::from_bgra_region(&[0u8; 16], 8, 0, u32::MAX, 1, 2).is_none());
    }

    #[test]
    fn test_frame_interval() {
        let props = SourceProperties {
            width: 640,
            height: 480,
            nominal_fps: 50.0,
        };
        assert_eq!(props.frame_interval(), Some(Duration::from_millis(20)));
        let unknown = SourceProperties {
            nominal_fps: 0.0,
            ..props
        };
        assert_eq!(unknown.frame_interval(), None);
    }
}
