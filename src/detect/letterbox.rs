//! Aspect-preserving resize plus constant padding to the model input size.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

use super::DetectError;
use crate::capture::Frame;
use crate::engine::ChannelOrder;

/// Grey level used for the padding border.
pub const PAD_VALUE: u8 = 114;

/// Geometry of one letterbox transform.
///
/// `pad_x`/`pad_y` are the fractional half-paddings used for the inverse
/// mapping; `left`/`top` are where the resized image actually lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub pad_x: f64,
    pub pad_y: f64,
    pub resized_width: u32,
    pub resized_height: u32,
    pub left: u32,
    pub top: u32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Letterbox {
    pub fn fit(frame_width: u32, frame_height: u32, input_width: u32, input_height: u32) -> Self {
        let (fw, fh) = (frame_width.max(1) as f64, frame_height.max(1) as f64);
        let (iw, ih) = (input_width as f64, input_height as f64);

        let scale = (ih / fh).min(iw / fw);
        let resized_width = ((fw * scale).round_ties_even() as u32).clamp(1, input_width.max(1));
        let resized_height = ((fh * scale).round_ties_even() as u32).clamp(1, input_height.max(1));

        let pad_x = (iw - resized_width as f64) / 2.0;
        let pad_y = (ih - resized_height as f64) / 2.0;

        Self {
            scale,
            pad_x,
            pad_y,
            resized_width,
            resized_height,
            left: (pad_x - 0.1).round().max(0.0) as u32,
            top: (pad_y - 0.1).round().max(0.0) as u32,
            input_width,
            input_height,
        }
    }

    /// Model-input coordinates to source-frame coordinates.
    pub fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }

    /// Source-frame coordinates to model-input coordinates.
    pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.pad_x, y * self.scale + self.pad_y)
    }

    /// Resize and pad `frame`, then lay it out as a `[1, 3, H, W]` tensor
    /// scaled to [0, 1].
    pub fn tensor(&self, frame: &Frame, order: ChannelOrder) -> Result<Array4<f32>, DetectError> {
        let canvas = self.apply(frame)?;

        let channels = match order {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        };
        let (w, h) = (self.input_width as usize, self.input_height as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, h, w));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for (c, &source) in channels.iter().enumerate() {
                tensor[[0, c, y as usize, x as usize]] = pixel[source] as f32 / 255.0;
            }
        }

        Ok(tensor)
    }

    /// The padded RGB image the model sees.
    pub fn apply(&self, frame: &Frame) -> Result<RgbImage, DetectError> {
        let malformed = || DetectError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        };
        if !frame.is_well_formed() {
            return Err(malformed());
        }
        let source = ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(
            frame.width,
            frame.height,
            frame.data.as_slice(),
        )
        .ok_or_else(malformed)?;

        let mut canvas =
            RgbImage::from_pixel(self.input_width, self.input_height, Rgb([PAD_VALUE; 3]));
        let (left, top) = (self.left as i64, self.top as i64);

        if (self.resized_width, self.resized_height) == (frame.width, frame.height) {
            imageops::replace(&mut canvas, &source, left, top);
        } else {
            let resized = imageops::resize(
                &source,
                self.resized_width,
                self.resized_height,
                FilterType::Triangle,
            );
            imageops::replace(&mut canvas, &resized, left, top);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_landscape_hd() {
        let lb = Letterbox::fit(1920, 1080, 640, 640);
        assert!((lb.scale - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!((lb.resized_width, lb.resized_height), (640, 360));
        assert_eq!((lb.pad_x, lb.pad_y), (0.0, 140.0));
        assert_eq!((lb.left, lb.top), (0, 140));
    }

    #[test]
    fn test_fit_portrait_fractional_pad() {
        let lb = Letterbox::fit(100, 201, 64, 64);
        let new_w = (100.0 * 64.0 / 201.0_f64).round() as u32;
        assert_eq!(lb.resized_height, 64);
        assert_eq!(lb.resized_width, new_w);
        assert_eq!(lb.pad_x, (64 - new_w) as f64 / 2.0);
        assert_eq!(lb.pad_y, 0.0);
        assert!(lb.left as f64 <= lb.pad_x);
        assert!(lb.left + lb.resized_width <= 64);
    }

    #[test]
    fn test_map_unmap_inverse() {
        let lb = Letterbox::fit(1280, 720, 640, 640);
        let (mx, my) = lb.map(1000.0, 500.0);
        let (x, y) = lb.unmap(mx, my);
        assert!((x - 1000.0).abs() < 1e-6);
        assert!((y - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_pads_with_grey() {
        let frame = Frame::rgb(vec![255; 8 * 4 * 3], 8, 4);
        let lb = Letterbox::fit(8, 4, 8, 8);
        let canvas = lb.apply(&frame).unwrap();
        assert_eq!(canvas.dimensions(), (8, 8));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([PAD_VALUE; 3]));
        assert_eq!(canvas.get_pixel(4, 4), &Rgb([255; 3]));
        assert_eq!(canvas.get_pixel(7, 7), &Rgb([PAD_VALUE; 3]));
    }

    #[test]
    fn test_tensor_layout_and_channel_order() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[255, 0, 51]);
        }
        let frame = Frame::rgb(data, 2, 2);
        let lb = Letterbox::fit(2, 2, 2, 2);

        let rgb = lb.tensor(&frame, ChannelOrder::Rgb).unwrap();
        assert_eq!(rgb.shape(), &[1, 3, 2, 2]);
        assert_eq!(rgb[[0, 0, 1, 1]], 1.0);
        assert_eq!(rgb[[0, 1, 1, 1]], 0.0);
        assert!((rgb[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);

        let bgr = lb.tensor(&frame, ChannelOrder::Bgr).unwrap();
        assert!((bgr[[0, 0, 0, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(bgr[[0, 2, 0, 0]], 1.0);
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let frame = Frame::rgb(vec![0; 10], 2, 2);
        let lb = Letterbox::fit(2, 2, 4, 4);
        assert!(matches!(
            lb.tensor(&frame, ChannelOrder::Rgb),
            Err(DetectError::MalformedFrame { len: 10, .. })
        ));
    }
}
