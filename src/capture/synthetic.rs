//! Generated test pattern: a bright square sweeping across a grey field.

use super::errors::CaptureError;
use super::types::{Frame, SourceProperties};
use super::FrameDevice;

const BACKGROUND: u8 = 64;
const SQUARE: [u8; 3] = [230, 40, 40];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

pub struct SyntheticDevice {
    settings: SyntheticSettings,
    tick: u64,
}

impl SyntheticDevice {
    /// Side of the square, a quarter of the shorter frame edge.
    fn square_size(&self) -> u32 {
        (self.settings.width.min(self.settings.height) / 4).max(1)
    }

    /// Top-left corner of the square for the current tick.
    pub fn square_origin(&self) -> (u32, u32) {
        let size = self.square_size();
        let span_x = self.settings.width.saturating_sub(size).max(1) as u64;
        let x = (self.tick * 4 % span_x) as u32;
        let y = self.settings.height.saturating_sub(size) / 2;
        (x, y)
    }

    fn render(&self) -> Frame {
        let SyntheticSettings { width, height, .. } = self.settings;
        let mut data = vec![BACKGROUND; width as usize * height as usize * 3];

        let size = self.square_size();
        let (x0, y0) = self.square_origin();
        for y in y0..(y0 + size).min(height) {
            for x in x0..(x0 + size).min(width) {
                let i = (y as usize * width as usize + x as usize) * 3;
                data[i..i + 3].copy_from_slice(&SQUARE);
            }
        }

        Frame::rgb(data, width, height)
    }
}

impl FrameDevice for SyntheticDevice {
    type Settings = SyntheticSettings;
    const NAME: &'static str = "synthetic";

    fn open(settings: &SyntheticSettings) -> Result<(Self, SourceProperties), CaptureError> {
        let properties = SourceProperties {
            width: settings.width,
            height: settings.height,
            nominal_fps: settings.fps as f64,
        };
        Ok((
            SyntheticDevice {
                settings: *settings,
                tick: 0,
            },
            properties,
        ))
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let frame = self.render();
        self.tick += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {}
}
