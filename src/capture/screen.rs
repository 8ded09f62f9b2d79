//! Monitor and screen-region frames through scrap.

use std::io::ErrorKind;

use super::errors::CaptureError;
use super::types::{region_fits, Frame, SourceProperties};
use super::FrameDevice;

/// scrap does not report a refresh rate.
const ASSUMED_FPS: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct ScreenSettings {
    /// Monitor number, 1-based
    pub monitor: usize,
    /// Optional [left, top, width, height] relative to the monitor
    pub region: Option<[u32; 4]>,
}

pub struct ScreenDevice {
    capturer: scrap::Capturer,
    region: [u32; 4],
}

impl FrameDevice for ScreenDevice {
    type Settings = ScreenSettings;
    const NAME: &'static str = "screen";

    fn open(settings: &ScreenSettings) -> Result<(Self, SourceProperties), CaptureError> {
        let displays = scrap::Display::all().map_err(|e| CaptureError::OpenFailed(e.to_string()))?;
        let available = displays.len();

        if settings.monitor < 1 || settings.monitor > available {
            return Err(CaptureError::MonitorNotFound {
                requested: settings.monitor,
                available,
            });
        }

        let display = displays
            .into_iter()
            .nth(settings.monitor - 1)
            .ok_or(CaptureError::MonitorNotFound {
                requested: settings.monitor,
                available,
            })?;
        let capturer =
            scrap::Capturer::new(display).map_err(|e| CaptureError::OpenFailed(e.to_string()))?;
        let (width, height) = (capturer.width() as u32, capturer.height() as u32);

        let region = match settings.region {
            Some(region) => {
                if !region_fits(region, width, height) {
                    return Err(CaptureError::RegionOutOfBounds {
                        region,
                        width,
                        height,
                    });
                }
                log::info!("Capturing region {:?} on monitor {}", region, settings.monitor);
                region
            }
            None => {
                log::info!(
                    "Capturing full monitor {}: {}x{}",
                    settings.monitor,
                    width,
                    height
                );
                [0, 0, width, height]
            }
        };

        let properties = SourceProperties {
            width: region[2],
            height: region[3],
            nominal_fps: ASSUMED_FPS,
        };
        Ok((ScreenDevice { capturer, region }, properties))
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let screen_height = self.capturer.height();
        let [left, top, width, height] = self.region;

        match self.capturer.frame() {
            Ok(buffer) => {
                let stride = buffer.len() / screen_height.max(1);
                Frame::from_bgra_region(&buffer, stride, left, top, width, height)
                    .map(Some)
                    .ok_or_else(|| {
                        CaptureError::GrabFailed("screen buffer smaller than expected".to_string())
                    })
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(CaptureError::GrabFailed(e.to_string())),
        }
    }

    fn close(&mut self) {}
}
