//! UVC webcam and capture-card frames through nokhwa.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;

use super::errors::CaptureError;
use super::types::{Frame, SourceProperties};
use super::FrameDevice;

#[derive(Debug, Clone)]
pub struct WebcamSettings {
    /// Camera device index
    pub device_index: u32,
    /// Requested resolution (width, height); the camera picks the closest
    pub resolution: Option<[u32; 2]>,
    /// Requested frame rate
    pub fps: Option<u32>,
    /// Mirror horizontally
    pub mirror: bool,
}

pub struct WebcamDevice {
    camera: Camera,
    mirror: bool,
}

impl FrameDevice for WebcamDevice {
    type Settings = WebcamSettings;
    const NAME: &'static str = "webcam";

    fn open(settings: &WebcamSettings) -> Result<(Self, SourceProperties), CaptureError> {
        log::info!(
            "Initializing webcam/UVC device index: {}",
            settings.device_index
        );
        let index = CameraIndex::Index(settings.device_index);
        let mut camera = open_camera_with_fallback(&index, settings)?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        let res = camera.resolution();
        let properties = SourceProperties {
            width: res.width(),
            height: res.height(),
            nominal_fps: camera.frame_rate() as f64,
        };

        Ok((
            WebcamDevice {
                camera,
                mirror: settings.mirror,
            },
            properties,
        ))
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::GrabFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::GrabFailed(e.to_string()))?;
        let resolution = buffer.resolution();

        let mut frame = Frame::rgb(decoded.into_raw(), resolution.width(), resolution.height());
        if self.mirror {
            frame.mirror_horizontal();
        }
        Ok(Some(frame))
    }

    fn close(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

/// Try the requested format as MJPEG, then NV12, then whatever the camera offers.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &WebcamSettings,
) -> Result<Camera, CaptureError> {
    let mut format_attempts = Vec::new();

    if let Some([width, height]) = settings.resolution {
        let fps = settings.fps.unwrap_or(30);
        for frame_format in [NokhwaFrameFormat::MJPEG, NokhwaFrameFormat::NV12] {
            format_attempts.push(RequestedFormat::new::<RgbFormat>(
                RequestedFormatType::Closest(CameraFormat::new(
                    nokhwa::utils::Resolution::new(width, height),
                    frame_format,
                    fps,
                )),
            ));
        }
    }
    format_attempts.push(RequestedFormat::new::<RgbFormat>(
        RequestedFormatType::AbsoluteHighestFrameRate,
    ));

    let mut last_error = None;
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = Some(e),
        }
    }

    Err(CaptureError::OpenFailed(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no usable camera format".to_string()),
    ))
}
