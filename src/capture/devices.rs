//! Camera discovery for the `devices` subcommand.

use super::errors::CaptureError;

/// A camera nokhwa can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    /// Resolution the camera opened with; `None` if it could not be opened
    pub resolution: Option<(u32, u32)>,
}

/// Human-readable listing, one camera per line.
pub fn format_camera_list(cameras: &[CameraInfo]) -> String {
    if cameras.is_empty() {
        return "No camera devices found.\n".to_string();
    }

    let mut out = String::from("Available cameras:\n");
    for camera in cameras {
        let resolution = match camera.resolution {
            Some((w, h)) => format!("{w}x{h}"),
            None => "unavailable (in use or no permission)".to_string(),
        };
        out.push_str(&format!(
            "  [{}] {} - {}\n",
            camera.index, camera.name, resolution
        ));
    }
    let indices: Vec<String> = cameras.iter().map(|c| c.index.to_string()).collect();
    out.push_str(&format!(
        "Use one of [{}] as capture.device_index\n",
        indices.join(", ")
    ));
    out
}

/// Query every camera and the resolution it opens with.
#[cfg(feature = "webcam")]
pub fn list_cameras() -> Result<Vec<CameraInfo>, CaptureError> {
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{ApiBackend, RequestedFormat, RequestedFormatType};
    use nokhwa::Camera;

    let devices =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::QueryFailed(e.to_string()))?;

    let cameras = devices
        .iter()
        .enumerate()
        .map(|(position, info)| {
            let index = info.index().as_index().unwrap_or(position as u32);
            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let resolution = match Camera::new(info.index().clone(), requested) {
                Ok(camera) => {
                    let res = camera.resolution();
                    Some((res.width(), res.height()))
                }
                Err(e) => {
                    log::debug!("Could not open camera {index}: {e}");
                    None
                }
            };
            CameraInfo {
                index,
                name: info.human_name(),
                resolution,
            }
        })
        .collect();
    Ok(cameras)
}

#[cfg(not(feature = "webcam"))]
pub fn list_cameras() -> Result<Vec<CameraInfo>, CaptureError> {
    Err(CaptureError::BackendUnavailable {
        kind: "webcam",
        feature: "webcam",
    })
}
