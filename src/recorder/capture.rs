use image::RgbaImage;
use std::{fmt, io};

#[derive(Debug)]
pub enum CaptureError {
    NoActiveWindow,
    /// The UI thread hung up before the capture task completed.
    Disconnected,
    Failed(String),
    Image(image::ImageError),
    Io(io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoActiveWindow => write!(formatter, "no active window to capture"),
            CaptureError::Disconnected => write!(formatter, "ui thread is no longer running"),
            CaptureError::Failed(msg) => write!(formatter, "capture failed: {msg}"),
            CaptureError::Image(error) => write!(formatter, "image error: {error}"),
            CaptureError::Io(error) => write!(formatter, "io error: {error}"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<io::Error> for CaptureError {
    fn from(error: io::Error) -> Self {
        CaptureError::Io(error)
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(error: image::ImageError) -> Self {
        CaptureError::Image(error)
    }
}

/// Reads back the rendered contents of the frontmost window.
pub trait ScreenCapture {
    fn capture(&self) -> Result<RgbaImage, CaptureError>;
}

impl<F> ScreenCapture for F
where
    F: Fn() -> Result<RgbaImage, CaptureError>,
{
    fn capture(&self) -> Result<RgbaImage, CaptureError> {
        self()
    }
}

/// Capture and write a PNG in one go.
pub fn capture_to_file(
    source: &dyn ScreenCapture,
    output: &std::path::Path,
) -> Result<RgbaImage, CaptureError> {
    let image = source.capture()?;
    image.save_with_format(output, image::ImageFormat::Png)?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn capture_to_file_writes_png() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("screenshot.png");
        let source = || -> Result<RgbaImage, CaptureError> {
            Ok(RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255])))
        };

        let image = capture_to_file(&source, &output).expect("capture");

        assert_eq!(image.dimensions(), (4, 3));
        let reread = image::open(&output).expect("reopen").to_rgba8();
        assert_eq!(reread, image);
    }

    #[test]
    fn capture_errors_propagate_without_writing() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("screenshot.png");
        let source = || -> Result<RgbaImage, CaptureError> { Err(CaptureError::NoActiveWindow) };

        assert!(matches!(
            capture_to_file(&source, &output),
            Err(CaptureError::NoActiveWindow)
        ));
        assert!(!output.exists());
    }
}
