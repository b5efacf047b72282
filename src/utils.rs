use crate::CaptureError;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Image encodings the capture can be written in.
///
/// The browser always hands back PNG; other formats are re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Infer the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("jpg") | Some("jpeg") => Ok(OutputFormat::Jpeg),
            Some(other) => Err(CaptureError::UnsupportedOutputFormat(format!(
                "{} (extension .{other})",
                path.display()
            ))),
            None => Err(CaptureError::UnsupportedOutputFormat(format!(
                "{} (no extension)",
                path.display()
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Re-encode PNG bytes from the browser into this format.
    pub fn encode(&self, png_data: Vec<u8>) -> Result<Vec<u8>, CaptureError> {
        match self {
            OutputFormat::Png => Ok(png_data),
            OutputFormat::Jpeg => {
                let img = image::load_from_memory(&png_data)?;
                // JPEG has no alpha channel
                let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());

                let mut jpeg_data = Vec::new();
                rgb.write_to(
                    &mut std::io::Cursor::new(&mut jpeg_data),
                    image::ImageFormat::Jpeg,
                )?;

                Ok(jpeg_data)
            }
        }
    }
}

/// Width and height of an encoded image, failing if it does not decode.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32), CaptureError> {
    let img = image::load_from_memory(data)?;
    Ok((img.width(), img.height()))
}

/// Write `data` to `path`, creating missing parent directories and replacing
/// any existing file.
pub async fn write_output(path: &Path, data: &[u8]) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(path, data).await?;
    Ok(())
}

/// Human readable duration. Sub-second values in milliseconds, up to a minute
/// in seconds with two decimals, beyond that as minutes and seconds.
pub fn format_duration(duration: Duration) -> String {
    match duration.as_millis() {
        millis @ 0..=999 => format!("{millis}ms"),
        1_000..=59_999 => format!("{:.2}s", duration.as_secs_f64()),
        _ => {
            let secs = duration.as_secs();
            format!("{}m {:02}s", secs / 60, secs % 60)
        }
    }
}

/// Human readable size in binary units, capped at MiB.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * KIB;

    let size = bytes as f64;
    if size < KIB {
        format!("{bytes} B")
    } else if size < MIB {
        format!("{:.1} KiB", size / KIB)
    } else {
        format!("{:.1} MiB", size / MIB)
    }
}
