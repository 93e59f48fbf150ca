use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("Failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Resize task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Resize from {from:?} to {to:?} exceeds {MAX_RESIZE_PIXELS} pixels")]
    TooLarge { from: (u32, u32), to: (u32, u32) },
}

/// Largest output a resize may produce. Extreme aspect ratios would otherwise
/// upscale into buffers of many gigabytes.
pub const MAX_RESIZE_PIXELS: u64 = 40_000_000;

/// How an image is brought to the food provider's size requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Upscale (aspect preserved) until the longer side is at least
    /// `long_edge` and the shorter side at least `short_edge`. Landscape images
    /// put the long edge on the width; portrait and square on the height.
    Minimum { long_edge: u32, short_edge: u32 },
    /// Stretch to exactly `edge` × `edge`.
    Square { edge: u32 },
    Off,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        ResizePolicy::Minimum { long_edge: 1080, short_edge: 720 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Unchanged,
    Resized { from: (u32, u32), to: (u32, u32) },
}

/// Output dimensions for a `width` × `height` image, or `None` when the image
/// already satisfies the policy.
pub fn target_size(width: u32, height: u32, policy: ResizePolicy) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    match policy {
        ResizePolicy::Off => None,
        ResizePolicy::Square { edge } => (width != edge || height != edge).then_some((edge, edge)),
        ResizePolicy::Minimum { long_edge, short_edge } => {
            let landscape = width > height;
            let (min_w, min_h) =
                if landscape { (long_edge, short_edge) } else { (short_edge, long_edge) };
            if width >= min_w && height >= min_h {
                return None;
            }

            let ratio = f64::from(width) / f64::from(height);
            let (mut w, mut h);
            if landscape {
                h = height.max(min_h);
                w = (f64::from(h) * ratio).round() as u32;
                if w < min_w {
                    w = min_w;
                    h = (f64::from(w) / ratio).round() as u32;
                }
            } else {
                w = width.max(min_w);
                h = (f64::from(w) / ratio).round() as u32;
                if h < min_h {
                    h = min_h;
                    w = (f64::from(h) * ratio).round() as u32;
                }
            }
            Some((w.max(1), h.max(1)))
        }
    }
}

/// Resize encoded image bytes. The output keeps the input's format (JPEG when
/// the format cannot be identified). Returns `None` when no resize was needed.
pub fn resize_bytes(
    data: &[u8],
    policy: ResizePolicy,
) -> Result<Option<(Vec<u8>, ResizeOutcome)>, ResizeError> {
    let format = image::guess_format(data).unwrap_or(ImageFormat::Jpeg);
    let img = image::load_from_memory_with_format(data, format)?;
    resize_and_encode(img, format, policy)
}

/// Resize the image at `path` in place.
///
/// The new image is written to `temp_<name>` beside the original and renamed
/// over it, so readers see either the old or the new file, never a partial
/// one. On failure the original is left untouched.
pub async fn resize_in_place(path: &Path, policy: ResizePolicy) -> Result<ResizeOutcome, ResizeError> {
    if policy == ResizePolicy::Off {
        return Ok(ResizeOutcome::Unchanged);
    }

    let source = path.to_path_buf();
    let encoded = tokio::task::spawn_blocking(move || -> Result<_, ResizeError> {
        let reader = ImageReader::open(&source)?.with_guessed_format()?;
        let format = reader
            .format()
            .or_else(|| ImageFormat::from_path(&source).ok())
            .unwrap_or(ImageFormat::Jpeg);
        let img = reader.decode()?;
        resize_and_encode(img, format, policy)
    })
    .await??;

    let Some((bytes, outcome)) = encoded else {
        tracing::debug!(path = %path.display(), "Image already meets size requirements");
        return Ok(ResizeOutcome::Unchanged);
    };

    let temp = temp_path(path);
    if let Err(e) = write_then_rename(&temp, path, &bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }

    if let ResizeOutcome::Resized { from, to } = outcome {
        tracing::info!(
            path = %path.display(),
            from = ?from,
            to = ?to,
            "Resized image"
        );
    }
    Ok(outcome)
}

fn resize_and_encode(
    img: DynamicImage,
    format: ImageFormat,
    policy: ResizePolicy,
) -> Result<Option<(Vec<u8>, ResizeOutcome)>, ResizeError> {
    let from = (img.width(), img.height());
    let Some(to) = target_size(from.0, from.1, policy) else {
        return Ok(None);
    };
    if u64::from(to.0) * u64::from(to.1) > MAX_RESIZE_PIXELS {
        return Err(ResizeError::TooLarge { from, to });
    }
    let resized = img.resize_exact(to.0, to.1, FilterType::Lanczos3);
    let mut buf = Vec::new();
    resized.write_to(&mut Cursor::new(&mut buf), format)?;
    Ok(Some((buf, ResizeOutcome::Resized { from, to })))
}

pub(crate) async fn write_then_rename(temp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(temp, bytes).await?;
    tokio::fs::rename(temp, dest).await
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    path.with_file_name(format!("temp_{name}"))
}
