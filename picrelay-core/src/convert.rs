//! Format converter: decode the fetched artifact as an image and
//! re-encode it under the requested target format.
//!
//! Ownership transfer happens here: the source artifact is consumed and
//! released on both success and failure, so no original ever survives a
//! failed conversion.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::artifact::TempArtifact;
use crate::error::ConvertError;
use crate::trigger::TargetFormat;

/// Convert the source artifact into `dest_dir/<dest_stem>.<target ext>`.
/// The on-disk format is guessed from content, not the extension: the
/// keyword may have matched while the attachment is something else
/// entirely, which is exactly the [`ConvertError::Decode`] case.
pub fn convert(
    mut source: TempArtifact,
    dest_dir: &Path,
    dest_stem: &str,
    target: TargetFormat,
) -> Result<TempArtifact, ConvertError> {
    let dest_path = dest_dir.join(format!("{dest_stem}.{}", target.extension()));
    let result = decode_and_encode(source.path(), &dest_path, target);

    // Same-extension conversion re-encodes onto the source's own path: the
    // output *is* that file now, so ownership transfers instead of a
    // release that would destroy the result.
    if dest_path.as_path() == source.path() {
        return match result {
            Ok(()) => {
                source.disarm();
                Ok(TempArtifact::adopt(dest_path))
            }
            Err(e) => {
                if let Err(c) = source.release() {
                    tracing::warn!(error = %c, "cleanup of conversion source failed");
                }
                Err(e)
            }
        };
    }

    if let Err(e) = source.release() {
        tracing::warn!(error = %e, "cleanup of conversion source failed");
    }
    result.map(|()| TempArtifact::adopt(dest_path))
}

fn decode_and_encode(
    source: &Path,
    dest: &Path,
    target: TargetFormat,
) -> Result<(), ConvertError> {
    let Some(format) = target.image_format() else {
        return Err(ConvertError::UnsupportedTarget(target));
    };

    let image = ImageReader::open(source)
        .map_err(|e| ConvertError::Decode(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| ConvertError::Decode(image::ImageError::IoError(e)))?
        .decode()
        .map_err(ConvertError::Decode)?;

    // JPEG has no alpha channel; flatten before encoding.
    let image = if format == ImageFormat::Jpeg && image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    if let Err(e) = image.save_with_format(dest, format) {
        if let Err(rm) = std::fs::remove_file(dest) {
            if rm.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    error = ?rm,
                    path = %dest.display(),
                    "could not remove partial conversion output"
                );
            }
        }
        return Err(ConvertError::Encode(e));
    }
    tracing::debug!(
        source = %source.display(),
        dest = %dest.display(),
        "conversion written"
    );
    Ok(())
}
