//! Preview size negotiation

use super::{PreviewSize, Resolution};
use crate::error::{Error, Result};

/// Long-side threshold used when none is configured
pub const DEFAULT_THRESHOLD: u32 = 720;

/// Pick the preview size to request from a device.
///
/// Candidates are ordered by width (then height) and the first one whose long
/// side is strictly above `threshold` wins. When every candidate fits within
/// the threshold the widest one is used instead. Zero-sized entries are
/// ignored; if nothing usable remains the result is
/// [`Error::NoSupportedSizes`].
pub fn select_preview_size(supported: &[Resolution], threshold: u32) -> Result<PreviewSize> {
    let mut sizes: Vec<Resolution> = supported
        .iter()
        .copied()
        .filter(|res| {
            if res.is_empty() {
                tracing::warn!(%res, "Ignoring zero-sized preview resolution");
                false
            } else {
                true
            }
        })
        .collect();

    sizes.sort_by_key(|res| (res.width, res.height));

    let chosen = sizes
        .iter()
        .find(|res| res.long_side() > threshold)
        .or_else(|| sizes.last())
        .copied()
        .ok_or(Error::NoSupportedSizes)?;

    tracing::debug!(
        candidates = sizes.len(),
        threshold,
        %chosen,
        "Selected preview size"
    );

    Ok(PreviewSize::from(chosen))
}
