//! Fitting the preview into its view

use super::{PixelFormat, PreviewSize, Resolution, ViewSize};
use serde::{Deserialize, Serialize};

/// Scale about a pivot point, applied to the preview surface.
///
/// Computed fresh for every preview start; nothing holds on to a previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Horizontal scale factor
    pub scale_x: f32,
    /// Vertical scale factor
    pub scale_y: f32,
    /// Pivot x coordinate in surface pixels
    pub pivot_x: f32,
    /// Pivot y coordinate in surface pixels
    pub pivot_y: f32,
}

impl ViewTransform {
    /// No scaling
    pub const IDENTITY: ViewTransform = ViewTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        pivot_x: 0.0,
        pivot_y: 0.0,
    };

    /// Map a surface point through the transform
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.pivot_x + (x - self.pivot_x) * self.scale_x,
            self.pivot_y + (y - self.pivot_y) * self.scale_y,
        )
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Largest portrait box with the preview's aspect ratio that fits in `view`.
///
/// The preview is shown rotated into portrait, so its short side runs
/// horizontally. One dimension of the result always matches the view.
pub fn fit_view(preview: PreviewSize, view: ViewSize) -> ViewSize {
    if view.width == 0 || view.height == 0 || preview.long_side == 0 {
        return view;
    }

    let ratio = f64::from(preview.short_side) / f64::from(preview.long_side);
    let view_ratio = f64::from(view.width) / f64::from(view.height);

    if ratio > view_ratio {
        ViewSize::new(view.width, (f64::from(view.width) / ratio) as u32)
    } else {
        ViewSize::new((f64::from(view.height) * ratio) as u32, view.height)
    }
}

/// Transform that stretches a surface still sized for `original` to `layout`.
///
/// The surface buffer is portrait, so the original's height maps onto the
/// layout width and its width onto the layout height.
pub fn preview_transform(layout: ViewSize, original: Resolution) -> ViewTransform {
    if original.is_empty() {
        return ViewTransform::IDENTITY;
    }

    ViewTransform {
        scale_x: layout.width as f32 / original.height as f32,
        scale_y: layout.height as f32 / original.width as f32,
        pivot_x: (original.height / 2) as f32,
        pivot_y: (original.width / 2) as f32,
    }
}

/// Bytes needed to hold one frame of `size` in `format`
pub fn frame_buffer_len(size: Resolution, format: PixelFormat) -> usize {
    let bits = size.area() * u64::from(format.bits_per_pixel());
    bits.div_ceil(8) as usize
}
