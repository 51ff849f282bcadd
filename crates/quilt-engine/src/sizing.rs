//! Draft input sizing.
//!
//! Pure geometry: given the natural height of the draft content and the
//! viewport metrics, compute the height of the input surface, whether it
//! scrolls internally, and whether the size change should animate. Units
//! are device-independent pixels; the front end maps them to whatever it
//! renders with.

/// Minimum input height.
pub const MIN_HEIGHT: f32 = 55.0;

/// The input may grow to `viewport_height / MAX_VIEWPORT_DIVISOR` before
/// it clamps and scrolls internally.
pub const MAX_VIEWPORT_DIVISOR: f32 = 2.5;

/// Viewport metrics the computation depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Height of the whole viewport.
    pub viewport_height: f32,
    /// Height of one text line.
    pub line_height: f32,
}

/// Computed size and mode for the input surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSize {
    /// Target height.
    pub height: f32,
    /// Content is taller than the clamp: scroll internally.
    pub scroll: bool,
    /// Animate the size change (only when growing into the clamp).
    pub animate: bool,
}

/// Compute the input size for the current draft.
///
/// `natural_height` is the height the content would need to display with
/// no scrolling; `None` means the surface is detached or unmeasurable, in
/// which case the caller keeps its previous size.
///
/// Below the clamp, the excess over [`MIN_HEIGHT`] rounds up to the next
/// `line_height` multiple so the last line is never partially visible; an
/// empty draft therefore sits exactly at the minimum. At or past the
/// clamp the height is exactly `viewport_height / 2.5`.
///
/// The computation is deterministic: identical inputs yield identical
/// output.
pub fn compute_input_size(
    natural_height: Option<f32>,
    metrics: ViewportMetrics,
) -> Option<InputSize> {
    let natural = natural_height?;
    let max_height = metrics.viewport_height / MAX_VIEWPORT_DIVISOR;
    let target = natural.max(MIN_HEIGHT);

    if target > max_height {
        return Some(InputSize {
            height: max_height,
            scroll: true,
            animate: true,
        });
    }

    let height = if metrics.line_height > 0.0 {
        MIN_HEIGHT + ((target - MIN_HEIGHT) / metrics.line_height).ceil() * metrics.line_height
    } else {
        target
    };

    Some(InputSize {
        height,
        scroll: false,
        animate: false,
    })
}
