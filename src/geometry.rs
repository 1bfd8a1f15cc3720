use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ratio slug that means "serve the full frame, no cropping".
pub const ORIGINAL_RATIO: &str = "original";

/// A crop aspect ratio, parsed from a `WxH` slug or the `original` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ratio {
    Original,
    Aspect { w: u32, h: u32 },
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Original => write!(f, "{}", ORIGINAL_RATIO),
            Ratio::Aspect { w, h } => write!(f, "{}x{}", w, h),
        }
    }
}

pub struct ParseRatioError {
    pub msg: String,
}

impl FromStr for Ratio {
    type Err = ParseRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ORIGINAL_RATIO {
            return Ok(Ratio::Original);
        }
        let err = || ParseRatioError {
            msg: format!("Expected ratio \"WxH\", got {}", s),
        };
        let (w, h) = s.split_once('x').ok_or_else(err)?;
        let w: u32 = w.parse().map_err(|_| err())?;
        let h: u32 = h.parse().map_err(|_| err())?;
        if w == 0 || h == 0 {
            return Err(err());
        }
        Ok(Ratio::Aspect { w, h })
    }
}

/// Selection rectangle in source-image pixel coordinates.
///
/// A constructed `Rect` is not necessarily valid for a particular image;
/// [`Rect::fits_within`] is the invariant check (`0 <= x0 < x1 <= width`,
/// `0 <= y0 < y1 <= height`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn full(width: u32, height: u32) -> Self {
        Rect {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    /// Build a rect from raw (possibly negative) client integers, validating
    /// against the image bounds. Returns `None` for any invariant violation.
    pub fn checked(x0: i64, y0: i64, x1: i64, y1: i64, width: u32, height: u32) -> Option<Self> {
        if x0 < 0 || y0 < 0 || x1 < 0 || y1 < 0 {
            return None;
        }
        let rect = Rect {
            x0: u32::try_from(x0).ok()?,
            y0: u32::try_from(y0).ok()?,
            x1: u32::try_from(x1).ok()?,
            y1: u32::try_from(y1).ok()?,
        };
        rect.fits_within(width, height).then_some(rect)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1 && self.x1 <= width && self.y1 <= height
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Crop region plus the output dimensions it scales to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub source: Rect,
    pub out_width: u32,
    pub out_height: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GeometryError {
    UnknownRatio,
}

/// Check a slug against the configured allow-list. `original` is always
/// accepted; aspect slugs must parse and be configured.
pub fn parse_allowed_ratio(allowed: &[Ratio], slug: &str) -> Result<Ratio, GeometryError> {
    let ratio = Ratio::from_str(slug).map_err(|_| GeometryError::UnknownRatio)?;
    match ratio {
        Ratio::Original => Ok(ratio),
        Ratio::Aspect { .. } => {
            if allowed.contains(&ratio) {
                Ok(ratio)
            } else {
                Err(GeometryError::UnknownRatio)
            }
        }
    }
}

/// Largest centered rectangle of aspect `w:h` inside a `width`x`height` frame.
///
/// Integer bounds, never exceeding the frame, never zero area. When the
/// centering margin is odd, the extra pixel of margin goes to the leading
/// edge.
fn default_selection(width: u32, height: u32, w: u32, h: u32) -> Rect {
    let (rect_w, rect_h) = if (width as u64) * (h as u64) <= (height as u64) * (w as u64) {
        // Width-limited: span the full width, derive the height.
        let rect_h = round_div((width as u64) * (h as u64), w as u64);
        (width, (rect_h as u32).clamp(1, height))
    } else {
        let rect_w = round_div((height as u64) * (w as u64), h as u64);
        ((rect_w as u32).clamp(1, width), height)
    };

    let x0 = (width - rect_w).div_ceil(2);
    let y0 = (height - rect_h).div_ceil(2);
    Rect {
        x0,
        y0,
        x1: x0 + rect_w,
        y1: y0 + rect_h,
    }
}

fn round_div(num: u64, den: u64) -> u64 {
    (num + den / 2) / den
}

/// Resolve the selection rectangle for an image at a given ratio.
///
/// `original` always maps to the full frame. An override is used only if it
/// satisfies the rectangle invariants for this image; anything else falls
/// back to the computed default. The allow-list is re-checked here even
/// though callers validate first.
pub fn resolve_rectangle(
    allowed: &[Ratio],
    width: u32,
    height: u32,
    ratio: &Ratio,
    override_selection: Option<Rect>,
) -> Result<Rect, GeometryError> {
    match *ratio {
        Ratio::Original => Ok(Rect::full(width, height)),
        Ratio::Aspect { w, h } => {
            if !allowed.contains(ratio) {
                return Err(GeometryError::UnknownRatio);
            }
            if let Some(rect) = override_selection {
                if rect.fits_within(width, height) {
                    return Ok(rect);
                }
            }
            Ok(default_selection(width, height, w, h))
        }
    }
}

/// Scale a selection to a target output width, preserving its aspect.
///
/// `out_height = round(target_width * rect_height / rect_width)`, floored at
/// one pixel. A target width larger than the selection upscales; serving is
/// deliberately agnostic about scale direction.
pub fn compute_crop_box(rect: Rect, target_width: u32) -> CropPlan {
    let out_height = round_div(
        (target_width as u64) * (rect.height() as u64),
        rect.width() as u64,
    )
    .max(1) as u32;
    CropPlan {
        source: rect,
        out_width: target_width,
        out_height,
    }
}
