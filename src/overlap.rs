//! Pairwise overlap between slices.
//!
//! Two questions are answered by the same functor, selected by the caller:
//!
//! - **Normalized**: are these the same object seen at two hierarchy levels?
//!   `|A ∩ B| / (|A| + |B| − |A ∩ B|)`, in `[0, 1]`.
//! - **Raw**: do these candidates compete for pixels? `|A ∩ B|`; any positive
//!   value is a conflict.
//!
//! With `align` set, the second region is first translated so that its
//! rounded center coincides with the first region's center.

use serde::{Deserialize, Serialize};

use crate::types::{Region, Slice};

/// Which quantity an [`Overlap`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlapMode {
    /// Intersection over union.
    Normalized,
    /// Intersection size in pixels.
    Raw,
}

/// Stateless overlap functor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    /// Reported quantity.
    pub mode: OverlapMode,
    /// Center-align the second region before measuring.
    pub align: bool,
}

impl Overlap {
    /// Intersection over union, unaligned.
    pub fn normalized() -> Self {
        Self {
            mode: OverlapMode::Normalized,
            align: false,
        }
    }

    /// Intersection size, unaligned.
    pub fn raw() -> Self {
        Self {
            mode: OverlapMode::Raw,
            align: false,
        }
    }

    /// Same mode, with center alignment.
    pub fn aligned(self) -> Self {
        Self { align: true, ..self }
    }

    /// Measure the overlap of two slices.
    pub fn measure(&self, a: &Slice, b: &Slice) -> f64 {
        self.measure_regions(a.region(), b.region())
    }

    /// Measure the overlap of two bare regions.
    pub fn measure_regions(&self, a: &Region, b: &Region) -> f64 {
        let shared = if self.align {
            aligned_overlap_size(a, b)
        } else {
            a.overlap_size(b)
        };

        match self.mode {
            OverlapMode::Raw => shared as f64,
            OverlapMode::Normalized => {
                let union = a.size() + b.size() - shared;
                if union == 0 {
                    0.0
                } else {
                    shared as f64 / union as f64
                }
            }
        }
    }
}

impl Default for Overlap {
    fn default() -> Self {
        Self::normalized()
    }
}

fn aligned_overlap_size(a: &Region, b: &Region) -> usize {
    match (a.center(), b.center()) {
        (Some((ax, ay)), Some((bx, by))) => {
            let dx = (ax - bx).round() as i32;
            let dy = (ay - by).round() as i32;
            a.overlap_size(&b.translated(dx, dy))
        }
        _ => 0,
    }
}
