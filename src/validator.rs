//! Match validation: confidence and size-tolerance gates.
//!
//! A raw match must clear both gates before it is allowed to drive a
//! click. Rejection here is normal control flow ("try the next
//! reference"), not an error.

use crate::corpus::ReferenceImage;
use crate::matcher::{RawMatch, Region};

/// A match that passed both gates, with its click target precomputed.
#[derive(Debug, Clone)]
pub struct ValidatedMatch {
    pub region: Region,
    pub confidence: f32,
    pub reference: String,
    /// Center of the matched region, in screen coordinates.
    pub target: (i32, i32),
}

/// Applies the two acceptance gates to a raw match.
///
/// 1. Confidence: `confidence >= confidence_threshold`.
/// 2. Size: matched width and height must each be within
///    `size_tolerance` relative deviation of the reference's own
///    dimensions. A structurally similar but differently scaled UI
///    element can score high on correlation alone; this gate catches
///    that case independently.
pub fn validate(
    raw: &RawMatch,
    reference: &ReferenceImage,
    confidence_threshold: f32,
    size_tolerance: f32,
) -> Option<ValidatedMatch> {
    if raw.confidence < confidence_threshold {
        return None;
    }

    if relative_deviation(raw.region.width, reference.width) > size_tolerance
        || relative_deviation(raw.region.height, reference.height) > size_tolerance
    {
        return None;
    }

    Some(ValidatedMatch {
        region: raw.region,
        confidence: raw.confidence,
        reference: raw.reference.clone(),
        target: raw.region.center(),
    })
}

/// `|matched - reference| / reference`. Reference dimensions are
/// guaranteed nonzero at corpus load.
fn relative_deviation(matched: u32, reference: u32) -> f32 {
    (matched as f32 - reference as f32).abs() / reference as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn reference(w: u32, h: u32) -> ReferenceImage {
        ReferenceImage {
            name: "ref".to_string(),
            pixels: ImageBuffer::new(w, h),
            width: w,
            height: h,
        }
    }

    fn raw(confidence: f32, w: u32, h: u32) -> RawMatch {
        RawMatch {
            region: Region {
                x: 100,
                y: 200,
                width: w,
                height: h,
            },
            confidence,
            reference: "ref".to_string(),
        }
    }

    #[test]
    fn test_accepts_exact_match() {
        let r = reference(50, 40);
        let m = validate(&raw(0.97, 50, 40), &r, 0.95, 0.10).unwrap();
        assert_eq!(m.target, (125, 220));
        assert_eq!(m.reference, "ref");
    }

    #[test]
    fn test_confidence_gate() {
        let r = reference(50, 40);
        assert!(validate(&raw(0.94, 50, 40), &r, 0.95, 0.10).is_none());
        // Threshold is inclusive.
        assert!(validate(&raw(0.95, 50, 40), &r, 0.95, 0.10).is_some());
    }

    #[test]
    fn test_confidence_gate_monotonic() {
        // Anything accepted at a higher threshold is accepted at a
        // lower one.
        let r = reference(50, 40);
        let thresholds = [0.5, 0.8, 0.9, 0.95, 0.99];
        for confidence in [0.42, 0.85, 0.93, 0.97, 1.0] {
            let m = raw(confidence, 50, 40);
            for window in thresholds.windows(2) {
                let (t1, t2) = (window[0], window[1]);
                if validate(&m, &r, t2, 0.10).is_some() {
                    assert!(
                        validate(&m, &r, t1, 0.10).is_some(),
                        "accepted at {} but not at {}",
                        t2,
                        t1
                    );
                }
            }
        }
    }

    #[test]
    fn test_size_gate_rejects_oversized_width() {
        let r = reference(100, 100);
        // 12% wider than the reference, perfect confidence.
        assert!(validate(&raw(1.0, 112, 100), &r, 0.95, 0.10).is_none());
    }

    #[test]
    fn test_size_gate_rejects_undersized_height() {
        let r = reference(100, 100);
        assert!(validate(&raw(1.0, 100, 88), &r, 0.95, 0.10).is_none());
    }

    #[test]
    fn test_size_gate_boundary() {
        let r = reference(100, 100);
        // Exactly 10% off is still inside the tolerance.
        assert!(validate(&raw(1.0, 110, 90), &r, 0.95, 0.10).is_some());
        assert!(validate(&raw(1.0, 111, 100), &r, 0.95, 0.10).is_none());
    }

    #[test]
    fn test_size_gate_independent_of_confidence() {
        // Max confidence cannot rescue a wrongly sized region.
        let r = reference(60, 60);
        assert!(validate(&raw(1.0, 60, 75), &r, 0.0, 0.10).is_none());
    }
}
