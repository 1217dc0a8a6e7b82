//! Perceptual screenshot comparison.
//!
//! Similarity is scored as peak signal-to-noise ratio over the RGB channels.
//! PSNR shrugs off anti-aliasing and rounding jitter that would break exact
//! pixel equality while staying a single number where higher means closer.

pub mod policy;

pub use policy::{AssertionFailure, CapturePolicy, PolicyConfigError, PolicyDecision, PolicyOutcome};

use crate::config::DEFAULT_THRESHOLD;
use image::{Rgba, RgbaImage};

/// Score reported for identical images.
pub const IDENTICAL_SCORE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    pub source: (u32, u32),
    pub target: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub score: f64,
    pub matched: bool,
    /// Per-channel difference image; only built for equal-sized images that
    /// did not match.
    pub delta: Option<RgbaImage>,
    pub size_mismatch: Option<SizeMismatch>,
}

impl ComparisonResult {
    pub fn dimensions_differ(&self) -> bool {
        self.size_mismatch.is_some()
    }
}

fn size_mismatch(source: &RgbaImage, target: &RgbaImage) -> Option<SizeMismatch> {
    if source.dimensions() == target.dimensions() {
        None
    } else {
        Some(SizeMismatch {
            source: source.dimensions(),
            target: target.dimensions(),
        })
    }
}

/// PSNR in decibels; 0 when the sizes differ, `IDENTICAL_SCORE` when every
/// pixel matches.
pub fn psnr(source: &RgbaImage, target: &RgbaImage) -> f64 {
    if size_mismatch(source, target).is_some() {
        return 0.0;
    }

    let mut sq_sum: u64 = 0;
    for (s, t) in source.pixels().zip(target.pixels()) {
        for c in 0..3 {
            let d = s.0[c] as i64 - t.0[c] as i64;
            sq_sum += (d * d) as u64;
        }
    }

    if sq_sum == 0 {
        // Avoid division by zero.
        return IDENTICAL_SCORE;
    }

    let pixel_count = source.width() as f64 * source.height() as f64;
    let mean_square_error = sq_sum as f64 / (3.0 * pixel_count);
    let ratio = 10.0 * ((255.0 * 255.0) / mean_square_error).log10();
    ratio.min(IDENTICAL_SCORE)
}

/// Absolute per-channel difference of two equal-sized images.
///
/// With `white_equals`, pixels that match exactly are painted white instead
/// of black so small differences stand out when viewed.
pub fn delta(source: &RgbaImage, target: &RgbaImage, white_equals: bool) -> Option<RgbaImage> {
    if size_mismatch(source, target).is_some() {
        return None;
    }

    let mut output = RgbaImage::new(source.width(), source.height());
    for ((s, t), out) in source
        .pixels()
        .zip(target.pixels())
        .zip(output.pixels_mut())
    {
        let dr = s.0[0].abs_diff(t.0[0]);
        let dg = s.0[1].abs_diff(t.0[1]);
        let db = s.0[2].abs_diff(t.0[2]);
        *out = if white_equals && dr == 0 && dg == 0 && db == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([dr, dg, db, 255])
        };
    }
    Some(output)
}

/// `page.png` → `page.delta.png`; names without an extension get `.delta`.
pub fn delta_file_name(file: &str) -> String {
    let name_start = file.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match file[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let split = name_start + dot;
            format!("{}.delta{}", &file[..split], &file[split..])
        }
        _ => format!("{file}.delta"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    /// Scores strictly above this count as a match; identical images also
    /// match when this equals `IDENTICAL_SCORE`. Higher is stricter.
    pub threshold: f64,
    pub white_equals: bool,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            white_equals: false,
        }
    }
}

impl Comparator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn with_white_equals(mut self, white_equals: bool) -> Self {
        self.white_equals = white_equals;
        self
    }

    pub fn compare(&self, source: &RgbaImage, target: &RgbaImage) -> ComparisonResult {
        if let Some(mismatch) = size_mismatch(source, target) {
            return ComparisonResult {
                score: 0.0,
                matched: false,
                delta: None,
                size_mismatch: Some(mismatch),
            };
        }

        let score = psnr(source, target);
        // Identical images match at the sentinel threshold itself.
        let matched = score > self.threshold
            || (score == IDENTICAL_SCORE && self.threshold <= IDENTICAL_SCORE);
        log::debug!(
            "signal={score:.3} dB threshold={} matched={matched}",
            self.threshold
        );

        ComparisonResult {
            score,
            matched,
            delta: if matched {
                None
            } else {
                delta(source, target, self.white_equals)
            },
            size_mismatch: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) % 256) as u8,
                255,
            ])
        })
    }

    #[test]
    fn identical_images_score_sentinel() {
        let a = gradient(40, 30);
        assert_eq!(psnr(&a, &a), IDENTICAL_SCORE);
        let result = Comparator::new(IDENTICAL_SCORE - 0.5).compare(&a, &a);
        assert!(result.matched);
        assert!(result.delta.is_none());
    }

    #[test]
    fn identical_images_match_at_the_sentinel_itself() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([7, 7, 7, 255]));
        let result = Comparator::new(IDENTICAL_SCORE).compare(&a, &a);
        assert_eq!(result.score, IDENTICAL_SCORE);
        assert!(result.matched);
        let above = Comparator::new(IDENTICAL_SCORE + 1.0);
        assert!(!above.compare(&a, &a).matched);
    }

    #[test]
    fn score_is_symmetric() {
        let a = gradient(32, 32);
        let mut b = a.clone();
        b.put_pixel(3, 4, Rgba([0, 0, 0, 255]));
        b.put_pixel(30, 1, Rgba([255, 255, 255, 255]));
        assert_eq!(psnr(&a, &b), psnr(&b, &a));
        assert!(psnr(&a, &b) < IDENTICAL_SCORE);
    }

    #[test]
    fn score_matches_closed_form() {
        // Every channel off by 1: MSE = 1, PSNR = 20 log10(255).
        let a = solid(10, 10, [100, 100, 100]);
        let b = solid(10, 10, [101, 101, 101]);
        let expected = 20.0 * 255f64.log10();
        assert!((psnr(&a, &b) - expected).abs() < 1e-9);
    }

    #[test]
    fn maximal_difference_scores_zero() {
        let a = solid(5, 5, [0, 0, 0]);
        let b = solid(5, 5, [255, 255, 255]);
        assert!(psnr(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn alpha_is_ignored() {
        let a = solid(3, 3, [9, 9, 9]);
        let mut b = a.clone();
        b.put_pixel(1, 1, Rgba([9, 9, 9, 0]));
        assert_eq!(psnr(&a, &b), IDENTICAL_SCORE);
    }

    #[test]
    fn size_mismatch_never_matches_and_has_no_delta() {
        let a = solid(10, 10, [1, 2, 3]);
        let b = solid(10, 11, [1, 2, 3]);
        let result = Comparator::new(-1.0).compare(&a, &b);
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
        assert!(result.delta.is_none());
        assert_eq!(
            result.size_mismatch,
            Some(SizeMismatch {
                source: (10, 10),
                target: (10, 11),
            })
        );
        assert!(delta(&a, &b, false).is_none());
    }

    #[test]
    fn mismatch_carries_delta() {
        let a = solid(4, 4, [10, 200, 30]);
        let b = solid(4, 4, [250, 0, 30]);
        let result = Comparator::default().compare(&a, &b);
        assert!(!result.matched);
        let delta = result.delta.expect("delta image");
        assert_eq!(delta.get_pixel(0, 0), &Rgba([240, 200, 0, 255]));
    }

    #[test]
    fn white_equals_paints_identical_pixels_white() {
        let a = solid(2, 1, [5, 5, 5]);
        let mut b = a.clone();
        b.put_pixel(1, 0, Rgba([7, 5, 5, 255]));

        let plain = delta(&a, &b, false).unwrap();
        assert_eq!(plain.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

        let white = delta(&a, &b, true).unwrap();
        assert_eq!(white.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(white.get_pixel(1, 0), &Rgba([2, 0, 0, 255]));
    }

    #[test]
    fn delta_file_names() {
        assert_eq!(
            delta_file_name("screenshot_1.png"),
            "screenshot_1.delta.png"
        );
        assert_eq!(delta_file_name("dir.v2/shot.PNG"), "dir.v2/shot.delta.PNG");
        assert_eq!(delta_file_name("dir.v2/shot"), "dir.v2/shot.delta");
        assert_eq!(delta_file_name(".hidden"), ".hidden.delta");
    }
}
