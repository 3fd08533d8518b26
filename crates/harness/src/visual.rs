//! Screenshot comparison against stored baselines
//!
//! Screenshots the driver captures land in the actual directory. For
//! scenarios that opt in, each one is compared against a baseline of the
//! same name: a SHA-256 fast path for byte-identical files, then a
//! pixel-by-pixel pass with a small per-channel tolerance so anti-aliasing
//! and encoder noise do not count as regressions. Mismatches produce a diff
//! image with the differing pixels marked in red.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Result of checking one screenshot.
#[derive(Debug, Clone)]
pub struct ScreenshotCheck {
    pub name: String,
    pub matches: bool,
    pub diff_percent: f64,
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_image: Option<PathBuf>,
    pub actual_sha256: String,
    pub baseline_sha256: String,
}

/// Configuration for screenshot comparison.
#[derive(Debug, Clone)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,

    /// Allowed difference in percent of pixels.
    pub threshold: f64,

    /// Per-channel tolerance before two pixels count as different.
    pub pixel_tolerance: u8,

    /// Adopt the actual screenshot as baseline when none exists.
    pub auto_update: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        VisualConfig {
            baseline_dir: PathBuf::from("test-results/baselines"),
            actual_dir: PathBuf::from("test-results/screenshots"),
            diff_dir: PathBuf::from("test-results/diffs"),
            threshold: 0.5,
            pixel_tolerance: 5,
            auto_update: false,
        }
    }
}

pub struct VisualChecker {
    config: VisualConfig,
}

impl VisualChecker {
    pub fn new(config: VisualConfig) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.actual_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;
        Ok(VisualChecker { config })
    }

    /// Compare the named screenshot against its baseline.
    pub fn check(&self, name: &str, threshold: Option<f64>) -> HarnessResult<ScreenshotCheck> {
        let threshold = threshold.unwrap_or(self.config.threshold);

        let actual_path = self.config.actual_dir.join(format!("{name}.png"));
        let baseline_path = self.config.baseline_dir.join(format!("{name}.png"));

        if !actual_path.exists() {
            return Err(HarnessError::Artifact(format!(
                "screenshot was never captured: {}",
                actual_path.display()
            )));
        }

        if !baseline_path.exists() {
            if self.config.auto_update {
                info!("adopting '{name}' as baseline");
                std::fs::copy(&actual_path, &baseline_path)?;
                let hash = sha256_file(&actual_path)?;
                return Ok(ScreenshotCheck {
                    name: name.to_string(),
                    matches: true,
                    diff_percent: 0.0,
                    diff_pixels: 0,
                    total_pixels: 0,
                    diff_image: None,
                    actual_sha256: hash.clone(),
                    baseline_sha256: hash,
                });
            }
            return Err(HarnessError::BaselineNotFound(
                baseline_path.to_string_lossy().to_string(),
            ));
        }

        let actual_sha256 = sha256_file(&actual_path)?;
        let baseline_sha256 = sha256_file(&baseline_path)?;

        let actual = image::open(&actual_path)?.to_rgba8();

        if actual_sha256 == baseline_sha256 {
            debug!("'{name}' is byte-identical to its baseline");
            let total = u64::from(actual.width()) * u64::from(actual.height());
            return Ok(ScreenshotCheck {
                name: name.to_string(),
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: total,
                diff_image: None,
                actual_sha256,
                baseline_sha256,
            });
        }

        let baseline = image::open(&baseline_path)?.to_rgba8();

        if (actual.width(), actual.height()) != (baseline.width(), baseline.height()) {
            warn!(
                "'{name}' dimensions changed: {}x{} vs baseline {}x{}",
                actual.width(),
                actual.height(),
                baseline.width(),
                baseline.height()
            );
        }

        let (diff_pixels, total_pixels, diff_img) = self.diff_images(&actual, &baseline);
        let diff_percent = if total_pixels == 0 {
            0.0
        } else {
            (diff_pixels as f64 / total_pixels as f64) * 100.0
        };
        let matches = diff_percent <= threshold;

        let diff_image = if diff_pixels > 0 {
            let path = self.config.diff_dir.join(format!("{name}-diff.png"));
            diff_img.save(&path)?;
            Some(path)
        } else {
            None
        };

        if !matches {
            warn!(
                "'{name}' differs from baseline: {diff_percent:.2}% of pixels (threshold {threshold:.2}%)"
            );
        }

        Ok(ScreenshotCheck {
            name: name.to_string(),
            matches,
            diff_percent,
            diff_pixels,
            total_pixels,
            diff_image,
            actual_sha256,
            baseline_sha256,
        })
    }

    /// Pixel comparison over the union of both images. Area covered by only
    /// one of them counts as differing, so a resize can never slip under
    /// the threshold.
    fn diff_images(&self, actual: &RgbaImage, baseline: &RgbaImage) -> (u64, u64, RgbaImage) {
        let width = actual.width().max(baseline.width());
        let height = actual.height().max(baseline.height());

        let mut diff_img = RgbaImage::new(width, height);
        let mut diff_pixels = 0u64;
        let total_pixels = u64::from(width) * u64::from(height);

        for y in 0..height {
            for x in 0..width {
                let a = pixel_at(actual, x, y);
                let b = pixel_at(baseline, x, y);

                let differs = match (a, b) {
                    (Some(a), Some(b)) => !self.within_tolerance(a, b),
                    _ => true,
                };

                if differs {
                    diff_pixels += 1;
                    diff_img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                } else {
                    let [r, g, b_ch, _] = a.unwrap_or([0, 0, 0, 0]);
                    diff_img.put_pixel(x, y, Rgba([r / 2, g / 2, b_ch / 2, 128]));
                }
            }
        }

        (diff_pixels, total_pixels, diff_img)
    }

    fn within_tolerance(&self, a: [u8; 4], b: [u8; 4]) -> bool {
        let tolerance = i16::from(self.config.pixel_tolerance);
        a.iter()
            .zip(b.iter())
            .all(|(&x, &y)| (i16::from(x) - i16::from(y)).abs() <= tolerance)
    }

    /// Promote the actual screenshot to baseline.
    pub fn update_baseline(&self, name: &str) -> HarnessResult<()> {
        let actual_path = self.config.actual_dir.join(format!("{name}.png"));
        let baseline_path = self.config.baseline_dir.join(format!("{name}.png"));

        if !actual_path.exists() {
            return Err(HarnessError::Artifact(format!(
                "cannot update baseline, screenshot missing: {}",
                actual_path.display()
            )));
        }

        std::fs::copy(&actual_path, &baseline_path)?;
        info!("updated baseline for '{name}'");
        Ok(())
    }

    /// Promote every captured screenshot to baseline.
    pub fn update_all_baselines(&self) -> HarnessResult<usize> {
        let mut updated = 0;
        for name in png_stems(&self.config.actual_dir)? {
            self.update_baseline(&name)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Names of all stored baselines.
    pub fn baselines(&self) -> HarnessResult<Vec<String>> {
        png_stems(&self.config.baseline_dir)
    }

    /// Remove stale diff images from previous runs.
    pub fn clear_diffs(&self) -> HarnessResult<()> {
        for entry in std::fs::read_dir(&self.config.diff_dir)? {
            std::fs::remove_file(entry?.path())?;
        }
        Ok(())
    }
}

fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<[u8; 4]> {
    if x < img.width() && y < img.height() {
        Some(img.get_pixel(x, y).0)
    } else {
        None
    }
}

fn png_stems(dir: &Path) -> HarnessResult<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "png").unwrap_or(false) {
            if let Some(stem) = path.file_stem() {
                stems.push(stem.to_string_lossy().to_string());
            }
        }
    }
    stems.sort();
    Ok(stems)
}

fn sha256_file(path: &Path) -> HarnessResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
