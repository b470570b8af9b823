/// Template matching implementation
///
/// Normalized cross-correlation picks a single candidate, then a zero-mean
/// correlation check decides found/not found. Large templates are searched
/// coarse-to-fine: the whole frame at reduced resolution, then a few small
/// full-resolution windows around the best coarse hits.
use super::config::MatchConfig;
use super::types::{MatchResult, MatchStatus, Template};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use imageproc::template_matching::{MatchTemplateMethod, match_template, match_template_parallel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const FOUND_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MISSED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Shortest template side still required after downscaling
const MIN_COARSE_TEMPLATE_SIDE: u32 = 12;
const MAX_PYRAMID_FACTOR: u32 = 8;
/// Coarse hits refined at full resolution
const COARSE_CANDIDATES: usize = 5;

/// Locates a template inside a screenshot
pub struct TemplateMatcher {
    config: MatchConfig,
    attempts: AtomicU64,
}

impl TemplateMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            attempts: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: MatchConfig) {
        self.config = config;
    }

    /// Find the best match for `template` in `screenshot`.
    ///
    /// Never retries. In debug mode the result carries an annotated screenshot
    /// (and it is written to disk if an output directory is configured);
    /// this never changes status or coordinates.
    pub fn locate(&self, screenshot: &DynamicImage, template: &Template) -> MatchResult {
        let start_time = Instant::now();
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

        let screenshot_gray = screenshot.to_luma8();
        let mut result = self.locate_gray(&screenshot_gray, template.gray());

        log::debug!(
            "🔍 Match attempt #{} ({}x{} in {}x{}): {} in {}ms",
            attempt,
            template.width(),
            template.height(),
            screenshot_gray.width(),
            screenshot_gray.height(),
            result.describe(),
            start_time.elapsed().as_millis()
        );

        if self.config.debug_enabled {
            let visualization = annotate(screenshot.to_rgb8(), &result);
            if let Some(dir) = &self.config.debug_output_dir {
                let path = dir.join(format!(
                    "match-{:05}-status{}.png",
                    attempt,
                    result.status.code()
                ));
                let saved = std::fs::create_dir_all(dir)
                    .map_err(|e| e.to_string())
                    .and_then(|_| visualization.save(&path).map_err(|e| e.to_string()));
                match saved {
                    Ok(()) => log::debug!("🖼️ Saved match visualization to {}", path.display()),
                    Err(e) => log::warn!(
                        "⚠️ Failed to save match visualization {}: {}",
                        path.display(),
                        e
                    ),
                }
            }
            result.visualization = Some(visualization);
        }

        result
    }

    /// Grayscale core of [`TemplateMatcher::locate`]
    pub fn locate_gray(&self, screenshot: &GrayImage, template: &GrayImage) -> MatchResult {
        let (screen_width, screen_height) = screenshot.dimensions();
        let (template_width, template_height) = template.dimensions();

        if template_width == 0 || template_height == 0 || screen_width == 0 || screen_height == 0 {
            return MatchResult::failed(MatchStatus::EmptyImage);
        }
        if template_width > screen_width || template_height > screen_height {
            if self.config.debug_enabled {
                log::debug!(
                    "⚠️ Template {}x{} larger than screenshot {}x{}",
                    template_width,
                    template_height,
                    screen_width,
                    screen_height
                );
            }
            return MatchResult::failed(MatchStatus::TemplateTooLarge);
        }

        let factor = pyramid_factor(template_width, template_height);
        let candidate = if factor == 1 {
            let scores = match_template_parallel(
                screenshot,
                template,
                MatchTemplateMethod::CrossCorrelationNormalized,
            );
            best_score(&scores)
        } else {
            if self.config.debug_enabled {
                log::debug!("  🔎 Coarse search at 1/{} resolution", factor);
            }
            coarse_to_fine(screenshot, template, factor)
        };

        let Some((x, y, ncc)) = candidate else {
            return MatchResult::failed(MatchStatus::BelowThreshold);
        };

        let window = image::imageops::crop_imm(screenshot, x, y, template_width, template_height)
            .to_image();
        let confidence = correlation_coefficient(template, &window);

        if self.config.debug_enabled {
            log::debug!(
                "  ⏳ Best candidate at ({},{}) ncc={:.4} confidence={:.4} threshold={:.2}",
                x,
                y,
                ncc,
                confidence,
                self.config.confidence_threshold
            );
        }

        let status = if confidence >= self.config.confidence_threshold {
            MatchStatus::Found
        } else {
            MatchStatus::BelowThreshold
        };

        MatchResult {
            status,
            top_left: (x, y),
            bottom_right: (x + template_width, y + template_height),
            confidence,
            visualization: None,
        }
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// Downscale factor for the coarse pass, 1 when the template is too small
fn pyramid_factor(template_width: u32, template_height: u32) -> u32 {
    let short_side = template_width.min(template_height);
    let mut factor = 1;
    while factor < MAX_PYRAMID_FACTOR && short_side / (factor * 2) >= MIN_COARSE_TEMPLATE_SIDE {
        factor *= 2;
    }
    factor
}

/// Area-average `image` down by `factor`, dropping edge pixels that do not fill a whole block
fn downscale(image: &GrayImage, factor: u32) -> GrayImage {
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    let aligned = image::imageops::crop_imm(
        image,
        0,
        0,
        (width * factor).min(image.width()),
        (height * factor).min(image.height()),
    )
    .to_image();
    image::imageops::thumbnail(&aligned, width, height)
}

/// Search at reduced resolution, then re-run the full-resolution match in a
/// small window around each of the best coarse positions
fn coarse_to_fine(screenshot: &GrayImage, template: &GrayImage, factor: u32) -> Option<(u32, u32, f32)> {
    let coarse_scores = match_template_parallel(
        &downscale(screenshot, factor),
        &downscale(template, factor),
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let spacing = (template.width().min(template.height()) / factor / 2).max(1);

    top_candidates(&coarse_scores, COARSE_CANDIDATES, spacing)
        .into_iter()
        .filter_map(|(cx, cy)| refine(screenshot, template, cx * factor, cy * factor, factor * 2))
        .max_by(|a, b| a.2.total_cmp(&b.2))
}

/// Full-resolution match restricted to top-left positions within `radius` of `(x, y)`
fn refine(
    screenshot: &GrayImage,
    template: &GrayImage,
    x: u32,
    y: u32,
    radius: u32,
) -> Option<(u32, u32, f32)> {
    let max_x = screenshot.width() - template.width();
    let max_y = screenshot.height() - template.height();
    let x0 = x.saturating_sub(radius).min(max_x);
    let y0 = y.saturating_sub(radius).min(max_y);
    let x1 = x.saturating_add(radius).min(max_x);
    let y1 = y.saturating_add(radius).min(max_y);

    let region = image::imageops::crop_imm(
        screenshot,
        x0,
        y0,
        x1 - x0 + template.width(),
        y1 - y0 + template.height(),
    )
    .to_image();
    let scores = match_template(&region, template, MatchTemplateMethod::CrossCorrelationNormalized);
    best_score(&scores).map(|(dx, dy, score)| (x0 + dx, y0 + dy, score))
}

/// Highest finite score and its position.
///
/// Not `find_extremes`: windows of all-zero pixels score NaN, which breaks its comparisons.
fn best_score(scores: &ImageBuffer<Luma<f32>, Vec<f32>>) -> Option<(u32, u32, f32)> {
    let mut best: Option<(u32, u32, f32)> = None;
    for (x, y, pixel) in scores.enumerate_pixels() {
        let score = pixel[0];
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, _, best_score)| score > best_score) {
            best = Some((x, y, score));
        }
    }
    best
}

/// Up to `count` best positions, each at least `spacing` away from the ones before it
fn top_candidates(scores: &ImageBuffer<Luma<f32>, Vec<f32>>, count: usize, spacing: u32) -> Vec<(u32, u32)> {
    let mut ranked: Vec<(u32, u32, f32)> = scores
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[0].is_finite())
        .map(|(x, y, pixel)| (x, y, pixel[0]))
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut picked: Vec<(u32, u32)> = Vec::with_capacity(count);
    for (x, y, _) in ranked {
        if picked.len() == count {
            break;
        }
        let separated = picked
            .iter()
            .all(|&(px, py)| x.abs_diff(px) >= spacing || y.abs_diff(py) >= spacing);
        if separated {
            picked.push((x, y));
        }
    }
    picked
}

/// Zero-mean correlation coefficient between two equally sized images, clamped to 0.0-1.0.
///
/// Flat images have no variance to correlate. Two flat images are compared by
/// brightness instead, while a flat image against a textured one scores 0.
fn correlation_coefficient(template: &GrayImage, window: &GrayImage) -> f32 {
    if template.dimensions() != window.dimensions() {
        return 0.0;
    }
    let pixel_count = (template.width() as u64 * template.height() as u64) as f64;
    if pixel_count == 0.0 {
        return 0.0;
    }

    let mean = |img: &GrayImage| img.pixels().map(|p| p[0] as f64).sum::<f64>() / pixel_count;
    let template_mean = mean(template);
    let window_mean = mean(window);

    let mut covariance = 0.0;
    let mut template_var = 0.0;
    let mut window_var = 0.0;
    for (t, w) in template.pixels().zip(window.pixels()) {
        let dt = t[0] as f64 - template_mean;
        let dw = w[0] as f64 - window_mean;
        covariance += dt * dw;
        template_var += dt * dt;
        window_var += dw * dw;
    }

    const FLAT: f64 = 1e-9;
    let template_flat = template_var / pixel_count < FLAT;
    let window_flat = window_var / pixel_count < FLAT;

    let score = match (template_flat, window_flat) {
        (true, true) => 1.0 - (template_mean - window_mean).abs() / 255.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => covariance / (template_var * window_var).sqrt(),
    };
    score.clamp(0.0, 1.0) as f32
}

fn annotate(mut canvas: RgbImage, result: &MatchResult) -> RgbImage {
    if matches!(
        result.status,
        MatchStatus::Found | MatchStatus::BelowThreshold
    ) && result.width() > 0
        && result.height() > 0
    {
        let color = if result.is_found() {
            FOUND_COLOR
        } else {
            MISSED_COLOR
        };
        let rect = Rect::at(result.top_left.0 as i32, result.top_left.1 as i32)
            .of_size(result.width(), result.height());
        draw_hollow_rect_mut(&mut canvas, rect, color);
    }
    canvas
}
