//! Text → point-cloud rasterization for particle text formation.
//!
//! Text is drawn with the 8x8 bitmap font, scaled up and emboldened, onto an
//! off-screen grayscale canvas sized to the measured text. Every `stride`-th
//! pixel brighter than the threshold becomes one 3D target point.

use font8x8::legacy::BASIC_LEGACY;
use glam::Vec3;
use image::{GrayImage, Luma};
use rand::Rng;

use crate::config::TextConfig;
use crate::constants::TEXT_MAX_CHARS;

const GLYPH_SIZE: u32 = 8;

pub struct TextRasterizer {
    config: TextConfig,
}

impl TextRasterizer {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// Measured canvas size for `text`, before the max-canvas check.
    /// The extra column per glyph row is room for the bold smear.
    /// `None` when the size does not fit in a `u32`.
    pub fn measure(&self, text: &str) -> Option<(u32, u32)> {
        let chars = u32::try_from(text.chars().count()).ok()?;
        if chars == 0 {
            return Some((0, 0));
        }
        let cell = GLYPH_SIZE.checked_mul(self.config.glyph_scale)?;
        let width = chars.checked_mul(cell)?.checked_add(1)?;
        Some((width, cell))
    }

    /// Draw `text` onto a fresh canvas. `None` when the canvas would be empty
    /// or exceed the configured maximum.
    pub fn render_canvas(&self, text: &str) -> Option<GrayImage> {
        let (width, height) = self.measure(text)?;
        if width == 0
            || height == 0
            || width > self.config.max_canvas
            || height > self.config.max_canvas
        {
            return None;
        }

        let scale = self.config.glyph_scale;
        let cell = GLYPH_SIZE * scale;
        let mut canvas = GrayImage::new(width, height);

        for (n, ch) in text.chars().enumerate() {
            let glyph = glyph_for_char(ch);
            let origin_x = n as u32 * cell;
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = origin_x + col * scale;
                    let py = row as u32 * scale;
                    // Bold: every lit cell is one pixel wider than the grid.
                    for dy in 0..scale {
                        for dx in 0..=scale {
                            let x = px + dx;
                            if x < width {
                                canvas.put_pixel(x, py + dy, Luma([255]));
                            }
                        }
                    }
                }
            }
        }
        Some(canvas)
    }

    /// Rasterize `text` into 3D target points in front of the default framing.
    /// Returns an empty list when nothing can be drawn.
    pub fn rasterize(&self, text: &str, rng: &mut impl Rng) -> Vec<Vec3> {
        let Some(canvas) = self.render_canvas(text) else {
            tracing::debug!("text canvas unavailable for {:?}, formation is a no-op", text);
            return Vec::new();
        };

        let (width, height) = canvas.dimensions();
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        let stride = self.config.sample_stride.max(1) as usize;
        let jitter = self.config.depth_jitter;
        let mut points = Vec::new();

        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                let Luma([luma]) = *canvas.get_pixel(x, y);
                if luma <= self.config.luma_threshold {
                    continue;
                }
                let z = if jitter > 0.0 {
                    rng.random_range(-jitter..jitter)
                } else {
                    0.0
                };
                points.push(
                    Vec3::new(
                        (x as f32 - half_w) * self.config.point_scale,
                        (half_h - y as f32) * self.config.point_scale,
                        z,
                    ) + self.config.anchor(),
                );
            }
        }
        points
    }
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Shorten arbitrary text to a formation-sized phrase: whole words up to
/// `TEXT_MAX_CHARS`, or a hard cut when the first word alone is too long.
pub fn formation_text(raw: &str) -> String {
    let mut out = String::new();
    for word in raw.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > TEXT_MAX_CHARS {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        out = raw.trim().chars().take(TEXT_MAX_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rasterizer() -> TextRasterizer {
        TextRasterizer::new(TextConfig::default())
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_measure() {
        let r = rasterizer();
        let cell = GLYPH_SIZE * r.config().glyph_scale;
        assert_eq!(r.measure("Hi"), Some((2 * cell + 1, cell)));
        assert_eq!(r.measure(""), Some((0, 0)));
    }

    #[test]
    fn test_rasterize_produces_points() {
        let r = rasterizer();
        let points = r.rasterize("Hi", &mut rng());
        assert!(!points.is_empty());
        // Stride 2 over the canvas bounds the count.
        let (w, h) = r.measure("Hi").unwrap();
        assert!(points.len() <= (w.div_ceil(2) * h.div_ceil(2)) as usize);
    }

    #[test]
    fn test_points_centered_on_anchor() {
        let r = rasterizer();
        let anchor = r.config().anchor();
        let points = r.rasterize("HH", &mut rng());
        let mean = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        assert!((mean.x - anchor.x).abs() < 2.0, "x not centered: {mean:?}");
        assert!((mean.y - anchor.y).abs() < 2.0, "y not centered: {mean:?}");
        let jitter = r.config().depth_jitter;
        for p in &points {
            assert!((p.z - anchor.z).abs() <= jitter);
        }
    }

    #[test]
    fn test_empty_text_is_noop() {
        let r = rasterizer();
        assert!(r.rasterize("", &mut rng()).is_empty());
        assert!(r.rasterize("   ", &mut rng()).is_empty());
    }

    #[test]
    fn test_oversized_canvas_is_noop() {
        let config = TextConfig {
            max_canvas: 16,
            ..TextConfig::default()
        };
        let r = TextRasterizer::new(config);
        assert!(r.render_canvas("Hello").is_none());
        assert!(r.rasterize("Hello", &mut rng()).is_empty());
    }

    #[test]
    fn test_huge_glyph_scale_is_noop() {
        let r = TextRasterizer::new(TextConfig {
            glyph_scale: 1 << 30,
            ..TextConfig::default()
        });
        assert_eq!(r.measure("Hi"), None);
        assert!(r.render_canvas("Hi").is_none());
        assert!(r.rasterize("Hi", &mut rng()).is_empty());
    }

    #[test]
    fn test_bold_widens_strokes() {
        let r = rasterizer();
        let canvas = r.render_canvas("I").unwrap();
        let lit = canvas.pixels().filter(|p| p.0[0] > 0).count() as u32;
        let scale = r.config().glyph_scale;
        let glyph_cells: u32 = BASIC_LEGACY[b'I' as usize]
            .iter()
            .map(|row| row.count_ones())
            .sum();
        assert!(lit > glyph_cells * scale * scale);
    }

    #[test]
    fn test_non_ascii_falls_back() {
        assert_eq!(glyph_for_char('é'), BASIC_LEGACY[b'?' as usize]);
        let r = rasterizer();
        assert!(!r.rasterize("é", &mut rng()).is_empty());
    }

    #[test]
    fn test_formation_text_word_boundary() {
        assert_eq!(formation_text("hello"), "hello");
        assert_eq!(
            formation_text("the quick brown fox jumps over"),
            "the quick brown fox"
        );
        assert!(formation_text("the quick brown fox jumps over").chars().count() <= TEXT_MAX_CHARS);
    }

    #[test]
    fn test_formation_text_hard_cut() {
        let long = "supercalifragilisticexpialidocious";
        assert_eq!(formation_text(long).chars().count(), TEXT_MAX_CHARS);
    }
}
