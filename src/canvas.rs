//! Paint targets for the simulation.
//!
//! The engine only ever asks for two things: fade the whole surface
//! toward a colour, and fill a disc. `FrameBuffer` is the terminal
//! implementation, a float RGB grid at half-block resolution.

use crate::color::{self, ColorValue, Rgb, WHITE};
use std::collections::HashMap;

pub trait Canvas {
    /// Blend the entire surface toward `color` by `alpha`.
    fn fade(&mut self, color: &ColorValue, alpha: f32);

    /// Fill a disc given in world units.
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: &ColorValue, alpha: f32);
}

pub struct FrameBuffer {
    width: usize,
    height: usize,
    /// World units per pixel.
    scale: f32,
    pixels: Vec<(f32, f32, f32)>,
    colors: HashMap<ColorValue, Rgb>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, scale: f32, background: Rgb) -> Self {
        let bg = to_float(background);
        Self {
            width,
            height,
            scale: scale.max(f32::EPSILON),
            pixels: vec![bg; width * height],
            colors: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let (r, g, b) = self.pixels[y * self.width + x];
        (r as u8, g as u8, b as u8)
    }

    /// Change the pixel grid. Overlapping pixels are kept, new ones get `fill`.
    pub fn resize(&mut self, width: usize, height: usize, fill: Rgb) {
        if width == self.width && height == self.height {
            return;
        }
        let fill = to_float(fill);
        let mut pixels = vec![fill; width * height];
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                pixels[y * width + x] = self.pixels[y * self.width + x];
            }
        }
        self.width = width;
        self.height = height;
        self.pixels = pixels;
    }

    fn resolve(&mut self, color: &ColorValue) -> Rgb {
        if let Some(rgb) = self.colors.get(color) {
            return *rgb;
        }
        let rgb = match color::parse_hex(color.as_str()) {
            Ok(rgb) => rgb,
            Err(err) => {
                tracing::warn!(color = %color, %err, "unrenderable color, drawing white");
                WHITE
            }
        };
        self.colors.insert(color.clone(), rgb);
        rgb
    }

    #[inline]
    fn blend(&mut self, idx: usize, color: (f32, f32, f32), alpha: f32) {
        let px = &mut self.pixels[idx];
        px.0 = px.0 * (1.0 - alpha) + color.0 * alpha;
        px.1 = px.1 * (1.0 - alpha) + color.1 * alpha;
        px.2 = px.2 * (1.0 - alpha) + color.2 * alpha;
    }
}

impl Canvas for FrameBuffer {
    fn fade(&mut self, color: &ColorValue, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        let rgb = to_float(self.resolve(color));
        for idx in 0..self.pixels.len() {
            self.blend(idx, rgb, alpha);
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: &ColorValue, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let cx = x / self.scale;
        let cy = y / self.scale;
        let r = radius / self.scale;
        let rgb = to_float(self.resolve(color));

        let x0 = (cx - r).floor() as i64;
        let x1 = (cx + r).floor() as i64;
        let y0 = (cy - r).floor() as i64;
        let y1 = (cy + r).floor() as i64;
        let (home_x, home_y) = (cx.floor() as i64, cy.floor() as i64);

        for py in y0..=y1 {
            if py < 0 || py >= self.height as i64 {
                continue;
            }
            for px in x0..=x1 {
                if px < 0 || px >= self.width as i64 {
                    continue;
                }
                // Sub-pixel discs still light the pixel holding their centre.
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let inside = dx * dx + dy * dy <= r * r || (px == home_x && py == home_y);
                if inside {
                    let idx = py as usize * self.width + px as usize;
                    self.blend(idx, rgb, alpha);
                }
            }
        }
    }
}

fn to_float(rgb: Rgb) -> (f32, f32, f32) {
    (rgb.0 as f32, rgb.1 as f32, rgb.2 as f32)
}
