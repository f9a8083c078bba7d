//! Drawing surface abstraction
//!
//! Renderers draw in CSS-pixel coordinates against a `CanvasSurface`; the
//! surface owns the backing store and applies the device-pixel-ratio scale.
//! Production surfaces rasterize onto a tiny-skia pixmap.

use std::path::Path;

use tiny_skia::{
    FillRule, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, Point, Rect, SpreadMode,
    Stroke, Transform,
};

use crate::error::{HaloError, Result};

/// Straight-alpha color, alpha in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Fill or stroke paint, described in CSS-pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSpec {
    Solid(Rgba),
    LinearGradient {
        from: (f32, f32),
        to: (f32, f32),
        stops: Vec<(f32, Rgba)>,
    },
}

impl PaintSpec {
    /// Two-stop linear gradient helper
    pub fn gradient(from: (f32, f32), to: (f32, f32), start: Rgba, end: Rgba) -> Self {
        PaintSpec::LinearGradient {
            from,
            to,
            stops: vec![(0.0, start), (1.0, end)],
        }
    }
}

/// 2D drawing surface in CSS-pixel units
///
/// The backing store is CSS dimensions scaled by the device pixel ratio and
/// is recomputed on every resize. Implementations clip drawing that overruns
/// the surface.
pub trait CanvasSurface {
    /// Logical drawing size in CSS pixels
    fn css_size(&self) -> (f32, f32);

    fn device_pixel_ratio(&self) -> f32;

    /// Recompute the backing store for new CSS dimensions and ratio
    fn resize(&mut self, css_width: f32, css_height: f32, ratio: f32);

    /// Backing store size in physical pixels
    fn backing_size(&self) -> (u32, u32);

    /// Erase the whole surface
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &PaintSpec);

    /// Fill a closed polygon given its outline points
    fn fill_polygon(&mut self, points: &[(f32, f32)], paint: &PaintSpec);

    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, paint: &PaintSpec);

    /// Stroke with a soft halo of `glow` color around the line
    fn stroke_polyline_glow(
        &mut self,
        points: &[(f32, f32)],
        width: f32,
        blur: f32,
        paint: &PaintSpec,
        glow: Rgba,
    );
}

/// tiny-skia backed surface
pub struct PixmapSurface {
    pixmap: Option<Pixmap>,
    css_width: f32,
    css_height: f32,
    ratio: f32,
}

impl PixmapSurface {
    pub fn new(css_width: f32, css_height: f32, ratio: f32) -> Result<Self> {
        let mut surface = Self {
            pixmap: None,
            css_width: 0.0,
            css_height: 0.0,
            ratio: 1.0,
        };
        surface.resize(css_width, css_height, ratio);
        if surface.pixmap.is_none() {
            return Err(HaloError::SurfaceNotReady);
        }
        Ok(surface)
    }

    /// Rasterized contents, absent while the surface is zero-sized
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Encode the current contents as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let pixmap = self.pixmap.as_ref().ok_or(HaloError::SurfaceNotReady)?;
        pixmap
            .save_png(path)
            .map_err(|e| HaloError::Settings(format!("Failed to write PNG: {}", e)))
    }

    fn transform(&self) -> Transform {
        Transform::from_scale(self.ratio, self.ratio)
    }

    fn build_shader(&self, paint: &PaintSpec) -> Option<tiny_skia::Shader<'static>> {
        match paint {
            PaintSpec::Solid(c) => Some(tiny_skia::Shader::SolidColor(to_color(*c))),
            PaintSpec::LinearGradient { from, to, stops } => {
                // Gradient geometry is specified in CSS pixels; scale it into
                // the backing store alongside the path transform.
                let r = self.ratio;
                LinearGradient::new(
                    Point::from_xy(from.0 * r, from.1 * r),
                    Point::from_xy(to.0 * r, to.1 * r),
                    stops
                        .iter()
                        .map(|(pos, c)| GradientStop::new(*pos, to_color(*c)))
                        .collect(),
                    SpreadMode::Pad,
                    Transform::identity(),
                )
            }
        }
    }

    fn stroke_with(&mut self, points: &[(f32, f32)], width: f32, paint: &PaintSpec) {
        if points.len() < 2 {
            return;
        }
        let Some(shader) = self.build_shader(paint) else {
            return;
        };
        let Some(path) = build_polyline(points) else {
            return;
        };
        let transform = self.transform();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let mut skia_paint = Paint::default();
        skia_paint.shader = shader;
        skia_paint.anti_alias = true;
        let stroke = Stroke {
            width,
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &skia_paint, &stroke, transform, None);
    }
}

fn to_color(c: Rgba) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a.clamp(0.0, 1.0),
    )
    .unwrap_or(tiny_skia::Color::TRANSPARENT)
}

fn build_polyline(points: &[(f32, f32)]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    let (x0, y0) = points.first()?;
    pb.move_to(*x0, *y0);
    for (x, y) in &points[1..] {
        pb.line_to(*x, *y);
    }
    pb.finish()
}

impl CanvasSurface for PixmapSurface {
    fn css_size(&self) -> (f32, f32) {
        (self.css_width, self.css_height)
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.ratio
    }

    fn resize(&mut self, css_width: f32, css_height: f32, ratio: f32) {
        self.css_width = css_width;
        self.css_height = css_height;
        self.ratio = ratio;
        let w = (css_width * ratio).round() as u32;
        let h = (css_height * ratio).round() as u32;
        // A zero-sized backing store means layout has not settled yet;
        // drawing is skipped until the next positive resize.
        self.pixmap = Pixmap::new(w, h);
    }

    fn backing_size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map(|p| (p.width(), p.height()))
            .unwrap_or((0, 0))
    }

    fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &PaintSpec) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let Some(shader) = self.build_shader(paint) else {
            return;
        };
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let transform = self.transform();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let mut skia_paint = Paint::default();
        skia_paint.shader = shader;
        skia_paint.anti_alias = true;
        pixmap.fill_rect(rect, &skia_paint, transform, None);
    }

    fn fill_polygon(&mut self, points: &[(f32, f32)], paint: &PaintSpec) {
        if points.len() < 3 {
            return;
        }
        let Some(shader) = self.build_shader(paint) else {
            return;
        };
        let path = {
            let mut pb = PathBuilder::new();
            pb.move_to(points[0].0, points[0].1);
            for (x, y) in &points[1..] {
                pb.line_to(*x, *y);
            }
            pb.close();
            pb.finish()
        };
        let Some(path) = path else {
            return;
        };
        let transform = self.transform();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let mut skia_paint = Paint::default();
        skia_paint.shader = shader;
        skia_paint.anti_alias = true;
        pixmap.fill_path(&path, &skia_paint, FillRule::Winding, transform, None);
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, paint: &PaintSpec) {
        self.stroke_with(points, width, paint);
    }

    fn stroke_polyline_glow(
        &mut self,
        points: &[(f32, f32)],
        width: f32,
        blur: f32,
        paint: &PaintSpec,
        glow: Rgba,
    ) {
        // Shadow blur approximated by layering widening translucent strokes
        // of the glow color beneath a final pass of the real paint.
        const LAYERS: u32 = 3;
        for layer in (1..=LAYERS).rev() {
            let t = layer as f32 / LAYERS as f32;
            let halo = PaintSpec::Solid(glow.with_alpha(glow.a * 0.35 * (1.0 - t * 0.6)));
            self.stroke_with(points, width + blur * t, &halo);
        }
        self.stroke_with(points, width, paint);
    }
}
