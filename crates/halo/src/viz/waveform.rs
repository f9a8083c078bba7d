//! Waveform renderer
//!
//! Draws the time-domain buffer as a horizontal waveform in CSS-pixel
//! coordinates. Two drawing routines share the same path geometry: a plain
//! gradient stroke with a translucent fill, and a glowing variant layered
//! over a wash with a bottom glow band and spectrum bars.

use crate::audio::types::TimeDomainBuffer;
use crate::config::wave::{BAR_STRIDE, GLOW_BAND_FRACTION, GLOW_BLUR};
use crate::error::{HaloError, Result};
use crate::settings::RenderParameters;

use super::canvas::{CanvasSurface, PaintSpec, Rgba};

/// Primary accent, `#9D4EDD`
const PRIMARY: Rgba = Rgba::opaque(157, 78, 221);
/// Deep accent, `#7B2CBF`
const DEEP: Rgba = Rgba::opaque(123, 44, 191);
/// Light accent, `#E0AAFF`
const LIGHT: Rgba = Rgba::opaque(224, 170, 255);

/// Which waveform drawing routine runs on the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizationMode {
    #[default]
    Default,
    Glowing,
}

impl VisualizationMode {
    pub fn toggled(self) -> Self {
        match self {
            VisualizationMode::Default => VisualizationMode::Glowing,
            VisualizationMode::Glowing => VisualizationMode::Default,
        }
    }
}

/// Stateless waveform drawing routine over fixed render parameters
pub struct WaveformRenderer {
    params: RenderParameters,
}

impl WaveformRenderer {
    pub fn new(params: RenderParameters) -> Self {
        Self { params }
    }

    /// Draw one frame.
    ///
    /// Clears the surface first in both modes. A zero-dimension surface is a
    /// layout race; the tick is skipped with `SurfaceNotReady`.
    pub fn draw(
        &self,
        surface: &mut dyn CanvasSurface,
        buffer: &TimeDomainBuffer,
        mode: VisualizationMode,
    ) -> Result<()> {
        let (w, h) = surface.css_size();
        if w <= 0.0 || h <= 0.0 {
            return Err(HaloError::SurfaceNotReady);
        }

        surface.clear();
        let points = self.path_points(&buffer.samples, w, h);
        match mode {
            VisualizationMode::Default => self.draw_default(surface, &points, w, h),
            VisualizationMode::Glowing => self.draw_glowing(surface, &points, &buffer.samples, w, h),
        }
        Ok(())
    }

    /// Sample path in CSS pixels.
    ///
    /// The horizontal scale deliberately overruns the surface; the overrun
    /// is clipped by the backing store.
    fn path_points(&self, samples: &[u8], w: f32, h: f32) -> Vec<(f32, f32)> {
        let n = samples.len().max(1);
        let step = (w / n as f32) * self.params.horizontal_scale;
        let center_y = h / 2.0;
        samples
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let v = s as f32 / 255.0;
                let y = center_y + (v - 0.5) * h * self.params.wave_amplitude;
                (i as f32 * step, y)
            })
            .collect()
    }

    fn draw_default(
        &self,
        surface: &mut dyn CanvasSurface,
        points: &[(f32, f32)],
        w: f32,
        h: f32,
    ) {
        let gradient = PaintSpec::gradient((0.0, 0.0), (0.0, h), PRIMARY, DEEP);
        surface.stroke_polyline(points, self.params.line_thickness, &gradient);

        // Close the path down to the center line and fill at 30% opacity.
        let mut area = points.to_vec();
        area.push((w, h / 2.0));
        area.push((0.0, h / 2.0));
        let fill = PaintSpec::gradient(
            (0.0, 0.0),
            (0.0, h),
            PRIMARY.with_alpha(0.3),
            DEEP.with_alpha(0.3),
        );
        surface.fill_polygon(&area, &fill);
    }

    fn draw_glowing(
        &self,
        surface: &mut dyn CanvasSurface,
        points: &[(f32, f32)],
        samples: &[u8],
        w: f32,
        h: f32,
    ) {
        // Translucent wash behind everything.
        let wash = PaintSpec::gradient(
            (0.0, 0.0),
            (0.0, h),
            PRIMARY.with_alpha(0.1),
            PRIMARY.with_alpha(0.3),
        );
        surface.fill_rect(0.0, 0.0, w, h, &wash);

        // Main line, stroked twice: plain, then with the glow halo.
        let line = PaintSpec::LinearGradient {
            from: (0.0, 0.0),
            to: (w, 0.0),
            stops: vec![(0.0, PRIMARY), (0.5, LIGHT), (1.0, PRIMARY)],
        };
        surface.stroke_polyline(points, self.params.line_thickness, &line);
        surface.stroke_polyline_glow(points, self.params.line_thickness, GLOW_BLUR, &line, PRIMARY);

        // Bottom glow band.
        let band_h = h * GLOW_BAND_FRACTION;
        let band = PaintSpec::gradient(
            (0.0, h - band_h),
            (0.0, h),
            PRIMARY.with_alpha(0.5),
            PRIMARY.with_alpha(0.8),
        );
        surface.fill_rect(0.0, h - band_h, w, band_h, &band);

        // Spectrum bars over the band; x advances even when a bar is
        // skipped, bars below the center line are never mirrored.
        let n = samples.len().max(1);
        let bar_width = (w / n as f32) * (3.0 * self.params.horizontal_scale);
        let mut x = 0.0;
        for i in (0..samples.len()).step_by(BAR_STRIDE) {
            let v = samples[i] as f32 / 255.0;
            let bar_height = (v - 0.5) * band_h * 2.0 * self.params.wave_amplitude;
            if bar_height > 0.0 {
                let bar = PaintSpec::gradient((0.0, h - bar_height), (0.0, h), LIGHT, PRIMARY);
                surface.fill_rect(x, h - bar_height, bar_width - 2.0, bar_height, &bar);
            }
            x += bar_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::canvas::recording::{DrawOp, RecordingSurface};
    use super::*;

    const W: f32 = 300.0;
    const H: f32 = 150.0;

    fn renderer() -> WaveformRenderer {
        WaveformRenderer::new(RenderParameters::default())
    }

    fn buffer(samples: Vec<u8>) -> TimeDomainBuffer {
        TimeDomainBuffer {
            samples,
            sample_count: 1,
        }
    }

    fn stroke_points(ops: &[DrawOp]) -> &[(f32, f32)] {
        ops.iter()
            .find_map(|op| match op {
                DrawOp::Stroke { points, .. } => Some(points.as_slice()),
                _ => None,
            })
            .expect("expected a stroked path")
    }

    #[test]
    fn mode_toggles_between_the_two_routines() {
        assert_eq!(
            VisualizationMode::Default.toggled(),
            VisualizationMode::Glowing
        );
        assert_eq!(
            VisualizationMode::Glowing.toggled(),
            VisualizationMode::Default
        );
        assert_eq!(VisualizationMode::default(), VisualizationMode::Default);
    }

    #[test]
    fn clears_before_drawing_in_both_modes() {
        for mode in [VisualizationMode::Default, VisualizationMode::Glowing] {
            let mut surface = RecordingSurface::new(W, H, 1.0);
            renderer().draw(&mut surface, &buffer(vec![128; 64]), mode).unwrap();
            assert_eq!(surface.ops.first(), Some(&DrawOp::Clear));
        }
    }

    #[test]
    fn silence_draws_a_flat_line_at_vertical_center() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![128; 256]),
                VisualizationMode::Default,
            )
            .unwrap();

        let points = stroke_points(&surface.ops);
        let first_y = points[0].1;
        assert!(points.iter().all(|&(_, y)| y == first_y), "line must be flat");
        assert!(
            (first_y - H / 2.0).abs() < 1.0,
            "flat line should sit at the center, was {}",
            first_y
        );
    }

    #[test]
    fn horizontal_step_overruns_the_surface() {
        let n = 64;
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![128; n]),
                VisualizationMode::Default,
            )
            .unwrap();

        let points = stroke_points(&surface.ops);
        let step = points[1].0 - points[0].0;
        assert!((step - (W / n as f32) * 5.0).abs() < 1e-4);
        // The stretched path runs past the right edge and relies on clipping.
        assert!(points.last().unwrap().0 > W);
    }

    #[test]
    fn amplitude_exaggerates_vertical_excursion() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![255; 16]),
                VisualizationMode::Default,
            )
            .unwrap();

        let points = stroke_points(&surface.ops);
        let expected = H / 2.0 + 0.5 * H * 1.2;
        assert!((points[0].1 - expected).abs() < 1e-3);
    }

    #[test]
    fn default_mode_strokes_then_fills_to_center_line() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![200; 32]),
                VisualizationMode::Default,
            )
            .unwrap();

        assert_eq!(surface.ops.len(), 3);
        assert!(matches!(surface.ops[1], DrawOp::Stroke { width, .. } if width == 5.0));
        match &surface.ops[2] {
            DrawOp::FillPolygon { points, paint } => {
                // The fill area closes down to the center line.
                let len = points.len();
                assert_eq!(points[len - 2], (W, H / 2.0));
                assert_eq!(points[len - 1], (0.0, H / 2.0));
                match paint {
                    PaintSpec::LinearGradient { stops, .. } => {
                        assert!(stops.iter().all(|(_, c)| (c.a - 0.3).abs() < 1e-6));
                    }
                    other => panic!("expected a gradient fill, got {:?}", other),
                }
            }
            other => panic!("expected the closing fill, got {:?}", other),
        }
    }

    #[test]
    fn default_mode_uses_vertical_purple_gradient() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![128; 32]),
                VisualizationMode::Default,
            )
            .unwrap();

        match &surface.ops[1] {
            DrawOp::Stroke { paint, .. } => match paint {
                PaintSpec::LinearGradient { from, to, stops } => {
                    assert_eq!(*from, (0.0, 0.0));
                    assert_eq!(*to, (0.0, H));
                    assert_eq!(stops[0].1, PRIMARY);
                    assert_eq!(stops[1].1, DEEP);
                }
                other => panic!("expected gradient stroke, got {:?}", other),
            },
            other => panic!("expected stroke op, got {:?}", other),
        }
    }

    #[test]
    fn glowing_mode_layers_wash_line_glow_and_band() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        // All-zero samples keep every bar non-positive, so the op sequence
        // is exactly wash, stroke, glow stroke, band.
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![0; 64]),
                VisualizationMode::Glowing,
            )
            .unwrap();

        assert_eq!(surface.ops.len(), 5);
        assert_eq!(surface.ops[0], DrawOp::Clear);
        assert!(matches!(surface.ops[1], DrawOp::FillRect { x: 0.0, y: 0.0, w, h, .. } if w == W && h == H));
        assert!(matches!(surface.ops[2], DrawOp::Stroke { .. }));
        assert!(
            matches!(surface.ops[3], DrawOp::GlowStroke { blur, glow, .. } if blur == 15.0 && glow == PRIMARY)
        );
        match &surface.ops[4] {
            DrawOp::FillRect { y, h, .. } => {
                assert!((y - (H - H * 0.2)).abs() < 1e-4);
                assert!((h - H * 0.2).abs() < 1e-4);
            }
            other => panic!("expected the glow band, got {:?}", other),
        }
    }

    #[test]
    fn glowing_line_uses_three_stop_horizontal_gradient() {
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![0; 64]),
                VisualizationMode::Glowing,
            )
            .unwrap();

        match &surface.ops[2] {
            DrawOp::Stroke { paint, .. } => match paint {
                PaintSpec::LinearGradient { from, to, stops } => {
                    assert_eq!(*from, (0.0, 0.0));
                    assert_eq!(*to, (W, 0.0));
                    assert_eq!(
                        stops.as_slice(),
                        &[(0.0, PRIMARY), (0.5, LIGHT), (1.0, PRIMARY)]
                    );
                }
                other => panic!("expected gradient, got {:?}", other),
            },
            other => panic!("expected stroke, got {:?}", other),
        }
    }

    #[test]
    fn loud_buffer_grows_spectrum_bars() {
        let n = 64;
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(
                &mut surface,
                &buffer(vec![255; n]),
                VisualizationMode::Glowing,
            )
            .unwrap();

        let bars: Vec<_> = surface.ops[5..]
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { x, w, h, .. } => Some((*x, *w, *h)),
                _ => None,
            })
            .collect();
        assert_eq!(bars.len(), n / BAR_STRIDE);

        let bar_width = (W / n as f32) * 15.0;
        let band_h = H * 0.2;
        for (i, (x, w, h)) in bars.iter().enumerate() {
            assert!((x - i as f32 * bar_width).abs() < 1e-3);
            assert!((w - (bar_width - 2.0)).abs() < 1e-4);
            assert!((h - 0.5 * band_h * 2.0 * 1.2).abs() < 1e-3);
        }
    }

    #[test]
    fn quiet_bars_are_skipped_but_keep_their_slots() {
        let n = 16;
        // One loud sample at index 8; everything else at the floor.
        let mut samples = vec![0u8; n];
        samples[8] = 255;
        let mut surface = RecordingSurface::new(W, H, 1.0);
        renderer()
            .draw(&mut surface, &buffer(samples), VisualizationMode::Glowing)
            .unwrap();

        let bars: Vec<_> = surface.ops[5..]
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        // Only the loud slot draws, at its own x offset (slot 8 / stride 4 = slot 2).
        let bar_width = (W / n as f32) * 15.0;
        assert_eq!(bars.len(), 1);
        assert!((bars[0] - 2.0 * bar_width).abs() < 1e-3);
    }

    #[test]
    fn zero_dimension_surface_skips_the_tick() {
        let mut surface = RecordingSurface::new(0.0, 0.0, 1.0);
        let result = renderer().draw(
            &mut surface,
            &buffer(vec![128; 16]),
            VisualizationMode::Default,
        );
        assert!(matches!(result, Err(HaloError::SurfaceNotReady)));
        assert!(surface.ops.is_empty(), "no draw calls on a zero surface");
    }

    #[test]
    fn geometry_scales_with_surface_width() {
        let n = 64;
        let mut narrow = RecordingSurface::new(300.0, 150.0, 2.0);
        let mut wide = RecordingSurface::new(600.0, 300.0, 2.0);
        let r = renderer();
        r.draw(&mut narrow, &buffer(vec![128; n]), VisualizationMode::Default)
            .unwrap();
        r.draw(&mut wide, &buffer(vec![128; n]), VisualizationMode::Default)
            .unwrap();

        let step_narrow = stroke_points(&narrow.ops)[1].0;
        let step_wide = stroke_points(&wide.ops)[1].0;
        assert!((step_wide - step_narrow * 2.0).abs() < 1e-4);
    }
}
