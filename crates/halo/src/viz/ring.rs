//! Radial stripe ring
//!
//! A fixed arena of stripes arranged evenly around a circle. Geometry
//! (angle, radius) is set once at construction; each frequency frame only
//! mutates height and opacity. Changing the stripe count discards and
//! rebuilds the whole arena.

use crate::config::ring;
use crate::settings::RenderParameters;

/// One stripe slot around the ring
#[derive(Debug, Clone, PartialEq)]
pub struct StripeElement {
    /// Angular position in degrees, measured from the first slot
    pub angle_deg: f32,

    /// Distance from ring center to the stripe base
    pub radius: f32,

    /// Current reactive height in logical pixels
    pub height: f32,

    /// Current opacity (0.5-1.0)
    pub opacity: f32,
}

/// Frequency-reactive stripe arena
#[derive(Debug, Clone)]
pub struct StripeRing {
    elements: Vec<StripeElement>,
    height_range: f32,
    thickness: f32,
}

impl StripeRing {
    /// Build the arena from render parameters
    pub fn new(params: &RenderParameters) -> Self {
        let mut ring = Self {
            elements: Vec::new(),
            height_range: params.stripe_height_range,
            thickness: params.stripe_thickness,
        };
        ring.rebuild(params.stripe_count);
        ring
    }

    /// Discard the arena and recreate it with a new slot count
    pub fn reinitialize(&mut self, stripe_count: usize) {
        self.rebuild(stripe_count.max(1));
    }

    fn rebuild(&mut self, count: usize) {
        let step = 360.0 / count as f32;
        self.elements = (0..count)
            .map(|i| StripeElement {
                angle_deg: i as f32 * step,
                radius: ring::RADIUS,
                height: ring::MIN_HEIGHT,
                opacity: ring::MIN_OPACITY,
            })
            .collect();
    }

    /// Map a frequency frame onto the arena.
    ///
    /// Each stripe samples one bin at its proportional position in the
    /// buffer. An empty buffer leaves the arena untouched.
    pub fn update(&mut self, bins: &[u8]) {
        if bins.is_empty() {
            return;
        }
        let count = self.elements.len();
        for (i, stripe) in self.elements.iter_mut().enumerate() {
            let bin = (i * bins.len()) / count;
            let amplitude = f32::from(bins[bin]) / 255.0;
            stripe.height = ring::MIN_HEIGHT + amplitude * self.height_range;
            stripe.opacity = ring::MIN_OPACITY + amplitude * (1.0 - ring::MIN_OPACITY);
        }
    }

    /// Current stripe slots, in angular order
    pub fn elements(&self) -> &[StripeElement] {
        &self.elements
    }

    /// Stripe width in logical pixels
    pub fn thickness(&self) -> f32 {
        self.thickness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with_count(count: usize) -> StripeRing {
        let params = RenderParameters {
            stripe_count: count,
            ..RenderParameters::default()
        };
        StripeRing::new(&params)
    }

    #[test]
    fn arena_has_one_slot_per_stripe() {
        let ring = ring_with_count(64);
        assert_eq!(ring.elements().len(), 64);
    }

    #[test]
    fn angles_partition_the_circle_evenly() {
        let ring = ring_with_count(64);
        for (i, stripe) in ring.elements().iter().enumerate() {
            assert_eq!(stripe.angle_deg, i as f32 * 360.0 / 64.0);
        }
        let last = ring.elements().last().unwrap();
        assert!(last.angle_deg < 360.0);
    }

    #[test]
    fn fresh_arena_rests_at_the_floor() {
        let ring = ring_with_count(32);
        for stripe in ring.elements() {
            assert_eq!(stripe.height, 10.0);
            assert_eq!(stripe.opacity, 0.5);
            assert_eq!(stripe.radius, 90.0);
        }
    }

    #[test]
    fn silence_keeps_stripes_at_the_floor() {
        let mut ring = ring_with_count(64);
        ring.update(&vec![0u8; 64]);
        for stripe in ring.elements() {
            assert_eq!(stripe.height, 10.0);
            assert_eq!(stripe.opacity, 0.5);
        }
    }

    #[test]
    fn saturated_buffer_pins_stripes_at_the_ceiling() {
        let mut ring = ring_with_count(64);
        ring.update(&vec![255u8; 64]);
        for stripe in ring.elements() {
            assert_eq!(stripe.height, 90.0);
            assert_eq!(stripe.opacity, 1.0);
        }
    }

    #[test]
    fn height_and_opacity_grow_with_amplitude() {
        let mut ring = ring_with_count(1);
        let mut prev_height = f32::NEG_INFINITY;
        let mut prev_opacity = f32::NEG_INFINITY;
        for value in [0u8, 32, 64, 128, 200, 255] {
            ring.update(&[value]);
            let stripe = &ring.elements()[0];
            assert!(stripe.height >= prev_height);
            assert!(stripe.opacity >= prev_opacity);
            assert!((10.0..=90.0).contains(&stripe.height));
            assert!((0.5..=1.0).contains(&stripe.opacity));
            prev_height = stripe.height;
            prev_opacity = stripe.opacity;
        }
    }

    #[test]
    fn stripes_sample_proportional_bins() {
        let mut ring = ring_with_count(4);
        let mut bins = vec![0u8; 32];
        // One loud bin in the third quarter of the spectrum
        bins[16] = 255;
        ring.update(&bins);

        let heights: Vec<f32> = ring.elements().iter().map(|s| s.height).collect();
        assert_eq!(heights[0], 10.0);
        assert_eq!(heights[1], 10.0);
        assert_eq!(heights[2], 90.0);
        assert_eq!(heights[3], 10.0);
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut ring = ring_with_count(8);
        ring.update(&vec![255u8; 8]);
        let before: Vec<StripeElement> = ring.elements().to_vec();
        ring.update(&[]);
        assert_eq!(ring.elements(), &before[..]);
    }

    #[test]
    fn update_mutates_only_height_and_opacity() {
        let mut ring = ring_with_count(16);
        let geometry: Vec<(f32, f32)> = ring
            .elements()
            .iter()
            .map(|s| (s.angle_deg, s.radius))
            .collect();
        ring.update(&vec![180u8; 16]);
        for (stripe, (angle, radius)) in ring.elements().iter().zip(geometry) {
            assert_eq!(stripe.angle_deg, angle);
            assert_eq!(stripe.radius, radius);
        }
    }

    #[test]
    fn reinitialize_rebuilds_the_arena() {
        let mut ring = ring_with_count(64);
        ring.update(&vec![255u8; 64]);
        ring.reinitialize(16);

        assert_eq!(ring.elements().len(), 16);
        for stripe in ring.elements() {
            assert_eq!(stripe.height, 10.0);
            assert_eq!(stripe.opacity, 0.5);
        }
    }

    #[test]
    fn reinitialize_refuses_an_empty_arena() {
        let mut ring = ring_with_count(8);
        ring.reinitialize(0);
        assert_eq!(ring.elements().len(), 1);
    }

    #[test]
    fn height_range_follows_parameters() {
        let params = RenderParameters {
            stripe_height_range: 40.0,
            ..RenderParameters::default()
        };
        let mut ring = StripeRing::new(&params);
        ring.update(&vec![255u8; 64]);
        assert_eq!(ring.elements()[0].height, 50.0);
    }
}
