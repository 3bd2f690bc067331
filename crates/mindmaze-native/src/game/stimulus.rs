//! Flickering SSVEP stimuli

use mindmaze_core::{StimulusShape, StimulusTarget};

/// Default shape size in pixels, sized to fit inside a 100 px border
pub const STIMULUS_SIZE: f32 = 80.0;

/// A shape that toggles visibility at its target frequency.
///
/// The timer accumulates frame time and the shape flips whenever it reaches
/// `1000 / f` ms, after which the timer restarts from zero. The flicker is
/// therefore quantised to the frame rate, exactly as the screen shows it.
#[derive(Clone, Debug, PartialEq)]
pub struct FlickeringStimulus {
    target: StimulusTarget,
    center: (f32, f32),
    size: f32,
    visible: bool,
    timer_ms: f64,
}

impl FlickeringStimulus {
    /// Create a visible stimulus centred at `center` (screen pixels)
    #[must_use]
    pub fn new(target: StimulusTarget, center: (f32, f32)) -> Self {
        Self { target, center, size: STIMULUS_SIZE, visible: true, timer_ms: 0.0 }
    }

    /// Advance by one frame of `dt_ms` milliseconds
    pub fn update(&mut self, dt_ms: f64) {
        self.timer_ms += dt_ms;
        if self.timer_ms >= self.target.toggle_interval_ms() {
            self.visible = !self.visible;
            self.timer_ms = 0.0;
        }
    }

    /// Whether the shape is drawn this frame
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Target this stimulus represents
    #[must_use]
    pub fn target(&self) -> &StimulusTarget {
        &self.target
    }

    /// Centre in screen pixels
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        self.center
    }

    /// Bounding size in pixels
    #[must_use]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Outline vertices in screen pixels.
    ///
    /// Circles return their four extreme points; renderers draw them with a
    /// native circle primitive using [`FlickeringStimulus::size`].
    #[must_use]
    pub fn outline(&self) -> Vec<(f32, f32)> {
        let (x, y) = self.center;
        let h = self.size / 2.0;
        match self.target.shape {
            StimulusShape::Square => vec![(x - h, y - h), (x + h, y - h), (x + h, y + h), (x - h, y + h)],
            StimulusShape::Triangle => vec![(x, y - h), (x - h, y + h), (x + h, y + h)],
            StimulusShape::Circle | StimulusShape::Diamond => {
                vec![(x, y - h), (x + h, y), (x, y + h), (x - h, y)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggles_at_half_period() {
        // 10 Hz toggles every 100 ms
        let target = StimulusTarget::default_set()[1];
        let mut stim = FlickeringStimulus::new(target, (0.0, 0.0));
        assert!(stim.is_visible());

        stim.update(60.0);
        assert!(stim.is_visible());
        stim.update(40.0);
        assert!(!stim.is_visible());

        // Timer restarted at zero, overshoot is discarded
        stim.update(99.0);
        assert!(!stim.is_visible());
        stim.update(1.0);
        assert!(stim.is_visible());
    }

    #[test]
    fn test_frame_quantised_flicker() {
        // 20 Hz at ~60 fps: 50 ms interval reached every 4th 16 ms frame
        let target = StimulusTarget::default_set()[3];
        let mut stim = FlickeringStimulus::new(target, (0.0, 0.0));
        let mut toggles = 0;
        let mut last = stim.is_visible();
        for _ in 0..60 {
            stim.update(16.0);
            if stim.is_visible() != last {
                toggles += 1;
                last = stim.is_visible();
            }
        }
        assert_eq!(toggles, 15);
    }

    #[test]
    fn test_outline() {
        let target = StimulusTarget::default_set()[2];
        let stim = FlickeringStimulus::new(target, (400.0, 550.0));
        assert_eq!(stim.outline(), vec![(400.0, 510.0), (360.0, 590.0), (440.0, 590.0)]);
    }
}
