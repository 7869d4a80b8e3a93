//! Per-frame pose state and the smoothing helper every motion subsystem
//! uses.

use crate::rig::asset::Euler;

/// Exponential smoothing: move `current` toward `target` by a fixed
/// fraction. Each call-site picks its own factor so every channel settles
/// at its own speed.
pub fn blend(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// The mutable pose the controllers write and the session commits.
/// Per-joint euler offsets plus the scalar mouth state. Owned by
/// `AvatarSession`, mutated only inside the frame tick, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Pose {
    pub root_yaw: f32,
    pub head: Euler,
    pub neck: Euler,
    pub spine: Euler,
    pub left_arm: Euler,
    pub right_arm: Euler,
    pub left_fore_arm: Euler,
    pub right_fore_arm: Euler,
    pub left_hand: Euler,
    pub right_hand: Euler,
    pub left_eye: Euler,
    pub right_eye: Euler,
    /// Blink intensity, written directly each frame (not blended).
    pub blink: f32,
    /// Current mouth openness in [0, 1].
    pub mouth_open: f32,
    /// Where the mouth is heading; beats push it up, decay pulls it down.
    pub mouth_target: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn blend_never_overshoots(current in -10.0f32..10.0, target in -10.0f32..10.0, factor in 0.0f32..=1.0) {
            let next = blend(current, target, factor);
            prop_assert!((next - target).abs() <= (current - target).abs() + 1e-5);
        }

        #[test]
        fn blend_moves_toward_target(current in -10.0f32..10.0, target in -10.0f32..10.0, factor in 0.01f32..=1.0) {
            let next = blend(current, target, factor);
            if (current - target).abs() > 1e-3 {
                prop_assert!((next - target).abs() < (current - target).abs());
            }
        }
    }

    #[test]
    fn blend_with_zero_factor_is_identity() {
        assert_eq!(blend(0.4, 1.0, 0.0), 0.4);
    }

    #[test]
    fn blend_with_unit_factor_snaps_to_target() {
        assert!((blend(0.4, 1.0, 1.0) - 1.0).abs() < 1e-6);
    }
}
