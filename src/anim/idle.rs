//! Idle motion — continuous sway, head micro-motion, eye saccades and
//! periodic blinking while the avatar is otherwise at rest.
//!
//! Every behavior is independent and additive; a missing rig handle only
//! means the corresponding pose channel is never committed. Timers run on
//! the session's simulated clock, not wall time.

use crate::anim::pose::{blend, Pose};

const SWAY_FREQ: f64 = 0.25;
const SWAY_AMPLITUDE: f32 = 0.08;

const HEAD_YAW_FREQ: f64 = 0.35;
const HEAD_YAW_AMPLITUDE: f32 = 0.08;
const HEAD_PITCH_FREQ: f64 = 0.27;
const HEAD_PITCH_AMPLITUDE: f32 = 0.05;
const HEAD_FACTOR: f32 = 0.1;

const EYE_FACTOR: f32 = 0.2;
const SACCADE_RANGE_X: f32 = 0.12;
const SACCADE_RANGE_Y: f32 = 0.09;
const SACCADE_MIN_INTERVAL: f32 = 0.7;
const SACCADE_EXTRA_INTERVAL: f32 = 1.8;

pub const BLINK_DURATION: f32 = 0.12;
const BLINK_MIN_GAP: f64 = 1.5;
const BLINK_EXTRA_GAP: f64 = 3.5;

/// Randomized gaze target, redrawn every 0.7–2.5 s.
#[derive(Debug, Clone, Default)]
pub struct SaccadeState {
    pub offset_x: f32,
    pub offset_y: f32,
    pub timer: f32,
}

/// One blink in flight at a time: `timer > 0` means a blink is running and
/// the next one cannot start until it has finished.
#[derive(Debug, Clone, Default)]
pub struct BlinkState {
    pub timer: f32,
    pub next_blink_at: f64,
    armed: bool,
}

impl BlinkState {
    fn schedule_next(&mut self, now: f64) {
        self.next_blink_at = now + BLINK_MIN_GAP + rand::random::<f64>() * BLINK_EXTRA_GAP;
    }
}

/// Triangular envelope over the blink window: 0 at both ends, 1 at the
/// midpoint.
pub(crate) fn blink_envelope(remaining: f32, duration: f32) -> f32 {
    let n = (remaining / duration).clamp(0.0, 1.0);
    1.0 - (2.0 * n - 1.0).abs()
}

#[derive(Debug, Clone, Default)]
pub struct IdleMotion {
    pub saccade: SaccadeState,
    pub blink: BlinkState,
}

impl IdleMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm blink scheduling; called once when the asset has loaded.
    pub fn arm_blinks(&mut self, now: f64) {
        self.blink.armed = true;
        self.blink.schedule_next(now);
    }

    /// Advance all idle behaviors by `dt` at absolute time `t`.
    pub fn update(&mut self, pose: &mut Pose, dt: f32, t: f64) {
        // Body sway is a pure function of elapsed time, written directly
        pose.root_yaw = ((t * SWAY_FREQ).sin() as f32) * SWAY_AMPLITUDE;

        // Head micro-motion
        let head_yaw = ((t * HEAD_YAW_FREQ).sin() as f32) * HEAD_YAW_AMPLITUDE;
        let head_pitch = ((t * HEAD_PITCH_FREQ).sin() as f32) * HEAD_PITCH_AMPLITUDE;
        pose.head.y = blend(pose.head.y, head_yaw, HEAD_FACTOR);
        pose.head.x = blend(pose.head.x, head_pitch, HEAD_FACTOR);

        // Eye saccades
        self.saccade.timer -= dt;
        if self.saccade.timer <= 0.0 {
            self.saccade.offset_x = (rand::random::<f32>() - 0.5) * (2.0 * SACCADE_RANGE_X);
            self.saccade.offset_y = (rand::random::<f32>() - 0.5) * (2.0 * SACCADE_RANGE_Y);
            self.saccade.timer = SACCADE_MIN_INTERVAL + rand::random::<f32>() * SACCADE_EXTRA_INTERVAL;
        }
        pose.left_eye.y = blend(pose.left_eye.y, self.saccade.offset_x, EYE_FACTOR);
        pose.left_eye.x = blend(pose.left_eye.x, self.saccade.offset_y, EYE_FACTOR);
        pose.right_eye.y = blend(pose.right_eye.y, self.saccade.offset_x, EYE_FACTOR);
        pose.right_eye.x = blend(pose.right_eye.x, self.saccade.offset_y, EYE_FACTOR);

        // Blinking
        if self.blink.armed && t >= self.blink.next_blink_at && self.blink.timer <= 0.0 {
            self.blink.timer = BLINK_DURATION;
            self.blink.schedule_next(t);
        }
        let mut intensity = 0.0;
        if self.blink.timer > 0.0 {
            self.blink.timer -= dt;
            intensity = blink_envelope(self.blink.timer, BLINK_DURATION);
        }
        pose.blink = intensity;
    }
}
