//! Speech-driven motion — mouth openness from synthesis boundary events
//! and gesture bursts while the character is talking.
//!
//! The controller is a small state machine driven by explicit
//! `SynthesisEvent` transitions, so it can be exercised without a real
//! speech engine.

use crate::anim::pose::{blend, Pose};
use crate::speech::SynthesisEvent;

const MOUTH_BEAT_BASE: f32 = 0.6;
const MOUTH_BEAT_JITTER: f32 = 0.3;
const MOUTH_SMOOTHING: f32 = 0.25;
/// Inter-boundary decay cadence, folded into the frame tick via an
/// accumulator rather than a separate 50 ms timer.
const MOUTH_DECAY_INTERVAL: f32 = 0.05;
const MOUTH_DECAY: f32 = 0.85;

const GESTURE_MIN_DURATION: f32 = 0.8;
const GESTURE_EXTRA_DURATION: f32 = 0.8;
const GESTURE_MIN_STRENGTH: f32 = 0.2;
const GESTURE_EXTRA_STRENGTH: f32 = 0.4;
const GESTURE_ARM_SCALE: f32 = 0.25;
const GESTURE_FOREARM_SCALE: f32 = 0.35;
const GESTURE_HAND_SCALE: f32 = 0.2;
const GESTURE_ENGAGE_FACTOR: f32 = 0.25;
/// Slower than the engage factor so limbs visibly settle rather than snap.
const GESTURE_RELEASE_FACTOR: f32 = 0.15;

/// One gesture burst; active iff `timer > 0`. A new burst starts only
/// while speaking and after the previous one has fully run out.
#[derive(Debug, Clone, Default)]
pub struct GestureState {
    pub timer: f32,
    pub duration: f32,
    pub strength: f32,
}

#[derive(Debug, Default)]
pub struct SpeechMotion {
    speaking: bool,
    gesture: GestureState,
    decay_accum: f32,
}

impl SpeechMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    /// Apply a playback lifecycle transition.
    pub fn handle_event(&mut self, event: SynthesisEvent, pose: &mut Pose) {
        match event {
            SynthesisEvent::Started => {
                self.speaking = true;
                self.decay_accum = 0.0;
                pose.mouth_open = 0.0;
                pose.mouth_target = 0.0;
                Self::mouth_beat(pose); // initial kick
            }
            SynthesisEvent::Boundary => {
                if self.speaking {
                    Self::mouth_beat(pose);
                }
            }
            SynthesisEvent::Ended => {
                self.speaking = false;
                self.decay_accum = 0.0;
                // mouth itself settles through blending on later ticks
                pose.mouth_target = 0.0;
            }
        }
    }

    fn mouth_beat(pose: &mut Pose) {
        pose.mouth_target = (MOUTH_BEAT_BASE + rand::random::<f32>() * MOUTH_BEAT_JITTER).min(1.0);
    }

    /// Advance mouth and gesture motion by `dt`.
    pub fn update(&mut self, pose: &mut Pose, dt: f32) {
        // Decay the target between boundary events so the mouth does not
        // freeze open during pauses
        if self.speaking {
            self.decay_accum += dt;
            while self.decay_accum >= MOUTH_DECAY_INTERVAL {
                self.decay_accum -= MOUTH_DECAY_INTERVAL;
                pose.mouth_target *= MOUTH_DECAY;
            }
        }
        pose.mouth_open = blend(pose.mouth_open, pose.mouth_target, MOUTH_SMOOTHING).clamp(0.0, 1.0);

        if self.speaking && self.gesture.timer <= 0.0 {
            self.gesture.duration = GESTURE_MIN_DURATION + rand::random::<f32>() * GESTURE_EXTRA_DURATION;
            self.gesture.timer = self.gesture.duration;
            self.gesture.strength = GESTURE_MIN_STRENGTH + rand::random::<f32>() * GESTURE_EXTRA_STRENGTH;
        }

        if self.gesture.timer > 0.0 {
            self.gesture.timer -= dt;
            let phase = 1.0 - (self.gesture.timer / self.gesture.duration).clamp(0.0, 1.0);
            let s = (phase * std::f32::consts::PI).sin();
            let arm_pitch = -s * GESTURE_ARM_SCALE * self.gesture.strength;
            let forearm_pitch = -s * GESTURE_FOREARM_SCALE * self.gesture.strength;
            let hand_roll = s * GESTURE_HAND_SCALE * self.gesture.strength;
            pose.right_arm.x = blend(pose.right_arm.x, arm_pitch, GESTURE_ENGAGE_FACTOR);
            pose.right_fore_arm.x = blend(pose.right_fore_arm.x, forearm_pitch, GESTURE_ENGAGE_FACTOR);
            pose.right_hand.z = blend(pose.right_hand.z, hand_roll, GESTURE_ENGAGE_FACTOR);
        } else {
            pose.right_arm.x = blend(pose.right_arm.x, 0.0, GESTURE_RELEASE_FACTOR);
            pose.right_fore_arm.x = blend(pose.right_fore_arm.x, 0.0, GESTURE_RELEASE_FACTOR);
            pose.right_hand.z = blend(pose.right_hand.z, 0.0, GESTURE_RELEASE_FACTOR);
        }
    }
}
