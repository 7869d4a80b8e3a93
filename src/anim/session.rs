//! The per-frame driver. Owns the pose and the asset-load state machine,
//! advances simulated time, runs the idle and speech controllers in order
//! and commits the result to the rig.
//!
//! Nothing in here may panic or return an error: a failure anywhere in the
//! animation layer must never stop the tick loop.

use crate::anim::idle::IdleMotion;
use crate::anim::pose::Pose;
use crate::anim::speech::SpeechMotion;
use crate::rig::asset::AssetScene;
use crate::rig::binding::{self, RigHandles};
use crate::speech::SynthesisEvent;

const JAW_BASE_ANGLE: f32 = -0.02;
const JAW_OPEN_RANGE: f32 = 0.3;

/// `Loading → {Loaded, LoadFailed}`, one-shot, no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarState {
    Loading,
    Loaded,
    LoadFailed,
}

/// One avatar session: created when the page/process starts, ticked every
/// display frame for the rest of its life.
pub struct AvatarSession {
    state: AvatarState,
    scene: Option<AssetScene>,
    rig: RigHandles,
    pose: Pose,
    idle: IdleMotion,
    speech: SpeechMotion,
    elapsed: f64,
}

impl Default for AvatarSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarSession {
    pub fn new() -> Self {
        Self {
            state: AvatarState::Loading,
            scene: None,
            rig: RigHandles::default(),
            pose: Pose::default(),
            idle: IdleMotion::new(),
            speech: SpeechMotion::new(),
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> AvatarState {
        self.state
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn rig(&self) -> &RigHandles {
        &self.rig
    }

    pub fn scene(&self) -> Option<&AssetScene> {
        self.scene.as_ref()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The external loader finished: bind the rig and arm blinking.
    pub fn asset_loaded(&mut self, scene: AssetScene) {
        if self.state != AvatarState::Loading {
            tracing::warn!("[Avatar] asset_loaded ignored in state {:?}", self.state);
            return;
        }
        self.rig = binding::bind(&scene);
        self.scene = Some(scene);
        self.idle.arm_blinks(self.elapsed);
        self.state = AvatarState::Loaded;
    }

    /// The external loader failed: substitute the primitive placeholder.
    /// Terminal for this session — there is no retry path.
    pub fn asset_failed(&mut self, error: &str) {
        if self.state != AvatarState::Loading {
            tracing::warn!("[Avatar] asset_failed ignored in state {:?}", self.state);
            return;
        }
        tracing::warn!("[Avatar] asset load failed, using placeholder: {}", error);
        self.scene = Some(AssetScene::placeholder());
        self.rig = RigHandles::default();
        self.state = AvatarState::LoadFailed;
    }

    /// Forward a synthesis lifecycle event to the speech controller.
    pub fn speech_event(&mut self, event: SynthesisEvent) {
        self.speech.handle_event(event, &mut self.pose);
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    /// One display frame. Idle runs before speech so speech-driven motion
    /// wins within the same frame.
    pub fn tick(&mut self, dt: f32) {
        if self.state == AvatarState::Loading {
            return;
        }
        self.elapsed += dt as f64;
        self.idle.update(&mut self.pose, dt, self.elapsed);
        self.speech.update(&mut self.pose, dt);
        self.commit();
    }

    /// Write the pose into whatever rig channels exist. Absent handles are
    /// skipped; on the placeholder only the root transform is written.
    fn commit(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let pose = &self.pose;
        let rig = &self.rig;

        scene.root_rotation.y = pose.root_yaw;

        if let Some(handle) = rig.head {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = pose.head.x;
                joint.rotation.y = pose.head.y;
            }
        }
        if let Some(handle) = rig.left_eye {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = pose.left_eye.x;
                joint.rotation.y = pose.left_eye.y;
            }
        }
        if let Some(handle) = rig.right_eye {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = pose.right_eye.x;
                joint.rotation.y = pose.right_eye.y;
            }
        }
        if let Some(handle) = rig.right_arm {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = pose.right_arm.x;
            }
        }
        if let Some(handle) = rig.right_fore_arm {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = pose.right_fore_arm.x;
            }
        }
        if let Some(handle) = rig.right_hand {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.z = pose.right_hand.z;
            }
        }

        // Mouth: jaw rotation when the skeleton has one, otherwise the
        // detected mouth-open morph channel
        if let Some(handle) = rig.jaw {
            if let Some(joint) = scene.joint_mut(handle) {
                joint.rotation.x = JAW_BASE_ANGLE + pose.mouth_open * JAW_OPEN_RANGE;
            }
        } else if let Some(handle) = rig.mouth_shape {
            scene.set_morph_weight(handle, pose.mouth_open.clamp(0.0, 1.0));
        }

        // Blink is written directly, both sides
        let blink = pose.blink.clamp(0.0, 1.0);
        if let Some(handle) = rig.blink_left {
            scene.set_morph_weight(handle, blink);
        }
        if let Some(handle) = rig.blink_right {
            scene.set_morph_weight(handle, blink);
        }
    }
}
