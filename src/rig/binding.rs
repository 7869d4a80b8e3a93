//! Rig detection — name-pattern lookup of animatable joints and morph
//! channels on a loaded asset.
//!
//! Asset skeletons are duck-typed: joint names vary per authoring tool, so
//! slots are matched by an ordered rule table of case-insensitive patterns.
//! One traversal, first match wins per slot, no backtracking. A slot that
//! matches nothing stays `None` and the dependent motion is skipped.

use regex::Regex;
use std::sync::OnceLock;

use crate::rig::asset::{AssetScene, JointHandle, MorphHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JointSlot {
    Jaw,
    Head,
    Neck,
    Spine,
    LeftArm,
    RightArm,
    LeftForeArm,
    RightForeArm,
    LeftHand,
    RightHand,
    LeftEye,
    RightEye,
}

/// Ordered rule table: a joint fills the first unfilled slot whose pattern
/// matches its name. Side prefixes must sit at a name-segment boundary so
/// the `r` inside "ForeArm" cannot claim a right-side slot. Forearm rules
/// come after arm rules; parents are expected before children in the
/// arena, as loaders emit them.
const JOINT_RULES: &[(JointSlot, &str)] = &[
    (JointSlot::Jaw, r"jaw|mouth"),
    (JointSlot::Head, r"head"),
    (JointSlot::Neck, r"neck"),
    (JointSlot::Spine, r"spine|chest"),
    (JointSlot::LeftArm, r"(^|[^a-z])(left|l).*arm"),
    (JointSlot::RightArm, r"(^|[^a-z])(right|r).*arm"),
    (JointSlot::LeftForeArm, r"(^|[^a-z])(left|l).*(forearm|lowerarm)"),
    (JointSlot::RightForeArm, r"(^|[^a-z])(right|r).*(forearm|lowerarm)"),
    (JointSlot::LeftHand, r"(^|[^a-z])(left|l).*hand"),
    (JointSlot::RightHand, r"(^|[^a-z])(right|r).*hand"),
    (JointSlot::LeftEye, r"(^|[^a-z])(left|l).*(eye|eyeball)"),
    (JointSlot::RightEye, r"(^|[^a-z])(right|r).*(eye|eyeball)"),
];

const BLINK_LEFT_CHANNELS: &[&str] = &[
    "eyeBlinkLeft",
    "Blink_L",
    "blink_L",
    "blinkLeft",
    "EyeBlink_L",
];
const BLINK_RIGHT_CHANNELS: &[&str] = &[
    "eyeBlinkRight",
    "Blink_R",
    "blink_R",
    "blinkRight",
    "EyeBlink_R",
];
/// Shared last-resort channel driving both eyelids.
const BLINK_SHARED_CHANNEL: &str = "blink";

/// Mouth-open morph channels in priority order; substitutes for jaw
/// rotation when the skeleton has no jaw joint.
const MOUTH_CHANNELS: &[&str] = &[
    "jawOpen",
    "mouthOpen",
    "MouthOpen",
    "viseme_aa",
    "viseme_OW",
    "viseme_U",
    "A",
    "O",
    "U",
];

fn joint_rules() -> &'static Vec<(JointSlot, Regex)> {
    static RULES: OnceLock<Vec<(JointSlot, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        JOINT_RULES
            .iter()
            .map(|(slot, pattern)| {
                let re = Regex::new(&format!("(?i){}", pattern))
                    .expect("rig rule patterns are static and valid");
                (*slot, re)
            })
            .collect()
    })
}

/// Resolved animation targets. Every field is either bound or explicitly
/// absent; binding never fails.
#[derive(Debug, Clone, Default)]
pub struct RigHandles {
    pub jaw: Option<JointHandle>,
    pub head: Option<JointHandle>,
    pub neck: Option<JointHandle>,
    pub spine: Option<JointHandle>,
    pub left_arm: Option<JointHandle>,
    pub right_arm: Option<JointHandle>,
    pub left_fore_arm: Option<JointHandle>,
    pub right_fore_arm: Option<JointHandle>,
    pub left_hand: Option<JointHandle>,
    pub right_hand: Option<JointHandle>,
    pub left_eye: Option<JointHandle>,
    pub right_eye: Option<JointHandle>,
    /// Mouth-open morph channel, used when `jaw` is absent.
    pub mouth_shape: Option<MorphHandle>,
    pub blink_left: Option<MorphHandle>,
    pub blink_right: Option<MorphHandle>,
}

impl RigHandles {
    fn slot_mut(&mut self, slot: JointSlot) -> &mut Option<JointHandle> {
        match slot {
            JointSlot::Jaw => &mut self.jaw,
            JointSlot::Head => &mut self.head,
            JointSlot::Neck => &mut self.neck,
            JointSlot::Spine => &mut self.spine,
            JointSlot::LeftArm => &mut self.left_arm,
            JointSlot::RightArm => &mut self.right_arm,
            JointSlot::LeftForeArm => &mut self.left_fore_arm,
            JointSlot::RightForeArm => &mut self.right_fore_arm,
            JointSlot::LeftHand => &mut self.left_hand,
            JointSlot::RightHand => &mut self.right_hand,
            JointSlot::LeftEye => &mut self.left_eye,
            JointSlot::RightEye => &mut self.right_eye,
        }
    }
}

/// Populate `RigHandles` from a loaded scene in a single traversal.
pub fn bind(scene: &AssetScene) -> RigHandles {
    let mut handles = RigHandles::default();

    for (index, joint) in scene.joints.iter().enumerate() {
        for (slot, pattern) in joint_rules() {
            let target = handles.slot_mut(*slot);
            if target.is_none() && pattern.is_match(&joint.name) {
                *target = Some(JointHandle(index));
                break; // a joint fills at most one slot
            }
        }
    }

    for (mesh_index, mesh) in scene.meshes.iter().enumerate() {
        if handles.mouth_shape.is_none() {
            for name in MOUTH_CHANNELS {
                if let Some(channel) = mesh.channel_index(name) {
                    handles.mouth_shape = Some(MorphHandle {
                        mesh: mesh_index,
                        channel,
                    });
                    break;
                }
            }
        }
        if handles.blink_left.is_none() {
            for name in BLINK_LEFT_CHANNELS {
                if let Some(channel) = mesh.channel_index(name) {
                    handles.blink_left = Some(MorphHandle {
                        mesh: mesh_index,
                        channel,
                    });
                    break;
                }
            }
        }
        if handles.blink_right.is_none() {
            for name in BLINK_RIGHT_CHANNELS {
                if let Some(channel) = mesh.channel_index(name) {
                    handles.blink_right = Some(MorphHandle {
                        mesh: mesh_index,
                        channel,
                    });
                    break;
                }
            }
        }
        // Single "blink" channel drives both sides if nothing better matched
        if let Some(channel) = mesh.channel_index(BLINK_SHARED_CHANNEL) {
            let shared = MorphHandle {
                mesh: mesh_index,
                channel,
            };
            if handles.blink_left.is_none() {
                handles.blink_left = Some(shared);
            }
            if handles.blink_right.is_none() {
                handles.blink_right = Some(shared);
            }
        }
    }

    handles
}
