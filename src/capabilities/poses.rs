/// One entry of the fixed multi-pose catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseSpec {
    pub title: &'static str,
    pub pose_instruction: &'static str,
}

pub const POSE_CATALOG: [PoseSpec; 5] = [
    PoseSpec {
        title: "Front Pose",
        pose_instruction: "Pose: full-body shot, standing straight and facing the camera directly, arms relaxed at the sides, weight evenly balanced.",
    },
    PoseSpec {
        title: "Side Pose",
        pose_instruction: "Pose: full-body shot in profile, the model turned 90 degrees to the left, head facing forward along the body line, posture upright.",
    },
    PoseSpec {
        title: "Close-up Pose",
        pose_instruction: "Pose: close-up portrait from the chest up, facing the camera with a soft smile, showing the neckline and fabric texture in detail.",
    },
    PoseSpec {
        title: "Three-Quarter Pose",
        pose_instruction: "Pose: full-body shot turned three-quarters towards the camera, one hand resting lightly at the waist, the other relaxed.",
    },
    PoseSpec {
        title: "Back Pose",
        pose_instruction: "Pose: full-body shot from behind, the model facing away from the camera, head turned slightly over the shoulder.",
    },
];
