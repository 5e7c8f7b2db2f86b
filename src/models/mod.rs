use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Which generation path a run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    SingleComposite,
    MultiPose,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::SingleComposite => "single_composite",
            GenerationMode::MultiPose => "multi_pose",
        }
    }

    /// Number of requests a run in this mode dispatches.
    pub fn fan_out(&self) -> usize {
        match self {
            GenerationMode::SingleComposite => 1,
            GenerationMode::MultiPose => crate::capabilities::POSE_CATALOG.len(),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Try-on sub-mode: whether a Dupatta is part of the outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryOnKind {
    TwoPiece,
    #[default]
    ThreePiece,
}

impl TryOnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TryOnKind::TwoPiece => "two_piece",
            TryOnKind::ThreePiece => "three_piece",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TryOnKind::TwoPiece => "2-piece",
            TryOnKind::ThreePiece => "3-piece",
        }
    }

    pub fn includes_dupatta(&self) -> bool {
        matches!(self, TryOnKind::ThreePiece)
    }
}

impl fmt::Display for TryOnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarmentSlot {
    Kameez,
    Dupatta,
    Trouser,
    ModelReference,
}

impl GarmentSlot {
    pub const ALL: [GarmentSlot; 4] = [
        GarmentSlot::Kameez,
        GarmentSlot::Dupatta,
        GarmentSlot::Trouser,
        GarmentSlot::ModelReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentSlot::Kameez => "kameez",
            GarmentSlot::Dupatta => "dupatta",
            GarmentSlot::Trouser => "trouser",
            GarmentSlot::ModelReference => "model_reference",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GarmentSlot::Kameez => "Kameez",
            GarmentSlot::Dupatta => "Dupatta",
            GarmentSlot::Trouser => "Trouser",
            GarmentSlot::ModelReference => "Model Reference",
        }
    }
}

impl fmt::Display for GarmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded image ready for transport. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: String,
    media_type: String,
}

impl EncodedImage {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// The four upload slots of a session. Each holds at most one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GarmentSlots {
    kameez: Option<EncodedImage>,
    dupatta: Option<EncodedImage>,
    trouser: Option<EncodedImage>,
    model_reference: Option<EncodedImage>,
}

impl GarmentSlots {
    pub fn get(&self, slot: GarmentSlot) -> Option<&EncodedImage> {
        self.slot_ref(slot).as_ref()
    }

    pub fn is_set(&self, slot: GarmentSlot) -> bool {
        self.get(slot).is_some()
    }

    pub fn set(&mut self, slot: GarmentSlot, image: EncodedImage) {
        *self.slot_mut(slot) = Some(image);
    }

    pub fn clear(&mut self, slot: GarmentSlot) -> Option<EncodedImage> {
        self.slot_mut(slot).take()
    }

    fn slot_ref(&self, slot: GarmentSlot) -> &Option<EncodedImage> {
        match slot {
            GarmentSlot::Kameez => &self.kameez,
            GarmentSlot::Dupatta => &self.dupatta,
            GarmentSlot::Trouser => &self.trouser,
            GarmentSlot::ModelReference => &self.model_reference,
        }
    }

    fn slot_mut(&mut self, slot: GarmentSlot) -> &mut Option<EncodedImage> {
        match slot {
            GarmentSlot::Kameez => &mut self.kameez,
            GarmentSlot::Dupatta => &mut self.dupatta,
            GarmentSlot::Trouser => &mut self.trouser,
            GarmentSlot::ModelReference => &mut self.model_reference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Story => "9:16",
            AspectRatio::Widescreen => "16:9",
        }
    }

    pub fn orientation(&self) -> &'static str {
        match self {
            AspectRatio::Square => "square",
            AspectRatio::Portrait | AspectRatio::Story => "portrait",
            AspectRatio::Landscape | AspectRatio::Widescreen => "landscape",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "3:4" => Ok(AspectRatio::Portrait),
            "4:3" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Story),
            "16:9" => Ok(AspectRatio::Widescreen),
            other => Err(AppError::unsupported(format!(
                "aspect ratio {other:?} (expected one of 1:1, 3:4, 4:3, 9:16, 16:9)"
            ))),
        }
    }
}

/// One instruction fragment sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Image(EncodedImage),
}

/// A single outbound call. Built fresh for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub title: String,
    pub fragments: Vec<Fragment>,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// All text fragments joined in order, without the image payloads.
    pub fn instruction_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Text(text) => Some(text.as_str()),
                Fragment::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.fragments
            .iter()
            .filter(|fragment| matches!(fragment, Fragment::Image(_)))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success { title: String, image_url: String },
    Failure { title: String, reason: String },
}

impl GenerationOutcome {
    pub fn title(&self) -> &str {
        match self {
            GenerationOutcome::Success { title, .. } | GenerationOutcome::Failure { title, .. } => {
                title
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Success { image_url, .. } => Some(image_url),
            GenerationOutcome::Failure { .. } => None,
        }
    }
}

/// Outcomes of one run, indexed by submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    mode: GenerationMode,
    outcomes: Vec<GenerationOutcome>,
}

impl ResultSet {
    pub fn new(mode: GenerationMode, outcomes: Vec<GenerationOutcome>) -> Self {
        Self { mode, outcomes }
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn get(&self, index: usize) -> Option<&GenerationOutcome> {
        self.outcomes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationOutcome> {
        self.outcomes.iter()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn all_failed(&self) -> bool {
        self.success_count() == 0
    }
}
