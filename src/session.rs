use serde_json::{Value, json};

use crate::{
    capabilities::{PromptBuilder, PromptInputs},
    errors::{AppError, Result},
    events::InputField,
    models::{
        AspectRatio, EncodedImage, GarmentSlot, GarmentSlots, GenerationMode, GenerationRequest,
        ResultSet, TryOnKind,
    },
};

/// Where the session is in the generate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Settled,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Settled => "settled",
        }
    }
}

/// Everything the user has chosen in the application view.
///
/// Only one run may be in flight. `begin_run` flips the phase to `Running` and
/// every mutator refuses with `Busy` until `finish_run` or `abort_run`.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    mode: GenerationMode,
    kind: TryOnKind,
    slots: GarmentSlots,
    model_description: Option<String>,
    background: Option<String>,
    outfit_color: Option<String>,
    aspect_ratio: AspectRatio,
    results: Option<ResultSet>,
    phase: RunPhase,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &GarmentSlots {
        &self.slots
    }

    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Returns whether the mode actually changed. A change drops the
    /// displayed results but keeps every uploaded image.
    pub fn set_mode(&mut self, mode: GenerationMode) -> Result<bool> {
        self.ensure_not_running()?;
        if self.mode == mode {
            return Ok(false);
        }
        self.mode = mode;
        self.reset_results();
        Ok(true)
    }

    pub fn set_kind(&mut self, kind: TryOnKind) -> Result<bool> {
        self.ensure_not_running()?;
        if self.kind == kind {
            return Ok(false);
        }
        self.kind = kind;
        self.reset_results();
        Ok(true)
    }

    pub fn set_slot(&mut self, slot: GarmentSlot, image: EncodedImage) -> Result<()> {
        self.ensure_not_running()?;
        self.slots.set(slot, image);
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: GarmentSlot) -> Result<bool> {
        self.ensure_not_running()?;
        Ok(self.slots.clear(slot).is_some())
    }

    pub fn set_input(&mut self, field: InputField, value: &str) -> Result<()> {
        self.ensure_not_running()?;
        let trimmed = value.trim();
        let text = (!trimmed.is_empty()).then(|| trimmed.to_string());

        match field {
            InputField::ModelDescription => self.model_description = text,
            InputField::Background => self.background = text,
            InputField::OutfitColor => self.outfit_color = text,
            InputField::AspectRatio => {
                self.aspect_ratio = match text {
                    Some(text) => text.parse()?,
                    None => AspectRatio::default(),
                }
            }
        }
        Ok(())
    }

    /// Slots that still have to be filled before generation is allowed.
    pub fn missing_requirements(&self) -> Vec<GarmentSlot> {
        let required: &[GarmentSlot] = match (self.mode, self.kind) {
            (GenerationMode::MultiPose, _) => &[],
            (GenerationMode::SingleComposite, TryOnKind::TwoPiece) => &[GarmentSlot::Kameez],
            (GenerationMode::SingleComposite, TryOnKind::ThreePiece) => {
                &[GarmentSlot::Kameez, GarmentSlot::Dupatta]
            }
        };

        required
            .iter()
            .copied()
            .filter(|slot| !self.slots.is_set(*slot))
            .collect()
    }

    pub fn can_generate(&self) -> bool {
        self.phase != RunPhase::Running && self.missing_requirements().is_empty()
    }

    pub fn prompt_inputs(&self) -> PromptInputs<'_> {
        PromptInputs {
            kind: self.kind,
            slots: &self.slots,
            model_description: self.model_description.as_deref(),
            background: self.background.as_deref(),
            outfit_color: self.outfit_color.as_deref(),
            aspect_ratio: self.aspect_ratio,
        }
    }

    /// Checks enablement, builds the requests and marks the session running.
    pub fn begin_run(&mut self) -> Result<(GenerationMode, Vec<GenerationRequest>)> {
        self.ensure_not_running()?;

        let missing = self.missing_requirements();
        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(|slot| slot.label())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::not_permitted(format!(
                "upload {names} before generating"
            )));
        }

        let requests = PromptBuilder.build(self.mode, &self.prompt_inputs());
        self.phase = RunPhase::Running;
        Ok((self.mode, requests))
    }

    /// Replaces the previous results with the new set.
    pub fn finish_run(&mut self, results: ResultSet) {
        self.results = Some(results);
        self.phase = RunPhase::Settled;
    }

    /// Ends a run that never got dispatched. Earlier results stay visible.
    pub fn abort_run(&mut self) {
        self.phase = if self.results.is_some() {
            RunPhase::Settled
        } else {
            RunPhase::Idle
        };
    }

    pub fn status_payload(&self) -> Value {
        json!({
            "mode": self.mode.as_str(),
            "kind": self.kind.as_str(),
            "phase": self.phase.as_str(),
            "slots": GarmentSlot::ALL
                .iter()
                .map(|slot| json!({
                    "slot": slot.as_str(),
                    "populated": self.slots.is_set(*slot),
                    "sent": self.slot_is_sent(*slot),
                }))
                .collect::<Vec<_>>(),
            "inputs": {
                "model_description": self.model_description,
                "background": self.background,
                "outfit_color": self.outfit_color,
                "aspect_ratio": self.aspect_ratio.as_str(),
            },
            "can_generate": self.can_generate(),
            "missing": self
                .missing_requirements()
                .iter()
                .map(|slot| slot.as_str())
                .collect::<Vec<_>>(),
            "results": self.results.as_ref().map(|results| results.len()).unwrap_or(0),
        })
    }

    fn slot_is_sent(&self, slot: GarmentSlot) -> bool {
        self.mode == GenerationMode::SingleComposite
            && self.slots.is_set(slot)
            && (slot != GarmentSlot::Dupatta || self.kind.includes_dupatta())
    }

    fn reset_results(&mut self) {
        self.results = None;
        self.phase = RunPhase::Idle;
    }

    fn ensure_not_running(&self) -> Result<()> {
        if self.phase == RunPhase::Running {
            Err(AppError::Busy)
        } else {
            Ok(())
        }
    }
}
