use crate::{
    capabilities::poses::POSE_CATALOG,
    models::{
        AspectRatio, Fragment, GarmentSlot, GarmentSlots, GenerationMode, GenerationRequest,
        TryOnKind,
    },
};

pub const COMPOSITE_TITLE: &str = "Virtual Try-On";
pub const DEFAULT_MODEL_DESCRIPTION: &str = "a graceful South Asian female fashion model in her mid-twenties with a natural, confident expression";
pub const DEFAULT_BACKGROUND: &str =
    "a clean, softly lit photography studio with a seamless off-white backdrop";
pub const DEFAULT_OUTFIT_COLOR: &str = "#1F3A5F";
const MODEL_REFERENCE_DESCRIPTION: &str = "the person shown in the attached model reference image";
const QUALITY_DIRECTIVE: &str = "Quality: photorealistic, high resolution, sharp focus, true-to-life skin and fabric texture, professional fashion photography lighting.";

/// User-supplied inputs for one build. Blank free text counts as absent.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub kind: TryOnKind,
    pub slots: &'a GarmentSlots,
    pub model_description: Option<&'a str>,
    pub background: Option<&'a str>,
    pub outfit_color: Option<&'a str>,
    pub aspect_ratio: AspectRatio,
}

/// Turns session inputs into generation requests. Pure: no I/O, no randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(&self, mode: GenerationMode, inputs: &PromptInputs<'_>) -> Vec<GenerationRequest> {
        match mode {
            GenerationMode::SingleComposite => vec![self.single_composite(inputs)],
            GenerationMode::MultiPose => self.multi_pose(inputs),
        }
    }

    pub fn single_composite(&self, inputs: &PromptInputs<'_>) -> GenerationRequest {
        let slots = inputs.slots;
        let model = match non_blank(inputs.model_description) {
            Some(description) => description,
            None if slots.is_set(GarmentSlot::ModelReference) => MODEL_REFERENCE_DESCRIPTION,
            None => DEFAULT_MODEL_DESCRIPTION,
        };
        let background = non_blank(inputs.background).unwrap_or(DEFAULT_BACKGROUND);

        let mut fragments = vec![
            Fragment::Text(format!(
                "Create a photorealistic virtual try-on photograph of {model} wearing a {} shalwar kameez outfit made from the garments provided below.",
                inputs.kind.label()
            )),
            Fragment::Text(format!("Background: {background}.")),
            Fragment::Text(aspect_directive(inputs.aspect_ratio)),
            Fragment::Text(garment_clause(inputs.kind, slots)),
        ];

        for slot in attached_slots(inputs.kind) {
            if let Some(image) = slots.get(slot) {
                fragments.push(Fragment::Text(image_label(slot).to_string()));
                fragments.push(Fragment::Image(image.clone()));
            }
        }

        GenerationRequest {
            title: COMPOSITE_TITLE.to_string(),
            fragments,
            aspect_ratio: inputs.aspect_ratio,
        }
    }

    pub fn multi_pose(&self, inputs: &PromptInputs<'_>) -> Vec<GenerationRequest> {
        let base_block = multi_pose_base_block(inputs);

        POSE_CATALOG
            .iter()
            .map(|pose| GenerationRequest {
                title: pose.title.to_string(),
                fragments: vec![
                    Fragment::Text(base_block.clone()),
                    Fragment::Text(pose.pose_instruction.to_string()),
                ],
                aspect_ratio: inputs.aspect_ratio,
            })
            .collect()
    }
}

/// Shared across all five pose requests so the series stays consistent.
fn multi_pose_base_block(inputs: &PromptInputs<'_>) -> String {
    let model = non_blank(inputs.model_description).unwrap_or(DEFAULT_MODEL_DESCRIPTION);
    let background = non_blank(inputs.background).unwrap_or(DEFAULT_BACKGROUND);
    let color = non_blank(inputs.outfit_color).unwrap_or(DEFAULT_OUTFIT_COLOR);

    [
        format!("Generate a photorealistic fashion photograph of {model}."),
        "The same model must appear in every image of this series: keep the face, body shape, skin tone and hairstyle identical.".to_string(),
        format!("Background: {background}."),
        format!(
            "Outfit: a traditional shalwar kameez in the solid color {color}. The fabric must be completely plain with no embroidery, no prints and no patterns."
        ),
        QUALITY_DIRECTIVE.to_string(),
        aspect_directive(inputs.aspect_ratio),
    ]
    .join("\n")
}

fn aspect_directive(aspect_ratio: AspectRatio) -> String {
    format!(
        "Aspect ratio: {} ({} orientation). Compose the whole image for exactly this aspect ratio.",
        aspect_ratio.as_str(),
        aspect_ratio.orientation()
    )
}

fn garment_clause(kind: TryOnKind, slots: &GarmentSlots) -> String {
    let mut items = Vec::new();
    if slots.is_set(GarmentSlot::Kameez) {
        items.push("the Kameez shown in the attached image".to_string());
    }
    if kind.includes_dupatta() && slots.is_set(GarmentSlot::Dupatta) {
        items.push("the Dupatta shown in the attached image".to_string());
    }
    if slots.is_set(GarmentSlot::Trouser) {
        items.push("the Trouser shown in the attached image".to_string());
    } else {
        items.push("a matching Trouser".to_string());
    }

    format!(
        "The outfit consists of {}. Reproduce each attached garment exactly, keeping its color, fabric, embroidery and cut.",
        join_list(&items)
    )
}

fn attached_slots(kind: TryOnKind) -> Vec<GarmentSlot> {
    let mut order = vec![GarmentSlot::Kameez];
    if kind.includes_dupatta() {
        order.push(GarmentSlot::Dupatta);
    }
    order.push(GarmentSlot::Trouser);
    order.push(GarmentSlot::ModelReference);
    order
}

fn image_label(slot: GarmentSlot) -> &'static str {
    match slot {
        GarmentSlot::Kameez => "This is the Kameez:",
        GarmentSlot::Dupatta => "This is the Dupatta:",
        GarmentSlot::Trouser => "This is the Trouser:",
        GarmentSlot::ModelReference => "This is the model reference:",
    }
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;

    fn image(tag: &str) -> EncodedImage {
        EncodedImage::new(tag, "image/png")
    }

    fn inputs<'a>(kind: TryOnKind, slots: &'a GarmentSlots) -> PromptInputs<'a> {
        PromptInputs {
            kind,
            slots,
            model_description: None,
            background: None,
            outfit_color: None,
            aspect_ratio: AspectRatio::Portrait,
        }
    }

    fn image_tags(request: &GenerationRequest) -> Vec<&str> {
        request
            .fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Image(image) => Some(image.data()),
                Fragment::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn three_piece_without_model_image_uses_default_model_and_lists_all_garments() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));
        slots.set(GarmentSlot::Dupatta, image("D"));
        slots.set(GarmentSlot::Trouser, image("T"));

        let request = PromptBuilder.single_composite(&inputs(TryOnKind::ThreePiece, &slots));
        let text = request.instruction_text();

        assert!(text.contains(DEFAULT_MODEL_DESCRIPTION));
        assert!(text.contains("3-piece"));
        assert!(text.contains(
            "The outfit consists of the Kameez shown in the attached image, the Dupatta shown in the attached image, and the Trouser shown in the attached image."
        ));
        assert_eq!(image_tags(&request), vec!["K", "D", "T"]);
        assert_eq!(request.title, COMPOSITE_TITLE);
    }

    #[test]
    fn text_fragments_come_in_fixed_order_before_images() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));

        let request = PromptBuilder.single_composite(&inputs(TryOnKind::TwoPiece, &slots));
        let texts: Vec<_> = request
            .fragments
            .iter()
            .take(4)
            .map(|fragment| match fragment {
                Fragment::Text(text) => text.as_str(),
                Fragment::Image(_) => panic!("image before text block"),
            })
            .collect();

        assert!(texts[0].starts_with("Create a photorealistic virtual try-on"));
        assert!(texts[1].starts_with("Background: "));
        assert!(texts[2].starts_with("Aspect ratio: 3:4"));
        assert!(texts[3].starts_with("The outfit consists of"));
        assert_eq!(request.fragments[4], Fragment::Text("This is the Kameez:".into()));
        assert_eq!(request.fragments[5], Fragment::Image(image("K")));
    }

    #[test]
    fn missing_trouser_defaults_to_matching_trouser() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));

        let request = PromptBuilder.single_composite(&inputs(TryOnKind::TwoPiece, &slots));
        assert!(
            request
                .instruction_text()
                .contains("The outfit consists of the Kameez shown in the attached image and a matching Trouser.")
        );
    }

    #[test]
    fn two_piece_never_sends_a_populated_dupatta() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));
        slots.set(GarmentSlot::Dupatta, image("D"));
        slots.set(GarmentSlot::ModelReference, image("M"));

        let request = PromptBuilder.single_composite(&inputs(TryOnKind::TwoPiece, &slots));
        assert_eq!(image_tags(&request), vec!["K", "M"]);
        assert!(!request.instruction_text().contains("Dupatta"));
    }

    #[test]
    fn model_reference_replaces_default_description() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));
        slots.set(GarmentSlot::ModelReference, image("M"));

        let request = PromptBuilder.single_composite(&inputs(TryOnKind::TwoPiece, &slots));
        let text = request.instruction_text();
        assert!(text.contains(MODEL_REFERENCE_DESCRIPTION));
        assert!(!text.contains(DEFAULT_MODEL_DESCRIPTION));
        assert!(text.contains("This is the model reference:"));
    }

    #[test]
    fn user_text_is_echoed_verbatim() {
        let slots = GarmentSlots::default();
        let mut input = inputs(TryOnKind::ThreePiece, &slots);
        input.model_description = Some("  a tall model with short curly hair ");
        input.background = Some("a rooftop garden at dusk");

        let text = PromptBuilder.single_composite(&input).instruction_text();
        assert!(text.contains("of a tall model with short curly hair wearing"));
        assert!(text.contains("Background: a rooftop garden at dusk."));
    }

    #[test]
    fn builds_are_deterministic() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));
        slots.set(GarmentSlot::Trouser, image("T"));
        let input = inputs(TryOnKind::ThreePiece, &slots);

        for mode in [GenerationMode::SingleComposite, GenerationMode::MultiPose] {
            assert_eq!(PromptBuilder.build(mode, &input), PromptBuilder.build(mode, &input));
        }
    }

    #[test]
    fn multi_pose_shares_base_block_and_attaches_no_images() {
        let mut slots = GarmentSlots::default();
        slots.set(GarmentSlot::Kameez, image("K"));
        let mut input = inputs(TryOnKind::ThreePiece, &slots);
        input.outfit_color = Some("#8B0000");
        input.aspect_ratio = AspectRatio::Story;

        let requests = PromptBuilder.multi_pose(&input);
        assert_eq!(requests.len(), 5);

        let base = &requests[0].fragments[0];
        for (request, pose) in requests.iter().zip(POSE_CATALOG.iter()) {
            assert_eq!(&request.fragments[0], base);
            assert_eq!(
                request.fragments[1],
                Fragment::Text(pose.pose_instruction.to_string())
            );
            assert_eq!(request.title, pose.title);
            assert_eq!(request.image_count(), 0);
            assert_eq!(request.aspect_ratio, AspectRatio::Story);
        }

        let text = requests[0].instruction_text();
        assert!(text.contains("solid color #8B0000"));
        assert!(text.contains("no embroidery, no prints and no patterns"));
        assert!(text.contains("Aspect ratio: 9:16"));
        assert_eq!(requests[2].title, "Close-up Pose");
    }

    #[test]
    fn multi_pose_color_defaults_when_blank() {
        let slots = GarmentSlots::default();
        let mut input = inputs(TryOnKind::TwoPiece, &slots);
        input.outfit_color = Some("   ");

        let text = PromptBuilder.multi_pose(&input)[0].instruction_text();
        assert!(text.contains(DEFAULT_OUTFIT_COLOR));
    }
}
