#[non_exhaustive]
pub struct GenerationModel;

impl GenerationModel {
    pub const BACKGROUND_REMOVER: &'static str =
        "851-labs/background-remover:a029dff38972b5fda4ec5d75d7d1cd25aeff621d2cf4946a41055d7db66b80bc";
    pub const TEXT_TO_IMAGE: &'static str = "black-forest-labs/flux-schnell";
    pub const STYLE_SINGLE: &'static str = "black-forest-labs/flux-kontext-pro";
    pub const STYLE_DUAL: &'static str = "flux-kontext-apps/multi-image-kontext-pro";
    pub const TATTOO_COMPOSITE: &'static str = "flux-kontext-apps/multi-image-kontext-max";
    pub const REFERENCE_GENERATION: &'static str = "google/nano-banana";
}
