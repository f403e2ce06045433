use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LeonardoGenerationRequest {
    pub prompt: String,
    #[serde(rename = "modelId")]
    pub model_id: String,
    pub height: u32,
    pub width: u32,
    pub num_images: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: u32,
    #[serde(rename = "presetStyle")]
    pub preset_style: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeonardoGenerationResponse {
    #[serde(rename = "sdGenerationJob")]
    pub sd_generation_job: Option<SdGenerationJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SdGenerationJob {
    #[serde(rename = "generationId")]
    pub generation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeonardoStatusResponse {
    pub generations_by_pk: Option<LeonardoGeneration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeonardoGeneration {
    pub status: String,
    #[serde(default)]
    pub generated_images: Vec<LeonardoImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeonardoImage {
    pub url: Option<String>,
}

impl LeonardoGenerationResponse {
    pub fn generation_id(&self) -> Option<&str> {
        self.sd_generation_job
            .as_ref()
            .and_then(|job| job.generation_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

impl LeonardoGeneration {
    pub fn first_image_url(&self) -> Option<&str> {
        self.generated_images
            .first()
            .and_then(|image| image.url.as_deref())
    }
}
