use anyhow::{Context, Result, anyhow};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use hf_hub::{Repo, RepoType, api::sync::Api};
use image::{ImageReader, RgbImage, imageops::FilterType};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::EmotionClassifier;
use crate::constants::EMOTION_COUNT;
use crate::emotion::{Emotion, EmotionScores};

const IMAGE_SIZE: usize = 224;

// ViT image processors for these checkpoints normalize every channel with
// mean=0.5, std=0.5
const PIXEL_MEAN: f32 = 0.5;
const PIXEL_STD: f32 = 0.5;

#[derive(Deserialize)]
struct LabelConfig {
    id2label: HashMap<String, String>,
}

/// Facial expression classifier using a ViT checkpoint from the Hugging Face hub.
/// The checkpoint's `id2label` table must cover all eight emotions.
pub struct VitClassifier {
    model: Mutex<vit::Model>,
    device: Device,
    /// Model class index -> emotion slot; classes we don't report are `None`
    classes: Vec<Option<Emotion>>,
}

impl VitClassifier {
    pub fn new(model_repo: &str) -> Result<Self> {
        #[cfg(feature = "metal")]
        let device = Device::new_metal(0).unwrap_or(Device::Cpu);
        #[cfg(not(feature = "metal"))]
        let device = Device::Cpu;

        tracing::info!("[classifier] Loading {} on {:?}", model_repo, device);

        let api = Api::new()?;
        let repo = api.repo(Repo::new(model_repo.to_string(), RepoType::Model));

        let model_path = repo.get("model.safetensors")?;
        let config_path = repo.get("config.json")?;

        let raw_config = std::fs::read_to_string(config_path)?;
        let config: vit::Config = serde_json::from_str(&raw_config)?;
        let labels: LabelConfig =
            serde_json::from_str(&raw_config).context("model config has no id2label table")?;
        let classes = class_slots(&labels.id2label)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[model_path], DType::F32, &device)? };
        let model = vit::Model::new(&config, classes.len(), vb)?;

        tracing::info!(
            "[classifier] Model loaded with {} classes",
            classes.len()
        );

        Ok(Self {
            model: Mutex::new(model),
            device,
            classes,
        })
    }
}

impl EmotionClassifier for VitClassifier {
    fn classify(&self, image: &Path) -> Result<EmotionScores> {
        let rgb = ImageReader::open(image)?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("failed to decode {:?}", image))?
            .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle)
            .to_rgb8();

        let input = Tensor::from_vec(
            to_chw_normalized(&rgb),
            (1, 3, IMAGE_SIZE, IMAGE_SIZE),
            &self.device,
        )?;

        let logits = {
            let model = self.model.lock().map_err(|e| anyhow!("Lock error: {}", e))?;
            model.forward(&input)?
        };

        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let probs: Vec<f32> = probs.flatten_all()?.to_vec1()?;

        Ok(scores_from_probs(&self.classes, &probs))
    }
}

/// Map each model class onto an emotion slot. Fails if an emotion has no
/// class, so a mismatched checkpoint is caught at start-up rather than
/// producing zeroed slots.
fn class_slots(id2label: &HashMap<String, String>) -> Result<Vec<Option<Emotion>>> {
    let mut parsed = Vec::with_capacity(id2label.len());
    for (id, label) in id2label {
        let id: usize = id
            .parse()
            .with_context(|| format!("invalid class id {:?} in id2label", id))?;
        parsed.push((id, label));
    }

    let class_count = parsed.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut classes = vec![None; class_count];
    let mut covered = [false; EMOTION_COUNT];

    for (id, label) in parsed {
        match Emotion::from_label(label) {
            Some(emotion) if covered[emotion.index()] => {
                return Err(anyhow!("emotion {} mapped by more than one class", emotion));
            }
            Some(emotion) => {
                covered[emotion.index()] = true;
                classes[id] = Some(emotion);
            }
            None => tracing::warn!("[classifier] Ignoring model class {} ({})", id, label),
        }
    }

    if let Some(missing) = Emotion::ALL.iter().find(|e| !covered[e.index()]) {
        return Err(anyhow!("model has no class for emotion {}", missing));
    }

    Ok(classes)
}

fn scores_from_probs(classes: &[Option<Emotion>], probs: &[f32]) -> EmotionScores {
    let mut scores = EmotionScores::default();
    for (class, emotion) in classes.iter().enumerate() {
        if let Some(emotion) = emotion {
            scores[*emotion] = probs.get(class).copied().unwrap_or(0.0);
        }
    }
    scores
}

/// HWC u8 pixels -> CHW f32, normalized per channel
fn to_chw_normalized(rgb: &RgbImage) -> Vec<f32> {
    let plane = (rgb.width() * rgb.height()) as usize;
    let mut data = vec![0f32; plane * 3];
    for (i, pixel) in rgb.pixels().enumerate() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            data[channel * plane + i] = (value - PIXEL_MEAN) / PIXEL_STD;
        }
    }
    data
}
