use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::metrics::PixelBox;

#[derive(Debug, Deserialize)]
struct CocoFile {
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    #[serde(default)]
    id: u64,
    image_id: u64,
    category_id: u64,
    /// `[x, y, width, height]` in image pixels.
    bbox: [f64; 4],
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,
    supercategory: String,
}

/// One annotated object.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruth {
    pub bbox: PixelBox,
    /// Supercategory of the annotated category (e.g. "Bottle", "Can").
    pub label: String,
}

/// One annotated image.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub objects: Vec<GroundTruth>,
}

/// TACO annotations grouped per image.
///
/// Samples keep the order in which their first annotation appears, which is
/// the order prediction runs are written in.
#[derive(Clone, Debug, Default)]
pub struct TacoDataset {
    categories: Vec<String>,
    supercategories: Vec<String>,
    samples: Vec<Sample>,
}

impl TacoDataset {
    /// Load an annotations file. `annotation_limit` keeps only the first N
    /// annotations.
    pub fn load(path: &Path, annotation_limit: Option<usize>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read annotations {}", path.display()))?;
        Self::from_json(&raw, annotation_limit)
            .with_context(|| format!("invalid annotations {}", path.display()))
    }

    pub fn from_json(raw: &str, annotation_limit: Option<usize>) -> Result<Self> {
        let coco: CocoFile = serde_json::from_str(raw)?;

        let mut categories = Vec::with_capacity(coco.categories.len());
        let mut supercategories: Vec<String> = Vec::new();
        let mut supercategory_of = HashMap::new();
        for cat in &coco.categories {
            categories.push(cat.name.clone());
            if !supercategories.contains(&cat.supercategory) {
                supercategories.push(cat.supercategory.clone());
            }
            supercategory_of.insert(cat.id, cat.supercategory.as_str());
        }

        let images: HashMap<u64, &CocoImage> = coco.images.iter().map(|img| (img.id, img)).collect();

        let limit = annotation_limit.unwrap_or(coco.annotations.len());
        let mut samples: Vec<Sample> = Vec::new();
        let mut sample_index: HashMap<u64, usize> = HashMap::new();
        for ann in coco.annotations.iter().take(limit) {
            let image = images.get(&ann.image_id).ok_or_else(|| {
                anyhow!("annotation {} references unknown image {}", ann.id, ann.image_id)
            })?;
            let label = supercategory_of.get(&ann.category_id).ok_or_else(|| {
                anyhow!(
                    "annotation {} references unknown category {}",
                    ann.id,
                    ann.category_id
                )
            })?;

            let idx = *sample_index.entry(ann.image_id).or_insert_with(|| {
                samples.push(Sample {
                    file_name: image.file_name.clone(),
                    width: image.width,
                    height: image.height,
                    objects: Vec::new(),
                });
                samples.len() - 1
            });
            samples[idx].objects.push(GroundTruth {
                bbox: PixelBox::from_xywh(ann.bbox),
                label: label.to_string(),
            });
        }

        log::debug!(
            "loaded {} annotated images ({} categories, {} supercategories)",
            samples.len(),
            categories.len(),
            supercategories.len()
        );

        Ok(Self {
            categories,
            supercategories,
            samples,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Distinct supercategories, in first-seen order.
    pub fn supercategories(&self) -> &[String] {
        &self.supercategories
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
