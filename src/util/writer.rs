use std::{path::PathBuf, time::Duration};

use serde_json::{Map, Value, json};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    capabilities::ImageArtifact,
    errors::{AppError, Result},
    models::{GenerationMode, GenerationOutcome, ResultSet},
    util::{local_rfc3339, now_local},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    /// Indices of failed outcomes that had nothing to save.
    pub skipped: Vec<usize>,
}

/// Writes successful outcomes to the downloads directory as image files with
/// a `.meta.json` sidecar next to each.
pub struct DownloadWriter {
    root: PathBuf,
    stagger: Duration,
}

impl DownloadWriter {
    pub fn new(root: PathBuf, stagger: Duration) -> Self {
        Self { root, stagger }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub async fn save(
        &self,
        index: usize,
        outcome: &GenerationOutcome,
        mode: GenerationMode,
    ) -> Result<PathBuf> {
        let Some(image_url) = outcome.image_url() else {
            return Err(AppError::not_permitted(format!(
                "item {index} ({}) failed and has no image to download",
                outcome.title()
            )));
        };

        let artifact = ImageArtifact::from_data_url(outcome.title(), image_url)?
            .with_metadata("mode", mode.as_str())
            .with_metadata("index", index);
        self.persist(&artifact).await
    }

    /// Saves every successful outcome in order, pausing between files.
    pub async fn save_all(&self, results: &ResultSet) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();

        for (index, outcome) in results.iter().enumerate() {
            if !outcome.is_success() {
                report.skipped.push(index);
                continue;
            }
            if !report.saved.is_empty() && !self.stagger.is_zero() {
                tokio::time::sleep(self.stagger).await;
            }
            report
                .saved
                .push(self.save(index, outcome, results.mode()).await?);
        }

        info!(
            target: "downloads",
            saved = report.saved.len(),
            skipped = report.skipped.len(),
            "bulk download finished"
        );
        Ok(report)
    }

    async fn persist(&self, artifact: &ImageArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;

        let slug = slugify(&artifact.title);
        let mut base_name = slug.clone();
        let mut file_path = self.file_path(&base_name, &artifact.file_extension);
        if fs::try_exists(&file_path).await? {
            let id = Uuid::new_v4().simple().to_string();
            base_name = format!("{}-{}", slug, &id[..8]);
            file_path = self.file_path(&base_name, &artifact.file_extension);
        }

        fs::write(&file_path, &artifact.data).await?;

        let now = now_local();
        let mut meta = Map::new();
        meta.insert("title".to_string(), json!(artifact.title));
        meta.insert("media_type".to_string(), json!(artifact.media_type));
        meta.insert(
            "file".to_string(),
            json!(format!("{}.{}", base_name, artifact.file_extension)),
        );
        meta.insert("bytes".to_string(), json!(artifact.data.len()));
        meta.insert("created_at".to_string(), json!(local_rfc3339(&now)));
        for (key, value) in &artifact.metadata {
            meta.insert(key.clone(), value.clone());
        }

        let meta_path = self.root.join(format!("{}.meta.json", base_name));
        fs::write(&meta_path, serde_json::to_vec_pretty(&Value::Object(meta))?).await?;

        debug!(target: "downloads", path = %file_path.display(), "image written");
        Ok(file_path)
    }

    fn file_path(&self, base_name: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", base_name, extension))
    }
}

/// `"Three-Quarter Pose"` becomes `"three-quarter-pose"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug.to_string()
    }
}
