use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use image::RgbImage;

use crate::domain::{ImageShape, LabelQueries};
use crate::services::{
    load_label_images, resize_images_in_folder, search_images, ImageStore, PersistOutcome,
    SearchSession,
};

pub struct AugmentOptions {
    pub output_directory: PathBuf,
    pub max_links_to_fetch: usize,
    pub image_shape: ImageShape,
    pub resize_images: bool,
    pub sleep_between_interactions: Duration,
    pub return_data: bool,
    pub cache_data: bool,
}

/// Walks the label -> queries mapping, discovers image URLs per query and
/// persists each one under `<output_directory>/<label>/`.
pub struct DatasetBuilder<S: SearchSession> {
    session: S,
    store: ImageStore,
}

impl<S: SearchSession> DatasetBuilder<S> {
    pub fn new(session: S, store: ImageStore) -> Self {
        DatasetBuilder { session, store }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns `Some((images, labels))` when `return_data` is set: one label
    /// entry per accumulated image, in matching order. A label folder that
    /// already exists is either reused as a cache (no discovery at all) or
    /// wiped before re-scraping, depending on `cache_data`. Per-URL failures
    /// are logged and skipped; they never abort the run.
    pub async fn augment_dataset(
        &self,
        label_queries: &LabelQueries,
        options: &AugmentOptions,
    ) -> anyhow::Result<Option<(Vec<RgbImage>, Vec<String>)>> {
        let mut images_list = Vec::new();
        let mut labels_list = Vec::new();

        for (label, queries) in label_queries.iter() {
            let target_folder = options.output_directory.join(label);

            if target_folder.exists() && options.cache_data {
                log::info!(
                    "Found target folder {}. Loading images",
                    target_folder.display()
                );
                let images = load_label_images(&target_folder, Some(options.max_links_to_fetch))?;
                if options.return_data {
                    labels_list.extend(std::iter::repeat(label.clone()).take(images.len()));
                    images_list.extend(images);
                }
            } else {
                if target_folder.exists() {
                    log::info!(
                        "Found target folder {}. Removing folder",
                        target_folder.display()
                    );
                    std::fs::remove_dir_all(&target_folder).with_context(|| {
                        format!("Failed to remove {}", target_folder.display())
                    })?;
                }

                for query in queries {
                    let image_urls = search_images(
                        &self.session,
                        query,
                        options.max_links_to_fetch,
                        options.sleep_between_interactions,
                    )
                    .await?;

                    std::fs::create_dir_all(&target_folder).with_context(|| {
                        format!("Failed to create {}", target_folder.display())
                    })?;

                    for url in &image_urls {
                        match self.store.persist_image(&target_folder, url).await {
                            PersistOutcome::Saved { image, .. } => {
                                if options.return_data {
                                    images_list.push(image);
                                    labels_list.push(label.clone());
                                }
                            }
                            PersistOutcome::Skipped => {}
                        }
                    }
                }
            }

            if options.resize_images {
                resize_images_in_folder(&target_folder, options.image_shape)?;
            }
        }

        Ok(options.return_data.then_some((images_list, labels_list)))
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.session.close().await
    }
}
