use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fake_user_agent::get_rua;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use sha1::{Digest, Sha1};

use crate::configuration::DownloaderSettings;
use crate::domain::ImageShape;

const DIGEST_PREFIX_LEN: usize = 10;
const JPEG_QUALITY: u8 = 85;

pub enum PersistOutcome {
    Saved { path: PathBuf, image: RgbImage },
    Skipped,
}

/// Filename stem is a truncated digest of the raw downloaded bytes, so
/// byte-identical content always lands on the same file and overwrites
/// silently.
pub fn content_filename(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha1::digest(bytes));
    format!("{}.jpg", &digest[..DIGEST_PREFIX_LEN])
}

pub struct ImageStore {
    client: reqwest::Client,
}

impl ImageStore {
    pub fn new(settings: &DownloaderSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(get_rua())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(ImageStore { client })
    }

    /// Download `url`, normalize it to 3-channel RGB and write it under
    /// `target_folder` as re-encoded JPEG. Every failure mode is local to the
    /// URL: log a warning and report `Skipped`.
    pub async fn persist_image(&self, target_folder: &Path, url: &str) -> PersistOutcome {
        let response = match self.client.get(url).send().await {
            Ok(res) => res.error_for_status(),
            Err(e) => Err(e),
        };
        let bytes = match response {
            Ok(res) => match res.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Could not download {} - {:?}", url, e);
                    return PersistOutcome::Skipped;
                }
            },
            Err(e) => {
                log::warn!("Could not download {} - {:?}", url, e);
                return PersistOutcome::Skipped;
            }
        };

        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                log::warn!("Could not decode {} - {:?}", url, e);
                return PersistOutcome::Skipped;
            }
        };

        let path = target_folder.join(content_filename(&bytes));
        match write_jpeg(&path, &image) {
            Ok(()) => {
                log::info!("Saved {} as {}", url, path.display());
                PersistOutcome::Saved { path, image }
            }
            Err(e) => {
                log::warn!("Could not save {} - {:?}", url, e);
                PersistOutcome::Skipped
            }
        }
    }
}

fn write_jpeg(path: &Path, image: &RgbImage) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(())
}

/// Read back up to `max_images` already-persisted images from a label folder,
/// forced to RGB. Undecodable files are skipped with a warning.
pub fn load_label_images(
    image_folder: &Path,
    max_images: Option<usize>,
) -> anyhow::Result<Vec<RgbImage>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(image_folder)? {
        let path = entry?.path();
        match image::open(&path) {
            Ok(image) => images.push(image.to_rgb8()),
            Err(e) => {
                log::warn!("Could not load {} - {:?}", path.display(), e);
                continue;
            }
        }
        if let Some(max) = max_images {
            if images.len() >= max {
                break;
            }
        }
    }
    Ok(images)
}

/// Resize every image in `folder` to exactly `shape`, overwriting in place.
/// Corrupt or unreadable files are left untouched with a warning.
pub fn resize_images_in_folder(folder: &Path, shape: ImageShape) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let resized = match image::open(&path) {
            Ok(image) => image.resize_exact(shape.width, shape.height, FilterType::CatmullRom),
            Err(e) => {
                log::warn!("Could not resize {} - {:?}", path.display(), e);
                continue;
            }
        };
        if let Err(e) = resized.save(&path) {
            log::warn!("Could not resize {} - {:?}", path.display(), e);
        }
    }
    Ok(())
}
