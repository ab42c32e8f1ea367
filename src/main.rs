use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use holocron::{
    configuration::get_configuration,
    domain::{ImageShape, LabelQueries},
    services::{AugmentOptions, DatasetBuilder, Droid, ImageStore},
};

/// Build a labeled image dataset from Google Images search queries.
#[derive(Parser)]
#[command(name = "holocron", version)]
struct Cli {
    /// JSON file mapping each label to its list of search queries
    labels: PathBuf,

    #[arg(long, default_value = "./dataset")]
    output_directory: PathBuf,

    /// Distinct image links to aim for per query (best effort)
    #[arg(long, default_value_t = 50)]
    images_per_query: usize,

    /// Target shape as WxH, applied when --resize is set
    #[arg(long, default_value = "224x224")]
    image_shape: ImageShape,

    /// Resize every image in a label folder in place after scraping it
    #[arg(long)]
    resize: bool,

    /// Re-scrape labels even when their output folder already exists
    #[arg(long)]
    no_cache: bool,

    /// Seconds to wait after each scroll or click so the page can render
    #[arg(long, default_value_t = 1.0)]
    sleep_between_interactions: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let configuration = get_configuration().expect("Failed to read configuration.");

    let label_queries = LabelQueries::from_json_file(&cli.labels)?;
    if label_queries.is_empty() {
        anyhow::bail!("No labels found in {}", cli.labels.display());
    }

    let droid = Droid::new(&configuration.webdriver).await?;
    let store = ImageStore::new(&configuration.downloader)?;
    let builder = DatasetBuilder::new(droid, store);

    let options = AugmentOptions {
        output_directory: cli.output_directory,
        max_links_to_fetch: cli.images_per_query,
        image_shape: cli.image_shape,
        resize_images: cli.resize,
        sleep_between_interactions: Duration::from_secs_f64(cli.sleep_between_interactions),
        return_data: false,
        cache_data: !cli.no_cache,
    };

    let result = builder.augment_dataset(&label_queries, &options).await;
    builder.close().await?;
    result?;

    log::info!("Dataset written to {}", options.output_directory.display());
    Ok(())
}
