use async_trait::async_trait;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};

use crate::configuration::WebdriverSettings;
use crate::services::{SearchSession, ThumbnailActivation};

/// Low-resolution result thumbnails on the Google Images page.
const THUMBNAIL_SELECTOR: &str = "img.Q4LuWd";
/// Full-resolution preview revealed after clicking a thumbnail.
const PREVIEW_SELECTOR: &str = "img.n3VNCb";

const SCROLL_TO_END_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Google expects the query duplicated across `q` and `oq` in image search
/// mode; this is an unstable third-party contract, so it lives in exactly one
/// place.
pub fn build_search_url(query: &str) -> String {
    let q: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://www.google.com/search?safe=off&site=&tbm=isch&source=hp&q={q}&oq={q}&gs_l=img")
}

pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &WebdriverSettings) -> anyhow::Result<Self> {
        match settings.browser.as_str() {
            "chrome" => {}
            other => anyhow::bail!("Driver type not supported: {}", other),
        }

        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.set_headless()?;
        }

        let driver = WebDriver::new(&settings.url, caps).await?;
        driver.maximize_window().await?;

        Ok(Droid { driver })
    }
}

#[async_trait]
impl SearchSession for Droid {
    async fn open_results(&self, query: &str) -> anyhow::Result<()> {
        self.driver.goto(build_search_url(query)).await?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> anyhow::Result<()> {
        self.driver.execute(SCROLL_TO_END_SCRIPT, vec![]).await?;
        Ok(())
    }

    async fn thumbnail_count(&self) -> anyhow::Result<usize> {
        let thumbnails = self.driver.find_all(By::Css(THUMBNAIL_SELECTOR)).await?;
        Ok(thumbnails.len())
    }

    async fn activate_thumbnail(&self, index: usize) -> ThumbnailActivation {
        // Stale references, overlays and elements scrolled out of view all
        // surface as errors here; each one just means "skip this thumbnail".
        let thumbnails = match self.driver.find_all(By::Css(THUMBNAIL_SELECTOR)).await {
            Ok(thumbnails) => thumbnails,
            Err(e) => {
                log::debug!("Could not enumerate thumbnails: {:?}", e);
                return ThumbnailActivation::NotInteractable;
            }
        };
        let Some(thumbnail) = thumbnails.get(index) else {
            return ThumbnailActivation::NotInteractable;
        };

        match thumbnail.click().await {
            Ok(()) => ThumbnailActivation::Activated,
            Err(e) => {
                log::debug!("Could not click thumbnail {}: {:?}", index, e);
                ThumbnailActivation::NotInteractable
            }
        }
    }

    async fn preview_sources(&self) -> anyhow::Result<Vec<String>> {
        let previews = self.driver.find_all(By::Css(PREVIEW_SELECTOR)).await?;

        let mut sources = Vec::new();
        for preview in previews {
            if let Some(src) = preview.attr("src").await? {
                sources.push(src);
            }
        }
        Ok(sources)
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.driver.clone().quit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::build_search_url;

    #[test]
    fn search_url_embeds_the_query_twice() {
        let url = build_search_url("black cat");
        assert!(url.contains("q=black+cat"));
        assert!(url.contains("oq=black+cat"));
        assert!(url.contains("tbm=isch"));
    }
}
