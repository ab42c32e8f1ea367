use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

/// Consecutive no-growth scroll iterations tolerated before giving up on a
/// query. Lazy result pages can stall for many scrolls before loading more.
pub const PATIENCE_CEILING: u32 = 100;

pub enum ThumbnailActivation {
    Activated,
    NotInteractable,
}

/// Capability set the discovery loop needs from an image search results page.
///
/// The production implementation drives a WebDriver session; tests substitute
/// a scripted fake. Thumbnails are an order-stable, grow-only sequence, so an
/// index identifies the same thumbnail across calls.
#[async_trait]
pub trait SearchSession {
    async fn open_results(&self, query: &str) -> anyhow::Result<()>;

    async fn scroll_to_bottom(&self) -> anyhow::Result<()>;

    async fn thumbnail_count(&self) -> anyhow::Result<usize>;

    /// Simulate a click on the thumbnail at `index` so the page reveals its
    /// full-resolution source. Stale or non-interactable elements report
    /// `NotInteractable`; the caller skips them without penalty.
    async fn activate_thumbnail(&self, index: usize) -> ThumbnailActivation;

    /// Source attributes of the currently visible full-image preview elements.
    async fn preview_sources(&self) -> anyhow::Result<Vec<String>>;

    async fn close(&self) -> anyhow::Result<()>;
}

/// Accumulate distinct full-resolution image URLs for `query` until
/// `max_links_to_fetch` are found or patience runs out.
///
/// Best effort: the returned set is normally at least `max_links_to_fetch`
/// strong but may be smaller when the page stops producing new content.
/// `sleep_between_interactions` paces the scroll and click interactions so
/// asynchronous rendering can catch up; there is no completion signal to wait
/// on.
pub async fn search_images<S: SearchSession + ?Sized>(
    session: &S,
    query: &str,
    max_links_to_fetch: usize,
    sleep_between_interactions: Duration,
) -> anyhow::Result<HashSet<String>> {
    session.open_results(query).await?;

    let mut image_urls: HashSet<String> = HashSet::new();
    let mut results_start = 0;
    let mut patience = PATIENCE_CEILING;

    while image_urls.len() < max_links_to_fetch {
        session.scroll_to_bottom().await?;
        tokio::time::sleep(sleep_between_interactions).await;

        let number_results = session.thumbnail_count().await?;
        let previous_image_count = image_urls.len();

        for index in results_start..number_results {
            match session.activate_thumbnail(index).await {
                ThumbnailActivation::Activated => {}
                ThumbnailActivation::NotInteractable => continue,
            }
            tokio::time::sleep(sleep_between_interactions).await;

            for src in session.preview_sources().await? {
                if src.contains("http") {
                    image_urls.insert(src);
                }
            }

            if image_urls.len() >= max_links_to_fetch {
                log::info!("Found {} image links for {}, done", image_urls.len(), query);
                return Ok(image_urls);
            }
        }

        results_start = number_results;

        // Patience is judged on net growth across the whole scroll batch,
        // not per click.
        match image_urls.len() == previous_image_count {
            true => {
                patience -= 1;
                if patience == 0 {
                    log::info!(
                        "Out of patience on {} with {} image links",
                        query,
                        image_urls.len()
                    );
                    break;
                }
            }
            false => patience = PATIENCE_CEILING,
        }
    }

    Ok(image_urls)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{search_images, SearchSession, ThumbnailActivation, PATIENCE_CEILING};

    #[derive(Default)]
    struct FakeState {
        /// Visible thumbnail count after the n-th scroll; the last entry
        /// repeats once the page has no more to load.
        counts: Vec<usize>,
        scrolls: usize,
        sources: BTreeMap<usize, Vec<String>>,
        unclickable: HashSet<usize>,
        last_activated: Option<usize>,
        opened: Vec<String>,
        activated: Vec<usize>,
    }

    #[derive(Default)]
    struct FakeSession {
        state: Mutex<FakeState>,
    }

    impl FakeSession {
        fn with_counts(counts: Vec<usize>) -> Self {
            FakeSession {
                state: Mutex::new(FakeState {
                    counts,
                    ..FakeState::default()
                }),
            }
        }

        fn set_sources(&self, index: usize, sources: Vec<&str>) {
            self.state
                .lock()
                .unwrap()
                .sources
                .insert(index, sources.into_iter().map(String::from).collect());
        }

        fn mark_unclickable(&self, index: usize) {
            self.state.lock().unwrap().unclickable.insert(index);
        }

        fn scrolls(&self) -> usize {
            self.state.lock().unwrap().scrolls
        }

        fn activated(&self) -> Vec<usize> {
            self.state.lock().unwrap().activated.clone()
        }
    }

    #[async_trait]
    impl SearchSession for FakeSession {
        async fn open_results(&self, query: &str) -> anyhow::Result<()> {
            self.state.lock().unwrap().opened.push(query.to_string());
            Ok(())
        }

        async fn scroll_to_bottom(&self) -> anyhow::Result<()> {
            self.state.lock().unwrap().scrolls += 1;
            Ok(())
        }

        async fn thumbnail_count(&self) -> anyhow::Result<usize> {
            let state = self.state.lock().unwrap();
            let seen = state.scrolls.min(state.counts.len());
            Ok(match seen {
                0 => 0,
                n => state.counts[n - 1],
            })
        }

        async fn activate_thumbnail(&self, index: usize) -> ThumbnailActivation {
            let mut state = self.state.lock().unwrap();
            match state.unclickable.contains(&index) {
                true => ThumbnailActivation::NotInteractable,
                false => {
                    state.last_activated = Some(index);
                    state.activated.push(index);
                    ThumbnailActivation::Activated
                }
            }
        }

        async fn preview_sources(&self) -> anyhow::Result<Vec<String>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .last_activated
                .and_then(|index| state.sources.get(&index).cloned())
                .unwrap_or_default())
        }

        async fn close(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn terminates_on_a_page_that_never_renders_thumbnails() {
        let session = FakeSession::with_counts(vec![]);

        let urls = search_images(&session, "cat", 5, Duration::ZERO)
            .await
            .unwrap();

        assert!(urls.is_empty());
        assert_eq!(session.scrolls() as u32, PATIENCE_CEILING);
    }

    #[tokio::test]
    async fn short_circuits_once_the_target_is_reached() {
        let session = FakeSession::with_counts(vec![3, 6]);
        session.set_sources(0, vec!["http://img/0"]);
        session.set_sources(1, vec!["http://img/1"]);
        session.set_sources(2, vec!["http://img/2"]);
        session.set_sources(3, vec!["http://img/3"]);
        session.set_sources(4, vec!["http://img/4"]);
        session.set_sources(5, vec!["http://img/5"]);

        let urls = search_images(&session, "cat", 4, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(urls.len(), 4);
        // Thumbnails 4 and 5 appeared in the same batch as the one that hit
        // the target and must not have been touched.
        assert_eq!(session.activated(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn scans_each_thumbnail_exactly_once_across_batches() {
        let session = FakeSession::with_counts(vec![2, 4]);
        session.set_sources(0, vec!["http://img/0"]);
        session.set_sources(1, vec!["http://img/1"]);
        session.set_sources(2, vec!["http://img/2"]);
        session.set_sources(3, vec!["http://img/3"]);

        let urls = search_images(&session, "cat", 4, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(urls.len(), 4);
        assert_eq!(session.activated(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn skips_unclickable_thumbnails_without_aborting() {
        let session = FakeSession::with_counts(vec![3]);
        session.set_sources(0, vec!["http://img/0"]);
        session.set_sources(1, vec!["http://img/1"]);
        session.set_sources(2, vec!["http://img/2"]);
        session.mark_unclickable(1);

        let urls = search_images(&session, "cat", 3, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(session.activated(), vec![0, 2]);
        let mut sorted: Vec<_> = urls.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["http://img/0", "http://img/2"]);
    }

    #[tokio::test]
    async fn ignores_sources_that_are_not_http() {
        let session = FakeSession::with_counts(vec![1]);
        session.set_sources(0, vec!["data:image/png;base64,AAAA", "https://img/real"]);

        let urls = search_images(&session, "cat", 1, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://img/real"));
    }

    #[tokio::test]
    async fn duplicate_sources_collapse_and_patience_still_bounds_the_loop() {
        let session = FakeSession::with_counts(vec![2]);
        session.set_sources(0, vec!["http://img/same"]);
        session.set_sources(1, vec!["http://img/same"]);

        let urls = search_images(&session, "cat", 2, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(urls.len(), 1);
        // One growth batch, then no-growth batches until patience ran out.
        assert_eq!(session.scrolls() as u32, 1 + PATIENCE_CEILING);
    }
}
