use std::path::{Path, PathBuf};
use std::time::Duration;

use image::GrayImage;
use image::imageops::{self, FilterType};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Canonical page width after normalization.
pub const PAGE_WIDTH: u32 = 1424;

/// Canonical page height after normalization.
pub const PAGE_HEIGHT: u32 = 848;

/// Source description for one page of a score.
#[derive(Debug, Clone)]
pub struct PageSource {
    pub path: PathBuf,
    /// Scan traversal time for this page; `None` falls back to the
    /// score-wide default.
    pub duration: Option<Duration>,
}

impl PageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// One loaded, normalized score page.
#[derive(Debug, Clone)]
pub struct ScorePage {
    image: GrayImage,
    duration: Duration,
    index: usize,
    source: Option<PathBuf>,
}

impl ScorePage {
    /// Wrap an in-memory image without normalizing its dimensions.
    pub fn from_image(image: GrayImage, duration: Duration, index: usize) -> Self {
        Self {
            image,
            duration,
            index,
            source: None,
        }
    }

    fn load(source: &PageSource, default_duration: Duration, index: usize) -> Result<Self> {
        let image = image::open(&source.path)?.to_luma8();
        let image = if image.dimensions() == (PAGE_WIDTH, PAGE_HEIGHT) {
            image
        } else {
            debug!(
                path = %source.path.display(),
                from = ?image.dimensions(),
                "normalizing page dimensions"
            );
            imageops::resize(&image, PAGE_WIDTH, PAGE_HEIGHT, FilterType::Triangle)
        };

        Ok(Self {
            image,
            duration: source.duration.unwrap_or(default_duration),
            index,
            source: Some(source.path.clone()),
        })
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn width(&self) -> f32 {
        self.image.width() as f32
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// An ordered, non-empty set of score pages with a cursor.
///
/// Navigation clamps at the ends; there is no wrap-around between the last
/// and first page.
#[derive(Debug, Clone)]
pub struct ScoreSet {
    pages: Vec<ScorePage>,
    current: usize,
}

impl ScoreSet {
    /// Load and normalize every page in order.
    pub fn load(sources: &[PageSource], default_duration: Duration) -> Result<Self> {
        if sources.is_empty() {
            return Err(CoreError::InvalidScore(
                "a score needs at least one page".into(),
            ));
        }

        let mut pages = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let page = ScorePage::load(source, default_duration, index)?;
            info!(
                page = index,
                path = %source.path.display(),
                duration = ?page.duration(),
                "loaded score page"
            );
            pages.push(page);
        }

        Ok(Self { pages, current: 0 })
    }

    /// Build a set from already-loaded pages.
    pub fn from_pages(pages: Vec<ScorePage>) -> Result<Self> {
        if pages.is_empty() {
            return Err(CoreError::InvalidScore(
                "a score needs at least one page".into(),
            ));
        }
        Ok(Self { pages, current: 0 })
    }

    pub fn current(&self) -> &ScorePage {
        &self.pages[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Advance to the next page. Returns `false` (and stays put) on the
    /// last page.
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Step back to the previous page. Returns `false` (and stays put) on
    /// the first page.
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn page(index: usize) -> ScorePage {
        ScorePage::from_image(
            GrayImage::from_pixel(100, 50, Luma([0])),
            Duration::from_secs(10),
            index,
        )
    }

    #[test]
    fn empty_set_is_invalid() {
        let result = ScoreSet::from_pages(Vec::new());
        assert!(matches!(result, Err(CoreError::InvalidScore(_))));

        let result = ScoreSet::load(&[], Duration::from_secs(10));
        assert!(matches!(result, Err(CoreError::InvalidScore(_))));
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut set = ScoreSet::from_pages(vec![page(0), page(1)]).unwrap();

        assert!(!set.previous());
        assert_eq!(set.current_index(), 0);

        assert!(set.next());
        assert_eq!(set.current_index(), 1);

        assert!(!set.next());
        assert_eq!(set.current_index(), 1);

        assert!(set.previous());
        assert_eq!(set.current_index(), 0);
    }

    #[test]
    fn load_normalizes_dimensions_and_default_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        GrayImage::from_pixel(300, 200, Luma([128]))
            .save(&path)
            .unwrap();

        let sources = vec![
            PageSource::new(&path),
            PageSource::new(&path).with_duration(Duration::from_secs(4)),
        ];
        let set = ScoreSet::load(&sources, Duration::from_secs(12)).unwrap();

        assert_eq!(set.page_count(), 2);
        let first = set.current();
        assert_eq!(first.image().dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        assert_eq!(first.duration(), Duration::from_secs(12));
        assert_eq!(set.pages[1].duration(), Duration::from_secs(4));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let sources = vec![PageSource::new("/nonexistent/page.png")];
        let result = ScoreSet::load(&sources, Duration::from_secs(10));
        assert!(result.is_err());
    }
}
