//! The document and viewport the extraction runs against.

use scraper::Html;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub const DEFAULT_VIEWPORT_HEIGHT: u64 = 900;

/// Distance from the bottom at which `HtmlPage` materializes the next fragment.
pub const PRELOAD_MARGIN: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// Read access to the rendered document plus control of the scroll position.
///
/// Implementations must not change document structure in response to reads;
/// scrolling is the only write the pipeline performs.
pub trait Page: Send + Sync {
    /// URL of the page currently shown.
    fn location(&self) -> String;

    /// Total height of the document in pixels.
    fn scroll_height(&self) -> u64;

    fn viewport_height(&self) -> u64;

    fn scroll_position(&self) -> u64;

    fn scroll_to(&self, y: u64, behavior: ScrollBehavior);

    /// Parsed snapshot of the markup rendered so far.
    fn document(&self) -> Html;
}

impl<P: Page + ?Sized> Page for Arc<P> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn scroll_height(&self) -> u64 {
        (**self).scroll_height()
    }

    fn viewport_height(&self) -> u64 {
        (**self).viewport_height()
    }

    fn scroll_position(&self) -> u64 {
        (**self).scroll_position()
    }

    fn scroll_to(&self, y: u64, behavior: ScrollBehavior) {
        (**self).scroll_to(y, behavior)
    }

    fn document(&self) -> Html {
        (**self).document()
    }
}

/// An in-memory page that behaves like an infinitely scrolling listing.
///
/// The initial markup is rendered immediately. Each queued fragment is
/// appended to the body once the viewport comes within `PRELOAD_MARGIN`
/// pixels of the bottom, one fragment per scroll. Every rendered fragment
/// grows the document by one viewport height.
#[derive(Debug)]
pub struct HtmlPage {
    location: String,
    viewport_height: u64,
    state: Mutex<PageState>,
}

#[derive(Debug)]
struct PageState {
    markup: String,
    pending: VecDeque<String>,
    loaded: u64,
    scroll_y: u64,
}

impl HtmlPage {
    pub fn new(location: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            state: Mutex::new(PageState {
                markup: html.into(),
                pending: VecDeque::new(),
                loaded: 0,
                scroll_y: 0,
            }),
        }
    }

    /// Queues markup that only renders once the user scrolls near the bottom.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state()
            .pending
            .extend(fragments.into_iter().map(Into::into));
        self
    }

    pub fn with_viewport_height(mut self, height: u64) -> Self {
        self.viewport_height = height.max(1);
        self
    }

    pub fn loaded_fragments(&self) -> usize {
        self.state().loaded as usize
    }

    pub fn pending_fragments(&self) -> usize {
        self.state().pending.len()
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn height_of(&self, state: &PageState) -> u64 {
        self.viewport_height * (1 + state.loaded)
    }
}

impl PageState {
    fn materialize_next(&mut self) -> bool {
        let Some(fragment) = self.pending.pop_front() else {
            return false;
        };
        match self.markup.to_ascii_lowercase().rfind("</body>") {
            Some(index) => self.markup.insert_str(index, &fragment),
            None => self.markup.push_str(&fragment),
        }
        self.loaded += 1;
        true
    }
}

impl Page for HtmlPage {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn scroll_height(&self) -> u64 {
        let state = self.state();
        self.height_of(&state)
    }

    fn viewport_height(&self) -> u64 {
        self.viewport_height
    }

    fn scroll_position(&self) -> u64 {
        self.state().scroll_y
    }

    fn scroll_to(&self, y: u64, behavior: ScrollBehavior) {
        let mut state = self.state();
        let height = self.height_of(&state);
        let max_scroll = height.saturating_sub(self.viewport_height);
        state.scroll_y = y.min(max_scroll);

        if state.scroll_y + self.viewport_height + PRELOAD_MARGIN >= height
            && state.materialize_next()
        {
            debug!(
                "Rendered fragment {} after {:?} scroll to {}",
                state.loaded, behavior, state.scroll_y
            );
        }
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.state().markup)
    }
}
