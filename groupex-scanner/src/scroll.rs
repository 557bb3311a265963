//! Scroll-driven loading of lazily rendered content.
//!
//! `ScrollLoader::load_all` keeps moving the viewport to the bottom of the page
//! until the document height stops changing for `max_no_change` consecutive
//! observations (a plateau) or the safety timeout fires, then returns to the
//! top. The cadence decides where each step scrolls to and how long it waits;
//! it never changes the loop itself.

use crate::error::{ExportError, Result};
use crate::page::{Page, ScrollBehavior};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_NO_CHANGE: u32 = 5;
pub const FIXED_TIMEOUT_SECS: u64 = 120;
pub const HUMANIZED_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Called after every scroll step with the step number and the document height.
pub type ScrollProgressCallback = Arc<dyn Fn(usize, u64) + Send + Sync>;

fn default_fixed_delay_ms() -> u64 {
    1000
}

fn default_min_delay_ms() -> u64 {
    1200
}

fn default_max_delay_ms() -> u64 {
    2500
}

fn default_max_jitter_px() -> u64 {
    250
}

/// Per-step delay and target policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum ScrollCadence {
    /// Jump straight to the bottom, wait a fixed delay.
    Fixed {
        #[serde(default = "default_fixed_delay_ms")]
        delay_ms: u64,
    },
    /// Smooth scroll to a point just short of the bottom, wait a random delay.
    Humanized {
        #[serde(default = "default_min_delay_ms")]
        min_delay_ms: u64,
        #[serde(default = "default_max_delay_ms")]
        max_delay_ms: u64,
        #[serde(default = "default_max_jitter_px")]
        max_jitter_px: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub target: u64,
    pub delay: Duration,
    pub behavior: ScrollBehavior,
}

impl ScrollCadence {
    pub fn fixed() -> Self {
        ScrollCadence::Fixed {
            delay_ms: default_fixed_delay_ms(),
        }
    }

    pub fn humanized() -> Self {
        ScrollCadence::Humanized {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_jitter_px: default_max_jitter_px(),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            ScrollCadence::Fixed { .. } => Duration::from_secs(FIXED_TIMEOUT_SECS),
            ScrollCadence::Humanized { .. } => Duration::from_secs(HUMANIZED_TIMEOUT_SECS),
        }
    }

    pub fn plan<R: Rng>(&self, page_height: u64, viewport_height: u64, rng: &mut R) -> StepPlan {
        match *self {
            ScrollCadence::Fixed { delay_ms } => StepPlan {
                target: page_height,
                delay: Duration::from_millis(delay_ms),
                behavior: ScrollBehavior::Instant,
            },
            ScrollCadence::Humanized {
                min_delay_ms,
                max_delay_ms,
                max_jitter_px,
            } => {
                let bottom = page_height.saturating_sub(viewport_height);
                let jitter = rng.random_range(0..=max_jitter_px);
                StepPlan {
                    target: bottom.saturating_sub(jitter),
                    delay: Duration::from_millis(rng.random_range(min_delay_ms..=max_delay_ms)),
                    behavior: ScrollBehavior::Smooth,
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            ScrollCadence::Fixed { delay_ms: 0 } => Err(ExportError::InvalidConfig(
                "delay_ms must be greater than zero".to_string(),
            )),
            ScrollCadence::Fixed { .. } => Ok(()),
            ScrollCadence::Humanized {
                min_delay_ms,
                max_delay_ms,
                ..
            } if min_delay_ms > max_delay_ms => Err(ExportError::InvalidConfig(format!(
                "min_delay_ms ({}) is greater than max_delay_ms ({})",
                min_delay_ms, max_delay_ms
            ))),
            ScrollCadence::Humanized { .. } => Ok(()),
        }
    }
}

impl Default for ScrollCadence {
    fn default() -> Self {
        Self::fixed()
    }
}

/// Second pass that walks the page top to bottom in small steps so content
/// fetched but not yet rendered gets laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPass {
    pub step_px: u64,
    pub delay_ms: u64,
}

impl Default for RenderPass {
    fn default() -> Self {
        Self {
            step_px: 400,
            delay_ms: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub cadence: ScrollCadence,
    pub max_no_change: u32,
    /// Overrides the cadence's default safety timeout.
    pub timeout_secs: Option<u64>,
    pub settle_ms: u64,
    pub render_pass: Option<RenderPass>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            cadence: ScrollCadence::default(),
            max_no_change: DEFAULT_MAX_NO_CHANGE,
            timeout_secs: None,
            settle_ms: DEFAULT_SETTLE_MS,
            render_pass: None,
        }
    }
}

impl ScrollConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.cadence.default_timeout())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_no_change == 0 {
            return Err(ExportError::InvalidConfig(
                "max_no_change must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ExportError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(pass) = &self.render_pass
            && pass.step_px == 0
        {
            return Err(ExportError::InvalidConfig(
                "render_pass.step_px must be greater than zero".to_string(),
            ));
        }
        self.cadence.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Scrolling,
    Settling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollOutcome {
    /// The document stopped growing.
    Plateau,
    /// The safety timeout fired first; extraction proceeds with what loaded.
    TimedOut,
}

/// State of one `load_all` call. Dropped when the call returns.
#[derive(Debug)]
pub struct ScrollSession {
    pub state: ScrollState,
    pub previous_height: u64,
    pub no_change_count: u32,
    pub steps: usize,
    pub started_at: Instant,
}

impl ScrollSession {
    fn start() -> Self {
        let mut session = Self {
            state: ScrollState::Idle,
            previous_height: 0,
            no_change_count: 0,
            steps: 0,
            started_at: Instant::now(),
        };
        session.transition(ScrollState::Scrolling);
        session
    }

    fn transition(&mut self, next: ScrollState) {
        debug!("Scroll session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Records a height observation; true once the plateau threshold is reached.
    fn observe(&mut self, height: u64, max_no_change: u32) -> bool {
        if height == self.previous_height {
            self.no_change_count += 1;
            self.no_change_count >= max_no_change
        } else {
            self.no_change_count = 0;
            self.previous_height = height;
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollReport {
    pub outcome: ScrollOutcome,
    pub steps: usize,
    pub final_height: u64,
    pub elapsed: Duration,
}

pub struct ScrollLoader {
    config: ScrollConfig,
    rng: Mutex<StdRng>,
    progress_callback: Option<ScrollProgressCallback>,
}

impl ScrollLoader {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
            progress_callback: None,
        }
    }

    /// Makes the humanized cadence reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_progress_callback(mut self, callback: ScrollProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Scrolls until the page plateaus or the safety timeout fires, then
    /// returns to the top. Cancellation is observed at every step delay.
    pub async fn load_all<P: Page>(&self, page: &P, cancel: &CancellationToken) -> Result<ScrollReport> {
        let timeout = self.config.timeout();
        info!(
            "Loading content: cadence {:?}, plateau after {} unchanged steps, timeout {:?}",
            self.config.cadence, self.config.max_no_change, timeout
        );

        let mut session = ScrollSession::start();
        let scrolled =
            tokio::time::timeout(timeout, self.scroll_until_plateau(page, &mut session, cancel)).await;

        let outcome = match scrolled {
            Ok(Ok(())) => ScrollOutcome::Plateau,
            Ok(Err(e)) => {
                page.scroll_to(0, ScrollBehavior::Instant);
                return Err(e);
            }
            Err(_) => {
                warn!(
                    "Scroll safety timeout after {:?} ({} steps), extracting what loaded",
                    timeout, session.steps
                );
                ScrollOutcome::TimedOut
            }
        };

        session.transition(ScrollState::Settling);
        page.scroll_to(0, ScrollBehavior::Instant);
        if self.config.settle_ms > 0 {
            pause(Duration::from_millis(self.config.settle_ms), cancel).await?;
        }
        session.transition(ScrollState::Done);

        let report = ScrollReport {
            outcome,
            steps: session.steps,
            final_height: page.scroll_height(),
            elapsed: session.started_at.elapsed(),
        };
        info!(
            "Loading finished: {:?} after {} steps, height {}",
            report.outcome, report.steps, report.final_height
        );
        Ok(report)
    }

    async fn scroll_until_plateau<P: Page>(
        &self,
        page: &P,
        session: &mut ScrollSession,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            let plan = self.plan_step(page);
            page.scroll_to(plan.target, plan.behavior);
            pause(plan.delay, cancel).await?;

            session.steps += 1;
            let height = page.scroll_height();
            let plateau = session.observe(height, self.config.max_no_change);
            debug!(
                "Step {}: height {} (unchanged {}/{})",
                session.steps, height, session.no_change_count, self.config.max_no_change
            );

            if let Some(ref callback) = self.progress_callback {
                callback(session.steps, height);
            }

            if plateau {
                return Ok(());
            }
        }
    }

    fn plan_step<P: Page>(&self, page: &P) -> StepPlan {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.config
            .cadence
            .plan(page.scroll_height(), page.viewport_height(), &mut *rng)
    }

    /// Walks the viewport down the page once in `pass.step_px` increments,
    /// then returns to the top. The bottom is fixed when the pass starts.
    pub async fn scroll_through_page<P: Page>(
        &self,
        page: &P,
        pass: &RenderPass,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let bottom = page.scroll_height().saturating_sub(page.viewport_height());
        let delay = Duration::from_millis(pass.delay_ms);
        debug!("Render pass to {} in {}px steps", bottom, pass.step_px);

        page.scroll_to(0, ScrollBehavior::Instant);
        let mut position = 0;
        while position < bottom {
            position = (position + pass.step_px).min(bottom);
            page.scroll_to(position, ScrollBehavior::Smooth);
            if let Err(e) = pause(delay, cancel).await {
                page.scroll_to(0, ScrollBehavior::Instant);
                return Err(e);
            }
        }
        page.scroll_to(0, ScrollBehavior::Instant);
        Ok(())
    }
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ExportError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;
    use scraper::Html;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A page that records every scroll and optionally grows on each one.
    struct RecordingPage {
        height: AtomicU64,
        position: AtomicU64,
        grows: bool,
        scrolls: Mutex<Vec<(u64, ScrollBehavior)>>,
    }

    impl RecordingPage {
        fn new(height: u64, grows: bool) -> Self {
            Self {
                height: AtomicU64::new(height),
                position: AtomicU64::new(0),
                grows,
                scrolls: Mutex::new(Vec::new()),
            }
        }

        fn scrolls(&self) -> Vec<(u64, ScrollBehavior)> {
            self.scrolls.lock().unwrap().clone()
        }
    }

    impl Page for RecordingPage {
        fn location(&self) -> String {
            "https://www.facebook.com/groups/joins/".to_string()
        }

        fn scroll_height(&self) -> u64 {
            self.height.load(Ordering::SeqCst)
        }

        fn viewport_height(&self) -> u64 {
            900
        }

        fn scroll_position(&self) -> u64 {
            self.position.load(Ordering::SeqCst)
        }

        fn scroll_to(&self, y: u64, behavior: ScrollBehavior) {
            self.position.store(y, Ordering::SeqCst);
            self.scrolls.lock().unwrap().push((y, behavior));
            if self.grows {
                self.height.fetch_add(900, Ordering::SeqCst);
            }
        }

        fn document(&self) -> Html {
            Html::parse_document("<html><body></body></html>")
        }
    }

    fn listing(fragments: usize) -> HtmlPage {
        HtmlPage::new(
            "https://www.facebook.com/groups/joins/",
            "<html><body></body></html>",
        )
        .with_fragments((0..fragments).map(|i| format!("<p>{}</p>", i)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_plateau_after_five_unchanged_observations() {
        let page = listing(3);
        let loader = ScrollLoader::new(ScrollConfig::default());

        let report = loader.load_all(&page, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.outcome, ScrollOutcome::Plateau);
        // Three growing steps, then five unchanged observations.
        assert_eq!(report.steps, 8);
        assert_eq!(report.final_height, 4 * 900);
        assert_eq!(page.loaded_fragments(), 3);
        assert_eq!(page.scroll_position(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminates_on_timeout_when_page_grows_forever() {
        let page = RecordingPage::new(900, true);
        let loader = ScrollLoader::new(ScrollConfig::default());

        let report = loader.load_all(&page, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.outcome, ScrollOutcome::TimedOut);
        assert!(report.elapsed >= Duration::from_secs(FIXED_TIMEOUT_SECS));
        assert!(report.elapsed <= Duration::from_secs(FIXED_TIMEOUT_SECS + 1));
        assert_eq!(page.scroll_position(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_humanized_cadence_times_out_at_its_own_bound() {
        let page = RecordingPage::new(900, true);
        let config = ScrollConfig {
            cadence: ScrollCadence::humanized(),
            ..ScrollConfig::default()
        };
        let loader = ScrollLoader::new(config).with_seed(7);

        let report = loader.load_all(&page, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.outcome, ScrollOutcome::TimedOut);
        assert!(report.elapsed >= Duration::from_secs(HUMANIZED_TIMEOUT_SECS));
        assert!(report.elapsed <= Duration::from_secs(HUMANIZED_TIMEOUT_SECS + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_humanized_steps_stay_within_bands() {
        let page = RecordingPage::new(5000, false);
        let config = ScrollConfig {
            cadence: ScrollCadence::humanized(),
            settle_ms: 0,
            ..ScrollConfig::default()
        };
        let loader = ScrollLoader::new(config).with_seed(42);

        let report = loader.load_all(&page, &CancellationToken::new()).await.unwrap();

        // Height never changes from the first observation, so five more steps plateau.
        assert_eq!(report.outcome, ScrollOutcome::Plateau);
        assert_eq!(report.steps, 6);
        assert!(report.elapsed >= Duration::from_millis(6 * 1200));
        assert!(report.elapsed <= Duration::from_millis(6 * 2500));

        let scrolls = page.scrolls();
        let (last, steps) = scrolls.split_last().unwrap();
        assert_eq!(*last, (0, ScrollBehavior::Instant));
        for (target, behavior) in steps {
            assert_eq!(*behavior, ScrollBehavior::Smooth);
            assert!(*target <= 5000 - 900);
            assert!(*target >= 5000 - 900 - 250);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_cadence_jumps_to_bottom() {
        let page = RecordingPage::new(2000, false);
        let loader = ScrollLoader::new(ScrollConfig::default());

        loader.load_all(&page, &CancellationToken::new()).await.unwrap();

        let scrolls = page.scrolls();
        assert!(scrolls[..scrolls.len() - 1]
            .iter()
            .all(|scroll| *scroll == (2000, ScrollBehavior::Instant)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_before_next_step() {
        let page = RecordingPage::new(900, true);
        let loader = ScrollLoader::new(ScrollConfig::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            trigger.cancel();
        });

        let result = loader.load_all(&page, &cancel).await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert_eq!(page.scroll_position(), 0);
        // Steps at 0s, 1s, 2s and 3s were taken; the one due at 4s was not.
        assert_eq!(page.scrolls().len(), 4 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_settle() {
        let page = RecordingPage::new(900, false);
        let loader = ScrollLoader::new(ScrollConfig {
            settle_ms: 60_000,
            ..ScrollConfig::default()
        });
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = loader.load_all(&page, &cancel).await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(page.scroll_position(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_pass_walks_down_once() {
        let page = RecordingPage::new(3000, false);
        let loader = ScrollLoader::new(ScrollConfig::default());
        let pass = RenderPass {
            step_px: 400,
            delay_ms: 100,
        };

        loader
            .scroll_through_page(&page, &pass, &CancellationToken::new())
            .await
            .unwrap();

        let positions: Vec<u64> = page.scrolls().iter().map(|(y, _)| *y).collect();
        assert_eq!(positions, vec![0, 400, 800, 1200, 1600, 2000, 2100, 0]);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScrollConfig::default().validate().is_ok());

        let config = ScrollConfig {
            max_no_change: 0,
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScrollConfig {
            timeout_secs: Some(0),
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScrollConfig {
            cadence: ScrollCadence::Humanized {
                min_delay_ms: 3000,
                max_delay_ms: 1000,
                max_jitter_px: 0,
            },
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScrollConfig {
            cadence: ScrollCadence::Fixed { delay_ms: 0 },
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScrollConfig {
            render_pass: Some(RenderPass {
                step_px: 0,
                delay_ms: 10,
            }),
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_defaults_follow_cadence() {
        let fixed = ScrollConfig::default();
        assert_eq!(fixed.timeout(), Duration::from_secs(120));

        let humanized = ScrollConfig {
            cadence: ScrollCadence::humanized(),
            ..ScrollConfig::default()
        };
        assert_eq!(humanized.timeout(), Duration::from_secs(180));

        let overridden = ScrollConfig {
            timeout_secs: Some(150),
            ..humanized
        };
        assert_eq!(overridden.timeout(), Duration::from_secs(150));
    }

    #[test]
    fn test_cadence_deserializes_with_defaults() {
        let cadence: ScrollCadence = serde_json::from_str(r#"{"style":"humanized"}"#).unwrap();
        assert_eq!(cadence, ScrollCadence::humanized());

        let cadence: ScrollCadence =
            serde_json::from_str(r#"{"style":"fixed","delay_ms":250}"#).unwrap();
        assert_eq!(cadence, ScrollCadence::Fixed { delay_ms: 250 });
    }
}
