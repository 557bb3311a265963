use crate::dom::{ancestor_elements, non_empty_attr, visible_text};
use crate::noise::NoiseStripper;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// How many ancestors `NameStrategy::NearbyName` climbs looking for a name element.
pub const NEARBY_NAME_DEPTH: usize = 5;

static HEADING_LIKE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, h1, h2, h3, h4, h5, h6").expect("valid selector"));

static LIKELY_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"span[dir="auto"], [class*="name"], [class*="Name"], h1, h2, h3, h4, h5, h6"#,
    )
    .expect("valid selector")
});

/// Which name strategies are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameResolution {
    /// Only the anchor's own text.
    OwnText,
    /// The full fallback chain.
    #[default]
    Layered,
}

/// One way of pulling a raw label out of a candidate anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// The anchor's rendered text.
    OwnText,
    /// The `aria-label` attribute.
    AccessibleName,
    /// Text of the first span or heading inside the anchor.
    HeadingDescendant,
    /// A name-looking element near the anchor: a `dir="auto"` span, an element
    /// with a name class, or a heading, searched in up to five ancestors.
    NearbyName,
}

impl NameStrategy {
    pub const LAYERED: [NameStrategy; 4] = [
        NameStrategy::OwnText,
        NameStrategy::AccessibleName,
        NameStrategy::HeadingDescendant,
        NameStrategy::NearbyName,
    ];

    pub fn extract(&self, candidate: ElementRef<'_>) -> Option<String> {
        let text = match self {
            NameStrategy::OwnText => visible_text(candidate),
            NameStrategy::AccessibleName => return non_empty_attr(candidate, "aria-label"),
            NameStrategy::HeadingDescendant => candidate
                .select(&HEADING_LIKE)
                .next()
                .map(visible_text)
                .unwrap_or_default(),
            NameStrategy::NearbyName => ancestor_elements(candidate)
                .take(NEARBY_NAME_DEPTH)
                .flat_map(|ancestor| ancestor.select(&LIKELY_NAME))
                .map(visible_text)
                .find(|text| !text.is_empty())
                .unwrap_or_default(),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone)]
pub struct NameResolver {
    strategies: Vec<NameStrategy>,
    stripper: NoiseStripper,
}

impl NameResolver {
    pub fn new(resolution: NameResolution) -> Self {
        let strategies = match resolution {
            NameResolution::OwnText => vec![NameStrategy::OwnText],
            NameResolution::Layered => NameStrategy::LAYERED.to_vec(),
        };
        Self::with_strategies(strategies)
    }

    pub fn with_strategies(strategies: Vec<NameStrategy>) -> Self {
        Self {
            strategies,
            stripper: NoiseStripper::new(),
        }
    }

    /// The first non-empty label produced by the strategies, in order.
    pub fn raw_label(&self, candidate: ElementRef<'_>) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.extract(candidate))
    }

    /// Display name for `candidate`, noise stripped, or `identifier` when nothing usable remains.
    pub fn resolve(&self, candidate: ElementRef<'_>, identifier: &str) -> String {
        match self.raw_label(candidate) {
            Some(raw) => self.stripper.strip_or(&raw, identifier),
            None => identifier.to_string(),
        }
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(NameResolution::Layered)
    }
}
