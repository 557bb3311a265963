use crate::error::{ExportError, Result};
use crate::identity::IdentityResolver;
use crate::membership::{AcceptAll, AncestorTextClassifier, MembershipClassifier};
use crate::names::NameResolver;
use crate::page::Page;
use crate::record::GroupRecord;
use crate::scroll::{ScrollConfig, ScrollLoader, ScrollReport};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Where the pipeline is allowed to run: a host (or any subdomain of it) and a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRule {
    domain: String,
    path_prefix: String,
}

impl ContextRule {
    pub fn new(domain: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            domain: domain.into().to_ascii_lowercase(),
            path_prefix: path_prefix.into(),
        }
    }

    pub fn facebook_groups() -> Self {
        Self::new("facebook.com", "/groups")
    }

    /// The parsed location when it satisfies the rule.
    pub fn check(&self, location: &str) -> Option<Url> {
        let url = Url::parse(location).ok()?;
        let host = url.host_str()?;
        let same_domain = host == self.domain || host.ends_with(&format!(".{}", self.domain));
        (same_domain && self.path_matches(url.path())).then_some(url)
    }

    /// The prefix as a whole path segment: `/groups` and `/groups/...`, never `/groupsfoo`.
    fn path_matches(&self, path: &str) -> bool {
        let prefix = self.path_prefix.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    pub fn matches(&self, location: &str) -> bool {
        self.check(location).is_some()
    }
}

impl Default for ContextRule {
    fn default() -> Self {
        Self::facebook_groups()
    }
}

/// Result of one run: unique records in first-seen document order.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<GroupRecord>,
    pub scroll: ScrollReport,
}

impl Extraction {
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

pub struct ExtractionPipeline<P: Page> {
    page: P,
    context: ContextRule,
    loader: ScrollLoader,
    identity: IdentityResolver,
    membership: Box<dyn MembershipClassifier>,
    names: NameResolver,
}

impl<P: Page> ExtractionPipeline<P> {
    pub fn new(page: P, scroll: ScrollConfig) -> Self {
        Self {
            page,
            context: ContextRule::default(),
            loader: ScrollLoader::new(scroll),
            identity: IdentityResolver::default(),
            membership: Box::new(AncestorTextClassifier::new()),
            names: NameResolver::default(),
        }
    }

    pub fn with_context_rule(mut self, context: ContextRule) -> Self {
        self.context = context;
        self
    }

    pub fn with_scroll_loader(mut self, loader: ScrollLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_identity_resolver(mut self, identity: IdentityResolver) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_membership_classifier(
        mut self,
        classifier: impl MembershipClassifier + 'static,
    ) -> Self {
        self.membership = Box::new(classifier);
        self
    }

    /// `false` accepts every group link, suggestions included.
    pub fn with_membership_filter(self, enabled: bool) -> Self {
        if enabled {
            self.with_membership_classifier(AncestorTextClassifier::new())
        } else {
            self.with_membership_classifier(AcceptAll)
        }
    }

    pub fn with_name_resolver(mut self, names: NameResolver) -> Self {
        self.names = names;
        self
    }

    pub async fn run(&self) -> Result<Extraction> {
        self.run_with_cancel(&CancellationToken::new()).await
    }

    /// Loads all content, then extracts unique member groups.
    ///
    /// Fails before touching the viewport when the page is not the groups listing.
    pub async fn run_with_cancel(&self, cancel: &CancellationToken) -> Result<Extraction> {
        let location = self.page.location();
        let Some(base) = self.context.check(&location) else {
            warn!("Refusing to export from {}", location);
            return Err(ExportError::WrongContext { location });
        };
        self.loader.config().validate()?;

        info!("Starting export on {}", location);
        let scroll = self.loader.load_all(&self.page, cancel).await?;
        if let Some(pass) = self.loader.config().render_pass {
            self.loader.scroll_through_page(&self.page, &pass, cancel).await?;
        }

        let document = self.page.document();
        let records = self.collect_records(&document, &base);
        info!("Extracted {} groups", records.len());

        Ok(Extraction { records, scroll })
    }

    fn collect_records(&self, document: &Html, base: &Url) -> Vec<GroupRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for candidate in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = candidate.value().attr("href") else {
                continue;
            };
            let Some(identity) = self.identity.resolve_href(base, href) else {
                continue;
            };
            if seen.contains(&identity.identifier) {
                debug!("Skipping duplicate {}", identity.identifier);
                continue;
            }
            if !self.membership.is_member(candidate) {
                debug!("Skipping suggested group {}", identity.identifier);
                continue;
            }

            let display_name = self.names.resolve(candidate, &identity.identifier);
            debug!("Found group {} ({})", identity.identifier, display_name);
            seen.insert(identity.identifier.clone());
            records.push(GroupRecord::new(
                identity.identifier,
                identity.canonical_link,
                display_name,
            ));
        }

        records
    }
}
