use crate::error::{ExportError, Result};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

pub const FACEBOOK_ORIGIN: &str = "https://www.facebook.com";
pub const GROUPS_PREFIX: &str = "/groups/";

/// Path segments under the groups prefix that are system pages, never groups.
pub const EXCLUDED_IDENTIFIERS: &[&str] =
    &["feed", "joins", "discover", "notifications", "search", "create"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identifier: String,
    pub canonical_link: String,
}

/// Decides whether a link points at a single group and canonicalizes it.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    origin: String,
    domain: String,
    prefix: String,
    path_pattern: Regex,
    excluded: HashSet<String>,
}

impl IdentityResolver {
    pub fn new(origin: &str, prefix: &str) -> Result<Self> {
        let parsed = Url::parse(origin)
            .map_err(|e| ExportError::InvalidConfig(format!("Invalid origin {}: {}", origin, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ExportError::InvalidConfig(format!("Origin {} has no host", origin)))?;
        let domain = host.strip_prefix("www.").unwrap_or(host).to_string();

        let prefix = format!("/{}/", prefix.trim_matches('/'));
        let path_pattern = Regex::new(&format!(r"^{}([A-Za-z0-9_.]+)/?$", regex::escape(&prefix)))
            .map_err(|e| ExportError::InvalidConfig(format!("Invalid prefix {}: {}", prefix, e)))?;

        Ok(Self {
            origin: origin.trim_end_matches('/').to_string(),
            domain,
            prefix,
            path_pattern,
            excluded: EXCLUDED_IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Resolver for `https://www.facebook.com/groups/<id>`.
    pub fn facebook() -> Self {
        Self::new(FACEBOOK_ORIGIN, GROUPS_PREFIX).expect("built-in origin and prefix are valid")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn canonical_link(&self, identifier: &str) -> String {
        format!("{}{}{}", self.origin, self.prefix, identifier)
    }

    /// Resolves an absolute URL. Query strings and fragments are ignored; any
    /// path below the group itself is a rejection.
    pub fn resolve(&self, raw_url: &str) -> Option<ResolvedIdentity> {
        let url = Url::parse(raw_url).ok()?;
        self.resolve_url(&url)
    }

    /// Resolves an `href` attribute value relative to the page it was found on.
    pub fn resolve_href(&self, base: &Url, href: &str) -> Option<ResolvedIdentity> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") || href.starts_with('#') {
            return None;
        }
        let url = base.join(href).ok()?;
        self.resolve_url(&url)
    }

    fn resolve_url(&self, url: &Url) -> Option<ResolvedIdentity> {
        if !matches!(url.scheme(), "http" | "https") || !self.is_same_domain(url) {
            return None;
        }

        let captures = self.path_pattern.captures(url.path())?;
        let identifier = captures.get(1)?.as_str();
        if self.excluded.contains(identifier) {
            return None;
        }

        Some(ResolvedIdentity {
            identifier: identifier.to_string(),
            canonical_link: self.canonical_link(identifier),
        })
    }

    fn is_same_domain(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => host == self.domain || host.ends_with(&format!(".{}", self.domain)),
            None => false,
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::facebook()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_numeric_and_named_groups() {
        let resolver = IdentityResolver::facebook();

        let numeric = resolver.resolve("https://www.facebook.com/groups/123456").unwrap();
        assert_eq!(numeric.identifier, "123456");
        assert_eq!(numeric.canonical_link, "https://www.facebook.com/groups/123456");

        let named = resolver.resolve("https://www.facebook.com/groups/rust.lang_IL/").unwrap();
        assert_eq!(named.identifier, "rust.lang_IL");
        assert_eq!(named.canonical_link, "https://www.facebook.com/groups/rust.lang_IL");
    }

    #[test]
    fn test_canonical_link_ignores_query_host_case_and_slash() {
        let resolver = IdentityResolver::facebook();
        let variants = [
            "https://www.facebook.com/groups/123",
            "https://www.facebook.com/groups/123/",
            "https://WWW.Facebook.com/groups/123?ref=bookmarks",
            "http://m.facebook.com/groups/123/#top",
            "https://web.facebook.com/groups/123?__cft__[0]=abc",
        ];
        for variant in variants {
            let resolved = resolver.resolve(variant).unwrap();
            assert_eq!(resolved.identifier, "123", "url: {}", variant);
            assert_eq!(
                resolved.canonical_link, "https://www.facebook.com/groups/123",
                "url: {}",
                variant
            );
        }
    }

    #[test]
    fn test_rejects_sub_paths() {
        let resolver = IdentityResolver::facebook();
        assert!(resolver.resolve("https://www.facebook.com/groups/456/subpage").is_none());
        assert!(resolver.resolve("https://www.facebook.com/groups/456/members/").is_none());
        assert!(resolver.resolve("https://www.facebook.com/groups/").is_none());
    }

    #[test]
    fn test_rejects_system_pages() {
        let resolver = IdentityResolver::facebook();
        for id in EXCLUDED_IDENTIFIERS {
            let url = format!("https://www.facebook.com/groups/{}/", id);
            assert!(resolver.resolve(&url).is_none(), "url: {}", url);
        }
    }

    #[test]
    fn test_rejects_other_hosts_and_characters() {
        let resolver = IdentityResolver::facebook();
        assert!(resolver.resolve("https://example.com/groups/123").is_none());
        assert!(resolver.resolve("https://notfacebook.com/groups/123").is_none());
        assert!(resolver.resolve("https://www.facebook.com/groups/my-group").is_none());
        assert!(resolver.resolve("mailto:someone@facebook.com").is_none());
        assert!(resolver.resolve("not a url").is_none());
    }

    #[test]
    fn test_resolve_href_relative_to_page() {
        let resolver = IdentityResolver::facebook();
        let base = Url::parse("https://www.facebook.com/groups/joins/").unwrap();

        let resolved = resolver.resolve_href(&base, "/groups/987/?ref=share").unwrap();
        assert_eq!(resolved.identifier, "987");
        assert_eq!(resolved.canonical_link, "https://www.facebook.com/groups/987");

        assert!(resolver.resolve_href(&base, "#").is_none());
        assert!(resolver.resolve_href(&base, "javascript:void(0)").is_none());
        assert!(resolver.resolve_href(&base, "").is_none());
    }

    #[test]
    fn test_identifiers_match_charset() {
        let resolver = IdentityResolver::facebook();
        let charset = Regex::new(r"^[A-Za-z0-9_.]+$").unwrap();
        let urls = [
            "https://www.facebook.com/groups/abc.def",
            "https://www.facebook.com/groups/A_1",
            "https://www.facebook.com/groups/42/",
        ];
        for url in urls {
            let resolved = resolver.resolve(url).unwrap();
            assert!(charset.is_match(&resolved.identifier));
            assert!(!EXCLUDED_IDENTIFIERS.contains(&resolved.identifier.as_str()));
        }
    }

    #[test]
    fn test_custom_origin_and_prefix() {
        let resolver = IdentityResolver::new("https://example.org/", "records").unwrap();
        assert_eq!(resolver.prefix(), "/records/");
        let resolved = resolver.resolve("https://example.org/records/123").unwrap();
        assert_eq!(resolved.canonical_link, "https://example.org/records/123");
        assert!(IdentityResolver::new("no origin", "records").is_err());
    }
}
