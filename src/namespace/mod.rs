//! Namespace-URI to canonical-prefix lookup.
//!
//! Feeds in the wild bind well-known namespaces to arbitrary prefixes
//! (`<dcterms:date>`, `<x:date>`, ...). Element and attribute names are
//! rewritten through this table so downstream extraction only ever sees the
//! canonical prefix (`dc:date`).

/// Well-known namespace URIs and the prefix each one normalizes to.
static NAMESPACES: &[(&str, &str)] = &[
    ("http://www.w3.org/2005/Atom", "atom"),
    ("http://purl.org/atom/ns#", "atom"), // v0.3
    ("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
    ("http://purl.org/rss/1.0/", "rdf"), // rss v1.0 core
    ("http://my.netscape.com/rdf/simple/0.9/", "rdf"), // rss v0.90
    ("http://webns.net/mvcb/", "admin"),
    ("http://creativecommons.org/ns#", "cc"),
    ("http://web.resource.org/cc/", "cc"),
    ("http://purl.org/rss/1.0/modules/content/", "content"),
    ("http://backend.userland.com/creativeCommonsRSSModule", "creativecommons"),
    ("http://cyber.law.harvard.edu/rss/creativeCommonsRssModule.html", "creativecommons"),
    ("http://purl.org/dc/elements/1.1/", "dc"),
    ("http://purl.org/dc/elements/1.0/", "dc"),
    ("http://purl.oclc.org/net/rss_2.0/enc#", "enc"),
    ("http://rssnamespace.org/feedburner/ext/1.0", "feedburner"),
    ("http://www.itunes.com/dtds/podcast-1.0.dtd", "itunes"),
    ("http://www.w3.org/2003/01/geo/wgs84_pos#", "geo"),
    ("http://www.georss.org/georss", "georss"),
    ("http://search.yahoo.com/mrss/", "media"),
    ("http://search.yahoo.com/mrss", "media"), // commonly used but wrong
    ("http://www.pheedo.com/namespace/pheedo", "pheedo"),
    ("http://purl.org/rss/1.0/modules/syndication/", "syn"),
    ("http://feedsync.org/2007/feedsync", "sx"),
    ("http://purl.org/rss/1.0/modules/taxonomy/", "taxo"),
    ("http://purl.org/syndication/thread/1.0", "thr"),
    ("http://www.w3.org/1999/xhtml", "xhtml"),
    ("http://www.w3.org/XML/1998/namespace", "xml"),
];

/// Canonical prefix for a namespace URI, if the URI is a known one.
pub fn prefix(uri: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(ns, _)| *ns == uri)
        .map(|(_, prefix)| *prefix)
}

/// True when `uri` is one of the namespaces canonically named `expected`.
pub fn matches(uri: &str, expected: &str) -> bool {
    prefix(uri) == Some(expected)
}

/// Namespaces whose elements appear with a bare local name after
/// normalization: the core feed vocabularies themselves, plus XHTML so
/// captured inline markup re-serializes without an artificial prefix.
pub fn is_core(uri: &str) -> bool {
    matches!(prefix(uri), Some("atom") | Some("rdf") | Some("xhtml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefixes() {
        assert_eq!(prefix("http://www.w3.org/2005/Atom"), Some("atom"));
        assert_eq!(prefix("http://purl.org/dc/elements/1.1/"), Some("dc"));
        assert_eq!(prefix("http://search.yahoo.com/mrss/"), Some("media"));
        assert_eq!(prefix("http://example.com/unknown"), None);
    }

    #[test]
    fn test_matches_covers_aliases() {
        // Both Atom 1.0 and 0.3 URIs are "atom".
        assert!(matches("http://www.w3.org/2005/Atom", "atom"));
        assert!(matches("http://purl.org/atom/ns#", "atom"));
        // RSS 1.0 core lives under the rdf umbrella.
        assert!(matches("http://purl.org/rss/1.0/", "rdf"));
    }

    #[test]
    fn test_core_namespaces_collapse() {
        assert!(is_core("http://www.w3.org/2005/Atom"));
        assert!(is_core("http://purl.org/rss/1.0/"));
        assert!(is_core("http://www.w3.org/1999/xhtml"));
        assert!(!is_core("http://purl.org/dc/elements/1.1/"));
    }
}
