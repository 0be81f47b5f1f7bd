//! Request rewriting and reclassification ahead of the cache lookup.
//!
//! Only one rule fires per request:
//!
//! 1. HTML or JSON with a `?_=` cache-busting marker: drop everything from the
//!    marker onward, keep the category.
//! 2. API caching enabled and the path is allow-listed: drop everything from
//!    `&_=` onward and reclassify as [`Category::Api`].
//! 3. Otherwise the request passes through untouched.

use url::Url;

use crate::category::Category;
use crate::message::Request;

const QUERY_BUSTER: &str = "?_=";
const API_BUSTER: &str = "&_=";

/// Result of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub request: Request,
    pub category: Category,
}

/// Routing rules for cache-busting suffixes and cacheable API calls.
#[derive(Debug, Clone, Default)]
pub struct Router {
    api_cache_enabled: bool,
    api_allowlist: Vec<String>,
}

impl Router {
    pub fn new(api_cache_enabled: bool, api_allowlist: Vec<String>) -> Self {
        Self { api_cache_enabled, api_allowlist }
    }

    /// Whether `path` is an API call eligible for caching.
    pub fn is_cacheable_api(&self, path: &str) -> bool {
        self.api_cache_enabled && self.api_allowlist.iter().any(|p| p == path)
    }

    /// Rewrite `request` and possibly reclassify it.
    pub fn route(&self, category: Category, request: &Request, path: &str) -> Routed {
        if category.strips_cache_buster() && request.url.as_str().contains(QUERY_BUSTER) {
            let url = strip_from(&request.url, QUERY_BUSTER);
            tracing::debug!(from = %request.url, to = %url, "stripped cache-busting query");
            return Routed { request: request.with_url(url), category };
        }

        if self.is_cacheable_api(path) {
            let url = strip_from(&request.url, API_BUSTER);
            tracing::debug!(from = %request.url, to = %url, "routed to api partition");
            return Routed { request: request.with_url(url), category: Category::Api };
        }

        Routed { request: request.clone(), category }
    }
}

/// Truncate the URL at the first occurrence of `marker`.
///
/// A prefix that no longer parses leaves the URL unchanged.
fn strip_from(url: &Url, marker: &str) -> Url {
    let s = url.as_str();
    match s.find(marker) {
        Some(idx) => Url::parse(&s[..idx]).unwrap_or_else(|_| url.clone()),
        None => url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::classify;

    fn req(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn api_router() -> Router {
        Router::new(true, vec!["/rest/getExamPlan".to_string(), "/pv5/v8/1/api/GetUserByGUID".to_string()])
    }

    #[test]
    fn test_html_cache_buster_stripped() {
        let router = Router::default();
        let a = req("https://app.example.com/index.html?_=1700000000");
        let b = req("https://app.example.com/index.html?_=1700009999");
        let plain = req("https://app.example.com/index.html");

        let ra = router.route(Category::Html, &a, a.path());
        let rb = router.route(Category::Html, &b, b.path());
        let rp = router.route(Category::Html, &plain, plain.path());

        assert_eq!(ra.request.url, rb.request.url);
        assert_eq!(ra.request.url, rp.request.url);
        assert_eq!(ra.category, Category::Html);
    }

    #[test]
    fn test_json_cache_buster_stripped() {
        let router = Router::default();
        let r = req("https://app.example.com/config/app.json?_=abc&lang=en");
        let routed = router.route(Category::Json, &r, r.path());
        assert_eq!(routed.request.url.as_str(), "https://app.example.com/config/app.json");
        assert_eq!(routed.category, Category::Json);
    }

    #[test]
    fn test_other_categories_keep_query() {
        let router = Router::default();
        let r = req("https://app.example.com/js/main.js?_=123");
        let routed = router.route(Category::Js, &r, r.path());
        assert_eq!(routed.request.url, r.url);
        assert_eq!(routed.category, Category::Js);
    }

    #[test]
    fn test_api_rule_reclassifies() {
        let router = api_router();
        let r = req("https://app.example.com/rest/getExamPlan?id=7&_=1700000000");
        let category = classify(r.path());
        let routed = router.route(category, &r, r.path());
        assert_eq!(routed.category, Category::Api);
        assert_eq!(routed.request.url.as_str(), "https://app.example.com/rest/getExamPlan?id=7");
    }

    #[test]
    fn test_api_rule_requires_flag() {
        let router = Router::new(false, vec!["/rest/getExamPlan".to_string()]);
        let r = req("https://app.example.com/rest/getExamPlan?id=7&_=1");
        let routed = router.route(Category::PassThrough, &r, r.path());
        assert_eq!(routed.category, Category::PassThrough);
        assert_eq!(routed.request.url, r.url);
    }

    #[test]
    fn test_api_rule_requires_allowlist() {
        let router = api_router();
        for url in ["https://app.example.com/rest/getOther?x=1&_=2", "https://app.example.com/rest/getExamPlan/extra"] {
            let r = req(url);
            let routed = router.route(Category::PassThrough, &r, r.path());
            assert_eq!(routed.category, Category::PassThrough, "{url}");
            assert_eq!(routed.request.url, r.url);
        }
    }

    #[test]
    fn test_html_rule_takes_priority() {
        let router = Router::new(true, vec!["/index.html".to_string()]);
        let r = req("https://app.example.com/index.html?_=1");
        let routed = router.route(Category::Html, &r, r.path());
        assert_eq!(routed.category, Category::Html);
    }

    #[test]
    fn test_rewrite_keeps_method_and_headers() {
        let router = Router::default();
        let mut r = req("https://app.example.com/index.html?_=1");
        r.headers.push(("Accept".into(), "text/html".into()));
        let routed = router.route(Category::Html, &r, r.path());
        assert_eq!(routed.request.method, "GET");
        assert_eq!(routed.request.headers, r.headers);
    }
}
