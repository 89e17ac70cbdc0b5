//! Route classification: HTTP method + URL -> canonical action.
//!
//! Tables are tried in declared priority order and entries within a table in
//! declared order; the first entry whose method matches exactly and whose
//! pattern matches the end of the URL wins.
//!
//! Patterns are suffix matches. The generated expression carries a trailing
//! `$` but no leading `^`, so `/containers/json` also classifies
//! `/v1.40/containers/json`. Versioned API prefixes rely on this.

use std::sync::LazyLock;

use regex::Regex;

/// Wildcard token inside a route pattern.
pub const WILDCARD_TOKEN: &str = ".+";
/// Character class a wildcard token expands to (first occurrence only).
pub const WILDCARD_CLASS: &str = "[a-zA-Z0-9_.:/-]+";
/// Action of a request no route recognises.
pub const UNCLASSIFIED: &str = "";

/// One static route: exact method, URL pattern, resulting action.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub method: &'static str,
    pub pattern: &'static str,
    pub action: &'static str,
}

/// Named group of routes. Groups are scanned in the order they are listed.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    pub name: &'static str,
    pub entries: &'static [RouteEntry],
}

const fn route(method: &'static str, pattern: &'static str, action: &'static str) -> RouteEntry {
    RouteEntry { method, pattern, action }
}

pub static DAEMON_ROUTES: &[RouteEntry] = &[
    route("GET", "/events", "isulad_events"),
    route("GET", "/version", "isulad_version"),
    route("POST", "/auth", "isulad_auth"),
    route("GET", "/_ping", "isulad_ping"),
    route("GET", "/info", "isulad_info"),
];

pub static IMAGE_ROUTES: &[RouteEntry] = &[
    route("POST", "/build", "image_build"),
    route("GET", "/images/.+/get", "images_archive"),
    route("GET", "/images/search", "images_search"),
    route("POST", "/images/.+/tag", "image_tag"),
    route("GET", "/images/.+/json", "image_inspect"),
    route("DELETE", "/images/.+", "image_delete"),
    route("GET", "/images/.+/history", "image_history"),
    route("POST", "/images/.+/push", "image_push"),
    route("POST", "/images/create", "image_create"),
    route("POST", "/images/load", "images_load"),
    route("GET", "/images/json", "image_list"),
];

pub static VOLUME_ROUTES: &[RouteEntry] = &[
    route("GET", "/volumes/.+", "volume_inspect"),
    route("GET", "/volumes", "volume_list"),
    route("POST", "/volumes/create", "volume_create"),
    route("DELETE", "/volumes/.+", "volume_remove"),
];

pub static NETWORK_ROUTES: &[RouteEntry] = &[
    route("GET", "/networks/.+", "network_inspect"),
    route("GET", "/networks", "network_list"),
    route("POST", "/networks/create", "network_create"),
    route("POST", "/networks/.+/connect", "network_connect"),
    route("POST", "/networks/.+/disconnect", "network_disconnect"),
    route("DELETE", "/networks/.+", "network_remove"),
];

pub static CONTAINER_ROUTES: &[RouteEntry] = &[
    route("POST", "/commit", "container_commit"),
    route("POST", "/containers/.+/wait", "container_wait"),
    route("POST", "/containers/.+/resize", "container_resize"),
    route("GET", "/containers/.+/export", "container_export"),
    route("POST", "/containers/.+/stop", "container_stop"),
    route("POST", "/containers/.+/kill", "container_kill"),
    route("POST", "/containers/.+/restart", "container_restart"),
    route("POST", "/containers/.+/start", "container_start"),
    route("POST", "/containers/.+/update", "container_update"),
    route("POST", "/containers/.+/exec", "container_exec_create"),
    route("POST", "/containers/.+/unpause", "container_unpause"),
    route("POST", "/containers/.+/pause", "container_pause"),
    route("POST", "/containers/.+/copy", "container_copyfiles"),
    route("PUT", "/containers/.+/archive", "container_archive_extract"),
    route("HEAD", "/containers/.+/archive", "container_archive_info"),
    route("GET", "/containers/.+/archive", "container_archive"),
    route("GET", "/containers/.+/attach/ws", "container_attach_websocket"),
    route("POST", "/containers/.+/attach", "container_attach"),
    route("GET", "/containers/json", "container_list"),
    route("GET", "/containers/.+/json", "container_inspect"),
    route("DELETE", "/containers/.+", "container_delete"),
    route("POST", "/containers/.+/rename", "container_rename"),
    route("GET", "/containers/.+/stats", "container_stats"),
    route("GET", "/containers/.+/changes", "container_changes"),
    route("GET", "/containers/.+/top", "container_top"),
    route("GET", "/containers/.+/logs", "container_logs"),
    route("POST", "/containers/create", "container_create"),
    route("GET", "/exec/.+/json", "container_exec_inspect"),
    route("POST", "/exec/.+/start", "container_exec_start"),
];

/// Built-in tables in priority order.
pub static ROUTE_TABLES: &[RouteTable] = &[
    RouteTable { name: "daemon", entries: DAEMON_ROUTES },
    RouteTable { name: "image", entries: IMAGE_ROUTES },
    RouteTable { name: "volume", entries: VOLUME_ROUTES },
    RouteTable { name: "network", entries: NETWORK_ROUTES },
    RouteTable { name: "container", entries: CONTAINER_ROUTES },
];

static BUILTIN: LazyLock<RouteClassifier> = LazyLock::new(|| RouteClassifier::new(ROUTE_TABLES));

/// Expression a route pattern compiles to: first wildcard expanded, `$` appended.
pub fn route_expression(pattern: &str) -> String {
    let mut expr = pattern.replacen(WILDCARD_TOKEN, WILDCARD_CLASS, 1);
    expr.push('$');
    expr
}

#[derive(Debug)]
struct CompiledRoute {
    method: &'static str,
    action: &'static str,
    // None => the generated expression did not compile; never matches.
    matcher: Option<Regex>,
}

/// Route tables flattened in scan order with their expressions precompiled.
#[derive(Debug)]
pub struct RouteClassifier {
    routes: Vec<CompiledRoute>,
}

impl RouteClassifier {
    pub fn new(tables: &[RouteTable]) -> Self {
        let mut routes = Vec::with_capacity(tables.iter().map(|t| t.entries.len()).sum());
        for table in tables {
            for entry in table.entries {
                let expr = route_expression(entry.pattern);
                let matcher = match Regex::new(&expr) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!(
                            table = table.name,
                            pattern = entry.pattern,
                            error = %e,
                            "route pattern does not compile; entry will never match"
                        );
                        None
                    }
                };
                routes.push(CompiledRoute {
                    method: entry.method,
                    action: entry.action,
                    matcher,
                });
            }
        }
        Self { routes }
    }

    /// Shared classifier over [`ROUTE_TABLES`].
    pub fn builtin() -> &'static RouteClassifier {
        &BUILTIN
    }

    /// Map a request to its action, or [`UNCLASSIFIED`] when nothing matches.
    pub fn classify(&self, method: &str, url: &str) -> &'static str {
        let path = strip_query(url);
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .find(|r| r.matcher.as_ref().is_some_and(|re| re.is_match(path)))
            .map_or(UNCLASSIFIED, |r| r.action)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Classify against the built-in tables.
pub fn classify(method: &str, url: &str) -> &'static str {
    RouteClassifier::builtin().classify(method, url)
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_expands_first_wildcard_only() {
        assert_eq!(route_expression("/images/.+/tag"), "/images/[a-zA-Z0-9_.:/-]+/tag$");
        assert_eq!(route_expression("/a/.+/b/.+"), "/a/[a-zA-Z0-9_.:/-]+/b/.+$");
        assert_eq!(route_expression("/volumes"), "/volumes$");
    }

    #[test]
    fn query_string_is_ignored() {
        assert_eq!(classify("GET", "/containers/json?all=1&limit=5"), "container_list");
        assert_eq!(classify("GET", "/images/json?"), "image_list");
    }

    #[test]
    fn method_is_case_sensitive() {
        assert_eq!(classify("get", "/containers/json"), UNCLASSIFIED);
    }

    #[test]
    fn unknown_route_is_unclassified() {
        assert_eq!(classify("PATCH", "/containers/abc/start"), UNCLASSIFIED);
        assert_eq!(classify("GET", "/swarm"), UNCLASSIFIED);
    }

    #[test]
    fn suffix_match_tolerates_prefix() {
        assert_eq!(classify("GET", "/v1.40/containers/json"), "container_list");
        assert_eq!(classify("GET", "/anything/at/all/_ping"), "isulad_ping");
    }

    #[test]
    fn earlier_table_wins() {
        // network table precedes container table and both match
        assert_eq!(classify("GET", "/containers/networks/abc/json"), "network_inspect");
    }

    #[test]
    fn broken_pattern_is_skipped_not_fatal() {
        static BROKEN: &[RouteEntry] = &[
            route("GET", "/bad/(", "never"),
            route("GET", "/bad/.+", "fallback"),
        ];
        let c = RouteClassifier::new(&[RouteTable { name: "broken", entries: BROKEN }]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.classify("GET", "/bad/x"), "fallback");
    }

    #[test]
    fn first_entry_within_table_wins() {
        static DUP: &[RouteEntry] = &[
            route("POST", "/things/.+", "first"),
            route("POST", "/things/.+", "second"),
        ];
        let c = RouteClassifier::new(&[RouteTable { name: "dup", entries: DUP }]);
        assert_eq!(c.classify("POST", "/things/x"), "first");
    }

    #[test]
    fn classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("POST", "/containers/abc/stop"), "container_stop");
        }
    }
}
