// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Route table
//
// The one declarative mapping from logical paths and push keys to screens.
// Both the deep-link router and the push bridge resolve through it.

use std::collections::BTreeMap;
use std::fmt;

/// Parameter carrying the identifier of a detail route
pub const ID_PARAM: &str = "id";
/// Optional push data field forwarded to the target screen
pub const TRANSACTION_ID_PARAM: &str = "transaction_id";

/// Screens reachable by navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    CompleteProfile,
    Contacts,
    ContactDetail,
    Balance,
    TopUp,
    ConfirmTopUp,
    Withdraw,
    Transfer,
    History,
    Transactions,
    LiveOrders,
    LiveOrderDetail,
    ManualTransaction,
}

impl Route {
    /// Screen path as registered with the navigator
    pub fn screen(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Home => "/home",
            Self::CompleteProfile => "/complete-profile",
            Self::Contacts => "/contacts",
            Self::ContactDetail => "/contact/[id]",
            Self::Balance => "/balance",
            Self::TopUp => "/top-up",
            Self::ConfirmTopUp => "/confirm-top-up/[id]",
            Self::Withdraw => "/withdraw",
            Self::Transfer => "/transfer",
            Self::History => "/history",
            Self::Transactions => "/transactions",
            Self::LiveOrders => "/live-order",
            Self::LiveOrderDetail => "/live-order/[id]",
            Self::ManualTransaction => "/manual-transaction",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.screen())
    }
}

/// Where to navigate and with which parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub route: Route,
    pub params: BTreeMap<String, String>,
}

impl NavigationTarget {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Push `navigate_to` key and the logical paths it opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushRoute {
    pub key: &'static str,
    pub path: &'static str,
    /// Prefix used instead of `path` when a transaction id is present
    pub detail_prefix: Option<&'static str>,
}

const LITERAL_ROUTES: &[(&str, Route)] = &[
    ("login", Route::Login),
    ("home", Route::Home),
    ("complete-profile", Route::CompleteProfile),
    ("contacts", Route::Contacts),
    ("balance", Route::Balance),
    ("top-up", Route::TopUp),
    ("withdraw", Route::Withdraw),
    ("transfer", Route::Transfer),
    ("history", Route::History),
    ("transactions", Route::Transactions),
    ("live-order", Route::LiveOrders),
    ("manual-transaction", Route::ManualTransaction),
];

const DETAIL_ROUTES: &[(&str, Route)] = &[
    ("contact", Route::ContactDetail),
    ("live-order", Route::LiveOrderDetail),
    ("confirm-top-up", Route::ConfirmTopUp),
];

const PUSH_ROUTES: &[PushRoute] = &[
    PushRoute {
        key: "live-order",
        path: "/live-order",
        detail_prefix: Some("/live-order"),
    },
    PushRoute {
        key: "history",
        path: "/history",
        detail_prefix: None,
    },
    PushRoute {
        key: "transaksi",
        path: "/transactions",
        detail_prefix: None,
    },
    PushRoute {
        key: "saldo",
        path: "/balance",
        detail_prefix: None,
    },
];

/// Resolve decoded path segments plus query parameters to a target.
///
/// Empty segments are ignored, so `/home/` and `//home` match `/home`.
/// A segment is taken as is, slashes and all, so detail ids arrive intact.
/// Returns `None` for paths outside the table.
pub fn resolve<S: AsRef<str>>(
    segments: &[S],
    query: &BTreeMap<String, String>,
) -> Option<NavigationTarget> {
    let segments: Vec<&str> = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect();

    let mut target = match segments.as_slice() {
        [name] => LITERAL_ROUTES
            .iter()
            .find(|(literal, _)| literal == name)
            .map(|(_, route)| NavigationTarget::new(*route))?,
        [prefix, _] => DETAIL_ROUTES
            .iter()
            .find(|(literal, _)| literal == prefix)
            .map(|(_, route)| NavigationTarget::new(*route))?,
        _ => return None,
    };

    for (key, value) in query {
        target.params.insert(key.clone(), value.clone());
    }
    if let [_, id] = segments.as_slice() {
        target.params.insert(ID_PARAM.to_string(), (*id).to_string());
    }

    Some(target)
}

/// Split a plain logical path such as `/live-order/987` into segments
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Look up a push key
pub fn push_route(key: &str) -> Option<&'static PushRoute> {
    PUSH_ROUTES.iter().find(|route| route.key == key)
}

/// Logical path and query a push `navigate_to` key opens.
///
/// Segments are unescaped; whoever turns the link into a URI encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushLink {
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

/// Link for a push `navigate_to` key.
///
/// A transaction id selects the detail route when the key has one,
/// otherwise it travels as a query parameter.
pub fn push_link(key: &str, transaction_id: Option<&str>) -> Option<PushLink> {
    let route = push_route(key)?;
    let transaction_id = transaction_id.map(str::trim).filter(|id| !id.is_empty());

    Some(match (transaction_id, route.detail_prefix) {
        (Some(id), Some(prefix)) => {
            let mut segments = path_segments(prefix);
            segments.push(id.to_string());
            PushLink {
                segments,
                query: Vec::new(),
            }
        }
        (Some(id), None) => PushLink {
            segments: path_segments(route.path),
            query: vec![(TRANSACTION_ID_PARAM.to_string(), id.to_string())],
        },
        (None, _) => PushLink {
            segments: path_segments(route.path),
            query: Vec::new(),
        },
    })
}

/// Every literal path the table knows, with its route
pub fn literal_routes() -> impl Iterator<Item = (String, Route)> {
    LITERAL_ROUTES
        .iter()
        .map(|(literal, route)| (format!("/{}", literal), *route))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_query() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn resolve_path(path: &str) -> Option<NavigationTarget> {
        resolve(&path_segments(path), &no_query())
    }

    #[test]
    fn test_literal_paths_resolve() {
        for (path, route) in literal_routes() {
            let target = resolve_path(&path).unwrap();
            assert_eq!(target.route, route, "path {}", path);
            assert!(target.params.is_empty());
        }
    }

    #[test]
    fn test_detail_paths_extract_id() {
        let target = resolve_path("/live-order/987").unwrap();
        assert_eq!(target.route, Route::LiveOrderDetail);
        assert_eq!(target.param(ID_PARAM), Some("987"));

        let target = resolve_path("/contact/c-12/").unwrap();
        assert_eq!(target.route, Route::ContactDetail);
        assert_eq!(target.param(ID_PARAM), Some("c-12"));

        let target = resolve_path("/confirm-top-up/TU77").unwrap();
        assert_eq!(target.route, Route::ConfirmTopUp);
    }

    #[test]
    fn test_detail_id_segment_is_kept_whole() {
        for id in ["A/B", "12#3", "5?x=1", "TX 9"] {
            let target = resolve(&["live-order", id], &no_query()).unwrap();
            assert_eq!(target.route, Route::LiveOrderDetail);
            assert_eq!(target.param(ID_PARAM), Some(id));
            assert_eq!(target.params.len(), 1);
        }
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(resolve_path("/settings"), None);
        assert_eq!(resolve_path("/"), None);
        assert_eq!(resolve_path("/contacts/1"), None);
        assert_eq!(resolve_path("/live-order/1/extra"), None);
        assert_eq!(resolve_path("/Home"), None);
    }

    #[test]
    fn test_query_params_preserved() {
        let mut query = BTreeMap::new();
        query.insert("ref".to_string(), "promo 1".to_string());
        let target = resolve(&["top-up"], &query).unwrap();
        assert_eq!(target.param("ref"), Some("promo 1"));
    }

    #[test]
    fn test_push_links() {
        let link = push_link("saldo", None).unwrap();
        assert_eq!(link.segments, vec!["balance"]);
        assert!(link.query.is_empty());

        assert_eq!(
            push_link("live-order", Some("987")).unwrap().segments,
            vec!["live-order", "987"]
        );
        assert_eq!(
            push_link("live-order", Some("A/B")).unwrap().segments,
            vec!["live-order", "A/B"]
        );

        let link = push_link("transaksi", Some("T1")).unwrap();
        assert_eq!(link.segments, vec!["transactions"]);
        assert_eq!(
            link.query,
            vec![(TRANSACTION_ID_PARAM.to_string(), "T1".to_string())]
        );

        assert!(push_link("history", Some("  ")).unwrap().query.is_empty());
        assert_eq!(push_link("promo", None), None);
    }

    #[test]
    fn test_push_links_resolve_through_table() {
        for key in ["live-order", "history", "transaksi", "saldo"] {
            let link = push_link(key, None).unwrap();
            assert!(resolve(&link.segments, &no_query()).is_some(), "key {}", key);
        }
    }
}
