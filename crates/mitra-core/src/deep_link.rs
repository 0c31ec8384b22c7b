// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Deep link router
//
// Turns an incoming URI into a navigator replace call. Custom-scheme links
// carry the first path segment in the host position
// (mitra-klikquick://live-order/987); universal links are plain HTTPS URLs
// on one of the designated hosts. Both reduce to the same decoded path
// segments.

use crate::routes::{self, NavigationTarget, PushLink};
use crate::types::{AppError, AppSettings};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Screen navigation as performed by the UI shell
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Replace the current stack entry with `target`
    fn replace(&self, target: &NavigationTarget) -> Result<(), AppError>;
}

/// A URI reduced to the app's path space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLink {
    /// Percent-decoded, non-empty path segments
    pub segments: Vec<String>,
    pub query: BTreeMap<String, String>,
}

fn decode_segment(segment: &str) -> Result<String, AppError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| AppError::InvalidLink(format!("Path segment is not UTF-8: {}", e)))
}

fn decode_path(path: &str) -> Result<Vec<String>, AppError> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect()
}

/// Routes URIs from cold start and from live "URL opened" events
pub struct DeepLinkRouter {
    scheme: String,
    universal_hosts: Vec<String>,
    navigator: Arc<dyn Navigator>,
}

impl DeepLinkRouter {
    pub fn new(
        scheme: impl Into<String>,
        universal_hosts: Vec<String>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            universal_hosts: universal_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            navigator,
        }
    }

    pub fn from_settings(settings: &AppSettings, navigator: Arc<dyn Navigator>) -> Self {
        Self::new(
            settings.deep_link_scheme.clone(),
            settings.universal_link_hosts.clone(),
            navigator,
        )
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Reduce a URI to a logical path and query
    pub fn parse(&self, uri: &str) -> Result<LogicalLink, AppError> {
        let url = Url::parse(uri.trim())?;
        let scheme = url.scheme();

        let segments = if scheme == self.scheme {
            let mut segments = match url.host_str().filter(|h| !h.is_empty()) {
                Some(host) => vec![decode_segment(host)?],
                None => Vec::new(),
            };
            segments.extend(decode_path(url.path())?);
            segments
        } else if scheme == "https" {
            let host = url
                .host_str()
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or_default();
            if !self.universal_hosts.contains(&host) {
                return Err(AppError::InvalidLink(format!(
                    "Host is not a universal link host: {}",
                    host
                )));
            }
            decode_path(url.path())?
        } else {
            return Err(AppError::InvalidLink(format!(
                "Unsupported scheme: {}",
                scheme
            )));
        };

        let query = url.query_pairs().into_owned().collect();
        Ok(LogicalLink { segments, query })
    }

    /// Build the custom-scheme URI for a push link.
    ///
    /// The first segment takes the host position; the rest are
    /// percent-encoded one by one so each comes back as a single segment.
    pub fn scheme_url(&self, link: &PushLink) -> Result<Url, AppError> {
        let Some((first, rest)) = link.segments.split_first() else {
            return Err(AppError::InvalidLink("Link has no path".to_string()));
        };
        if let Some(dot) = rest.iter().find(|s| matches!(s.as_str(), "" | "." | "..")) {
            return Err(AppError::InvalidLink(format!(
                "Path segment cannot be encoded: {:?}",
                dot
            )));
        }

        let mut url = Url::parse(&format!("{}://{}", self.scheme, first))?;
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidLink(format!("{} cannot carry a path", self.scheme)))?
            .extend(rest);
        if !link.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &link.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Resolve a URI without navigating
    pub fn resolve(&self, uri: &str) -> Result<Option<NavigationTarget>, AppError> {
        let link = self.parse(uri)?;
        Ok(routes::resolve(&link.segments, &link.query))
    }

    /// Handle a URI delivered while the app is running.
    ///
    /// Returns the target navigated to. Malformed links, foreign hosts and
    /// unknown paths are logged and dropped.
    pub fn handle_url(&self, uri: &str) -> Option<NavigationTarget> {
        let target = match self.resolve(uri) {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::warn!("Unhandled deep link path: {}", uri);
                return None;
            }
            Err(e) => {
                tracing::warn!("Ignoring deep link {}: {}", uri, e);
                return None;
            }
        };

        match self.navigator.replace(&target) {
            Ok(()) => {
                tracing::info!("Deep link {} -> {} {:?}", uri, target.route, target.params);
                Some(target)
            }
            Err(e) => {
                tracing::error!("Navigation to {} failed: {}", target.route, e);
                None
            }
        }
    }

    /// Handle the URL the OS reported at cold start, if any
    pub fn handle_initial_url(&self, uri: Option<&str>) -> Option<NavigationTarget> {
        match uri {
            Some(uri) => {
                tracing::info!("Initial URL: {}", uri);
                self.handle_url(uri)
            }
            None => {
                tracing::debug!("No initial URL");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Navigator that records every replace call
    #[derive(Default)]
    pub struct RecordingNavigator {
        pub calls: Mutex<Vec<NavigationTarget>>,
    }

    impl RecordingNavigator {
        pub fn calls(&self) -> Vec<NavigationTarget> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn replace(&self, target: &NavigationTarget) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(target.clone());
            Ok(())
        }
    }
}
