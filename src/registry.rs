//! Ordered, in-memory collection of registered doubles.

use std::sync::Arc;

use axum::http::Method;
use parking_lot::RwLock;

use crate::double::Double;

/// Registry shared between a [`Server`](crate::Server) and its listener.
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// What [`Registry::register_double`] did with the double it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No double had the same (method, url); appended at the end.
    Added,
    /// Replaced the double with the same (method, url) in its slot.
    Replaced,
}

/// The set of currently active doubles.
///
/// Holds at most one double per (method, url). Iteration order is
/// registration order, except that replacing a double keeps the slot of
/// the one it replaced.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    doubles: Vec<Double>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the registry for sharing with a listener.
    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Add a double to the registry.
    pub fn with_double(mut self, double: Double) -> Self {
        self.register_double(double);
        self
    }

    /// Register a double, replacing any double with the same key in place.
    pub fn register_double(&mut self, double: Double) -> Registration {
        match self.doubles.iter_mut().find(|d| d.same_key(&double)) {
            Some(slot) => {
                *slot = double;
                Registration::Replaced
            }
            None => {
                self.doubles.push(double);
                Registration::Added
            }
        }
    }

    /// Find the double keyed by (`method`, `url`).
    pub fn lookup(&self, method: &str, url: &str) -> Option<&Double> {
        self.doubles.iter().find(|d| d.matches(method, url))
    }

    /// Find the first double for `method` whose route equals the
    /// (already percent-decoded) request `path`.
    ///
    /// `HEAD` falls back to the `GET` double when no `HEAD` double exists.
    pub fn find_route(&self, method: &str, path: &str) -> Option<&Double> {
        let exact = self
            .doubles
            .iter()
            .find(|d| d.route() == path && d.method().as_str().eq_ignore_ascii_case(method));

        match exact {
            None if method.eq_ignore_ascii_case(Method::HEAD.as_str()) => {
                self.find_route(Method::GET.as_str(), path)
            }
            found => found,
        }
    }

    /// Remove every double whose url equals `uri`, whatever its method.
    ///
    /// Returns how many doubles were removed.
    pub fn remove_all_doubles_with_uri(&mut self, uri: &str) -> usize {
        let before = self.doubles.len();
        self.doubles.retain(|d| d.url() != uri);
        before - self.doubles.len()
    }

    /// True if any double, for any method, has url `uri`.
    pub fn is_registered(&self, uri: &str) -> bool {
        self.doubles.iter().any(|d| d.url() == uri)
    }

    /// Remove every double.
    pub fn clear(&mut self) {
        self.doubles.clear();
    }

    pub fn len(&self) -> usize {
        self.doubles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doubles.is_empty()
    }

    /// All doubles in registration order.
    pub fn doubles(&self) -> &[Double] {
        &self.doubles
    }
}
