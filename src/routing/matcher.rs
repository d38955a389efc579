//! Verb dispatch.
//!
//! # Responsibilities
//! - Map each supported HTTP verb to its registration lane
//! - Keep per-verb lanes in registration (first-match) order
//!
//! # Design Decisions
//! - `HttpMethod` is a closed enum, so an unsupported verb cannot reach here
//! - Lanes are plain vectors; lookup is a linear first-match scan

use crate::config::HttpMethod;

/// One first-match lane per supported verb.
#[derive(Debug, Clone)]
pub struct VerbRouter<T> {
    get: Vec<T>,
    post: Vec<T>,
    put: Vec<T>,
    patch: Vec<T>,
    delete: Vec<T>,
    head: Vec<T>,
    options: Vec<T>,
}

impl<T> Default for VerbRouter<T> {
    fn default() -> Self {
        Self {
            get: Vec::new(),
            post: Vec::new(),
            put: Vec::new(),
            patch: Vec::new(),
            delete: Vec::new(),
            head: Vec::new(),
            options: Vec::new(),
        }
    }
}

impl<T> VerbRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_mut(&mut self, method: HttpMethod) -> &mut Vec<T> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Options => &mut self.options,
        }
    }

    /// Routes registered for `method`, in registration order.
    pub fn lane(&self, method: HttpMethod) -> &[T] {
        match method {
            HttpMethod::Get => &self.get,
            HttpMethod::Post => &self.post,
            HttpMethod::Put => &self.put,
            HttpMethod::Patch => &self.patch,
            HttpMethod::Delete => &self.delete,
            HttpMethod::Head => &self.head,
            HttpMethod::Options => &self.options,
        }
    }

    /// Append `entry` to the lane for `method`.
    pub fn register(&mut self, method: HttpMethod, entry: T) {
        self.lane_mut(method).push(entry);
    }

    /// First entry in the `method` lane accepted by `pred`.
    pub fn first_match<R>(&self, method: HttpMethod, pred: impl FnMut(&T) -> Option<R>) -> Option<R> {
        self.lane(method).iter().find_map(pred)
    }

    pub fn len(&self) -> usize {
        HttpMethod::ALL.iter().map(|m| self.lane(*m).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lanes_are_separate() {
        let mut router = VerbRouter::new();
        router.register(HttpMethod::Get, "a");
        router.register(HttpMethod::Post, "b");
        router.register(HttpMethod::Get, "c");

        assert_eq!(router.lane(HttpMethod::Get), &["a", "c"]);
        assert_eq!(router.lane(HttpMethod::Post), &["b"]);
        assert!(router.lane(HttpMethod::Delete).is_empty());
        assert_eq!(router.len(), 3);
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = VerbRouter::new();
        for (i, prefix) in ["/a/b", "/a", "/"].into_iter().enumerate() {
            router.register(HttpMethod::Get, (i, prefix));
        }
        let hit = router.first_match(HttpMethod::Get, |(i, p)| "/a/b/c".starts_with(p).then_some(*i));
        assert_eq!(hit, Some(0));
        let miss = router.first_match(HttpMethod::Put, |(i, _)| Some(*i));
        assert_eq!(miss, None);
    }
}
