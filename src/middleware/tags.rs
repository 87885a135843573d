//! Per-request tag set carried in tonic request extensions.

use std::collections::BTreeMap;
use tonic::Request;

/// String tags attached to one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    values: BTreeMap<String, String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply `f` to the tags of `request`, attaching a new set if there is none
    pub fn update<T>(request: &mut Request<T>, f: impl FnOnce(&mut Self)) {
        let extensions = request.extensions_mut();
        match extensions.get_mut::<Self>() {
            Some(tags) => f(tags),
            None => {
                let mut tags = Self::new();
                f(&mut tags);
                extensions.insert(tags);
            }
        }
    }
}

/// Tags attached to `request`, if any
pub fn extract<T>(request: &Request<T>) -> Option<&Tags> {
    request.extensions().get::<Tags>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_without_tags() {
        let request = Request::new(());
        assert!(extract(&request).is_none());
    }

    #[test]
    fn test_update_reuses_existing_set() {
        let mut request = Request::new(());
        Tags::update(&mut request, |tags| {
            tags.set("peer", "127.0.0.1");
        });
        Tags::update(&mut request, |tags| {
            tags.set("method", "Check");
        });

        let tags = extract(&request).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("peer"), Some("127.0.0.1"));
        assert_eq!(tags.get("method"), Some("Check"));
    }
}
