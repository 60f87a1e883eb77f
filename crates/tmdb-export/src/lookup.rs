//! Per-entity lookup against the TMDB API

use tmdb_core::{HttpError, RetryPolicy, get_text, retry_fixed};

use crate::state::EntityClass;

/// Resilient lookup client for one entity class.
///
/// Shared by reference between the worker units of a chunk.
#[derive(Debug, Clone)]
pub struct RemoteLookup {
    class: EntityClass,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
}

impl RemoteLookup {
    pub fn new(class: EntityClass, base_url: &str, api_key: &str, policy: RetryPolicy) -> Self {
        Self {
            class,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            policy,
        }
    }

    /// Full URL for one identifier, without the API key
    pub fn url(&self, id: u64) -> String {
        format!("{}{}", self.base_url, self.class.lookup_path(id))
    }

    /// GET the entity, retrying per the policy
    pub fn try_fetch(&self, id: u64) -> Result<String, HttpError> {
        let url = self.url(id);
        let label = format!("{} {id}", self.class);
        retry_fixed(&label, &self.policy, || {
            get_text(&url, &[("api_key", self.api_key.as_str())])
        })
    }

    /// GET the entity; a failed lookup is logged and becomes an empty body.
    pub fn fetch(&self, id: u64) -> String {
        match self.try_fetch(id) {
            Ok(body) => body,
            Err(e) => {
                log::error!("{} {id}: API request failed: {e}", self.class);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_substitutes_id() {
        let lookup = RemoteLookup::new(
            EntityClass::Person,
            "https://api.themoviedb.org/",
            "key",
            RetryPolicy::default(),
        );
        assert_eq!(lookup.url(287), "https://api.themoviedb.org/3/person/287");
    }

    #[test]
    fn url_keeps_api_key_out() {
        let lookup = RemoteLookup::new(
            EntityClass::Keyword,
            "http://localhost:1",
            "very-secret",
            RetryPolicy::default(),
        );
        assert!(!lookup.url(1).contains("very-secret"));
    }
}
