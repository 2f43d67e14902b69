use std::collections::HashMap;

use serde::Deserialize;

const WILDCARD: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid policy json: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy {
    rules: HashMap<String, Vec<String>>,
}

impl AccessPolicy {
    pub fn from_json(input: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn is_allowed(&self, consumer: &str, full_method: &str) -> bool {
        let Some(patterns) = self.rules.get(consumer) else {
            return false;
        };

        let Some((service, method)) = split_method(full_method) else {
            return false;
        };

        patterns.iter().any(|pattern| match split_method(pattern) {
            Some((p_service, p_method)) => {
                p_service == service && (p_method == WILDCARD || p_method == method)
            }
            None => false,
        })
    }

    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn patterns(&self, consumer: &str) -> Option<&[String]> {
        self.rules.get(consumer).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// Only the part count is checked: "/svc/method" must split into exactly three parts.
fn split_method(full_method: &str) -> Option<(&str, &str)> {
    let mut parts = full_method.split('/');
    parts.next()?;
    let service = parts.next()?;
    let method = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((service, method))
}
