use thiserror::Error;

use crate::normalize::{FilterKind, normalize};

/// A reference resource the selected text can be looked up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    pub title: String,
    pub url_template: String,
    pub filter: FilterKind,
}

impl LookupTarget {
    pub fn new(title: impl Into<String>, url_template: impl Into<String>, filter: FilterKind) -> Self {
        Self {
            title: title.into(),
            url_template: url_template.into(),
            filter,
        }
    }

    /// The URL to open for `text`: the template followed by the filtered text.
    pub fn search_url(&self, text: &str) -> String {
        let fragment = normalize(text, self.filter);
        let mut url = String::with_capacity(self.url_template.len() + fragment.len());
        url.push_str(&self.url_template);
        url.push_str(&fragment);
        url
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown lookup target: {0}")]
    NotFound(String),
    #[error("duplicate lookup target id: {0}")]
    DuplicateId(String),
    #[error("lookup target {0} has an empty title")]
    EmptyTitle(String),
    #[error("lookup target {id} has an invalid url template: {template}")]
    InvalidTemplate { id: String, template: String },
}

/// Ordered, immutable set of lookup targets keyed by id.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<(String, LookupTarget)>,
}

impl Registry {
    /// Build a registry, keeping the given order.
    pub fn new<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, LookupTarget)>,
        S: Into<String>,
    {
        let mut registry = Self {
            entries: Vec::new(),
        };
        for (id, target) in entries {
            let id = id.into();
            if registry.position(&id).is_some() {
                return Err(RegistryError::DuplicateId(id));
            }
            if target.title.trim().is_empty() {
                return Err(RegistryError::EmptyTitle(id));
            }
            if !is_absolute_http_prefix(&target.url_template) {
                return Err(RegistryError::InvalidTemplate {
                    id,
                    template: target.url_template,
                });
            }
            registry.entries.push((id, target));
        }
        Ok(registry)
    }

    /// The five Icelandic reference resources.
    pub fn builtin() -> Self {
        let entries = vec![
            (
                "binHeadword".to_string(),
                LookupTarget::new(
                    "Morphology (search headword only)",
                    "http://bin.arnastofnun.is/leit/?q=",
                    FilterKind::None,
                ),
            ),
            (
                "binInflections".to_string(),
                LookupTarget::new(
                    "Morphology (search headword and inflections)",
                    "http://bin.arnastofnun.is/leit/?ordmyndir=on&q=",
                    FilterKind::None,
                ),
            ),
            (
                "isenHeadword".to_string(),
                LookupTarget::new(
                    "English translation (headword only)",
                    "http://digicoll.library.wisc.edu/cgi-bin/IcelOnline/IcelOnline.TEId-idx?type=simple&size=First+100&rgn=lemma&submit=Search&q1=",
                    FilterKind::Diacritics,
                ),
            ),
            (
                "isenFulltext".to_string(),
                LookupTarget::new(
                    "English translation (full text)",
                    "http://digicoll.library.wisc.edu/cgi-bin/IcelOnline/IcelOnline.TEId-idx?type=simple&size=First+100&rgn=dentry&submit=Search&q1=",
                    FilterKind::Diacritics,
                ),
            ),
            (
                "googleTranslate".to_string(),
                LookupTarget::new(
                    "Machine translation by Google",
                    "http://translate.google.com/#is/en/",
                    FilterKind::UrlEncode,
                ),
            ),
        ];
        Self { entries }
    }

    pub fn list(&self) -> &[(String, LookupTarget)] {
        &self.entries
    }

    pub fn resolve(&self, id: &str) -> Result<&LookupTarget, RegistryError> {
        self.position(id)
            .map(|idx| &self.entries[idx].1)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Linear scan; the registry only ever holds a handful of targets.
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key == id)
    }
}

fn is_absolute_http_prefix(template: &str) -> bool {
    let rest = template
        .strip_prefix("http://")
        .or_else(|| template.strip_prefix("https://"));
    match rest {
        Some(rest) => {
            let host_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            host_len > 0 && !rest.chars().any(|c| c.is_whitespace())
        }
        None => false,
    }
}
