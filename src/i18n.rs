// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Page translation.
//!
//! Resolves the visitor's language, loads the dictionary for it and rewrites
//! a document: text of `data-i18n` elements, attributes listed in
//! `data-i18n-attr`, the title and the description meta tag. Language
//! switch controls carry `data-lang` and navigate to the localized path.
//!
//! The document is abstract ([`TranslatableDocument`]) so the same rules run
//! against a browser DOM binding, a server-side renderer or a test fixture.

use crate::config::I18nConfig;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Element attribute holding a text translation key.
pub const TEXT_ATTR: &str = "data-i18n";
/// Element attribute holding `attr:key` pairs.
pub const ATTR_MAP_ATTR: &str = "data-i18n-attr";
/// Attribute on language switch controls.
pub const SWITCH_ATTR: &str = "data-lang";

/// Dictionary key for the document title.
pub const TITLE_KEY: &str = "meta.title";
/// Dictionary key for the description meta tag.
pub const DESCRIPTION_KEY: &str = "meta.description";

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Dictionary not found for {0}")]
    NotFound(String),

    #[error("Invalid dictionary: {0}")]
    InvalidDictionary(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Translation strings for one language, keyed by flat dotted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    /// Parse a JSON object. Nested objects flatten to dotted keys.
    pub fn from_json(bytes: &[u8]) -> Result<Self, I18nError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| I18nError::InvalidDictionary(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(I18nError::InvalidDictionary(
                "top level must be an object".to_string(),
            ));
        };

        let mut entries = HashMap::new();
        flatten("", &map, &mut entries);
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat JSON object, as served to the browser.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut HashMap<String, String>) {
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::String(s) => {
                out.insert(full, s.clone());
            }
            Value::Number(n) => {
                out.insert(full, n.to_string());
            }
            Value::Object(inner) => flatten(&full, inner, out),
            // Arrays, booleans and nulls carry no translatable text
            _ => {}
        }
    }
}

/// Where a language choice may come from, in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageSources<'a> {
    /// Explicit override set by the page
    pub forced: Option<&'a str>,
    /// Current page URL or path; `?lang=` acts as an override
    pub page_url: &'a str,
    /// Previously persisted choice
    pub stored: Option<&'a str>,
}

/// Persisted language preference (browser storage, cookie, ...).
pub trait PreferenceStore {
    fn get(&self) -> Option<String>;
    fn set(&mut self, language: &str);
}

/// In-memory preference store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    value: Option<String>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self) -> Option<String> {
        self.value.clone()
    }

    fn set(&mut self, language: &str) {
        self.value = Some(language.to_string());
    }
}

/// Supported languages and the default.
#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    supported: Vec<String>,
    default: String,
}

impl LanguagePolicy {
    pub fn new<I, S>(supported: I, default: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let default = normalize_tag(default);
        let mut supported: Vec<String> = supported
            .into_iter()
            .map(|s| normalize_tag(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        if !supported.contains(&default) {
            supported.insert(0, default.clone());
        }
        Self { supported, default }
    }

    pub fn from_config(config: &I18nConfig) -> Self {
        Self::new(&config.languages, &config.default_language)
    }

    pub fn default_language(&self) -> &str {
        &self.default
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    /// Map a candidate tag onto a supported language, by exact match or by
    /// primary subtag (`es-MX` -> `es`).
    pub fn normalize(&self, candidate: &str) -> Option<&str> {
        let tag = normalize_tag(candidate);
        if tag.is_empty() {
            return None;
        }
        if let Some(exact) = self.supported.iter().find(|s| **s == tag) {
            return Some(exact.as_str());
        }
        let primary = tag.split('-').next().unwrap_or(&tag);
        self.supported
            .iter()
            .find(|s| s.as_str() == primary)
            .map(String::as_str)
    }

    /// Language encoded as the first path segment, if supported.
    pub fn path_language(&self, path: &str) -> Option<&str> {
        let first = path.trim_start_matches('/').split('/').next()?;
        let tag = normalize_tag(first);
        self.supported
            .iter()
            .find(|s| **s == tag)
            .map(String::as_str)
    }

    /// Resolve the active language: forced, then path, then stored, then
    /// default.
    pub fn resolve(&self, sources: &LanguageSources<'_>) -> String {
        let page = parse_page_url(sources.page_url);

        let query_override = page.as_ref().and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| *k == "lang")
                .map(|(_, v)| v.into_owned())
        });

        let path_language = page
            .as_ref()
            .and_then(|url| self.path_language(url.path()).map(str::to_string));

        let chosen = sources
            .forced
            .and_then(|f| self.normalize(f))
            .or_else(|| query_override.as_deref().and_then(|q| self.normalize(q)))
            .map(str::to_string)
            .or(path_language)
            .or_else(|| {
                sources
                    .stored
                    .and_then(|s| self.normalize(s))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default.clone());

        debug!(language = %chosen, "Resolved page language");
        chosen
    }

    /// Start a translation pass for the resolved language.
    pub fn begin(&self, sources: &LanguageSources<'_>) -> PendingTranslation {
        PendingTranslation {
            language: self.resolve(sources),
        }
    }

    /// Path without a leading language segment.
    pub fn strip_language<'p>(&self, path: &'p str) -> &'p str {
        let trimmed = path.trim_start_matches('/');
        if self.path_language(path).is_none() {
            return path;
        }
        match trimmed.split_once('/') {
            // Keep the leading slash of the remainder
            Some((_, rest)) => &path[path.len() - rest.len() - 1..],
            None => "",
        }
    }

    /// Path for `language`: the default language has no prefix.
    pub fn localized_path(&self, path: &str, language: &str) -> String {
        let base = self.strip_language(path);
        let base = if base.is_empty() { "/" } else { base };
        let base = if base.starts_with('/') {
            base.to_string()
        } else {
            format!("/{}", base)
        };

        match self.normalize(language) {
            Some(lang) if lang != self.default => {
                if base == "/" {
                    format!("/{}/", lang)
                } else {
                    format!("/{}{}", lang, base)
                }
            }
            _ => base,
        }
    }

    /// Handle a click on a `data-lang` control: persist the choice and
    /// return the navigation target. Unsupported values are ignored.
    pub fn switch_language(
        &self,
        data_lang: &str,
        current_path: &str,
        store: &mut dyn PreferenceStore,
    ) -> Option<String> {
        let language = self.normalize(data_lang)?.to_string();
        store.set(&language);
        Some(self.localized_path(current_path, &language))
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace('_', "-")
}

fn parse_page_url(page_url: &str) -> Option<Url> {
    Url::parse(page_url).ok().or_else(|| {
        Url::parse("http://localhost/")
            .ok()
            .and_then(|base| base.join(page_url).ok())
    })
}

/// One element of a translatable document.
pub trait TranslatableNode {
    fn attribute(&self, name: &str) -> Option<String>;
    fn set_text(&mut self, text: &str);
    fn set_attribute(&mut self, name: &str, value: &str);
}

/// A document the translator can rewrite.
pub trait TranslatableDocument {
    /// Visit every element carrying `data-i18n` or `data-i18n-attr`.
    fn for_each_node(&mut self, visit: &mut dyn FnMut(&mut dyn TranslatableNode));
    fn set_title(&mut self, title: &str);
    fn set_meta_description(&mut self, description: &str);
    fn set_language(&mut self, language: &str);
}

/// Parse `placeholder:form.name; title:form.tip` into (attribute, key) pairs.
/// Both `;` and `,` separate pairs.
pub fn parse_attr_mapping(mapping: &str) -> Vec<(String, String)> {
    mapping
        .split([';', ','])
        .filter_map(|pair| {
            let (attr, key) = pair.split_once(':')?;
            let (attr, key) = (attr.trim(), key.trim());
            if attr.is_empty() || key.is_empty() {
                None
            } else {
                Some((attr.to_string(), key.to_string()))
            }
        })
        .collect()
}

/// What a translation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub texts: usize,
    pub attributes: usize,
    pub title: bool,
    pub description: bool,
    /// Keys referenced by the document but absent from the dictionary
    pub missing: Vec<String>,
}

/// Rewrite a document with a dictionary. Missing keys leave content as is.
pub fn apply(
    language: &str,
    dictionary: &Dictionary,
    document: &mut dyn TranslatableDocument,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    document.for_each_node(&mut |node: &mut dyn TranslatableNode| {
        if let Some(key) = node.attribute(TEXT_ATTR) {
            let key = key.trim();
            match dictionary.get(key) {
                Some(text) => {
                    node.set_text(text);
                    report.texts += 1;
                }
                None => report.missing.push(key.to_string()),
            }
        }

        if let Some(mapping) = node.attribute(ATTR_MAP_ATTR) {
            for (attr, key) in parse_attr_mapping(&mapping) {
                match dictionary.get(&key) {
                    Some(value) => {
                        node.set_attribute(&attr, value);
                        report.attributes += 1;
                    }
                    None => report.missing.push(key),
                }
            }
        }
    });

    if let Some(title) = dictionary.get(TITLE_KEY) {
        document.set_title(title);
        report.title = true;
    }
    if let Some(description) = dictionary.get(DESCRIPTION_KEY) {
        document.set_meta_description(description);
        report.description = true;
    }
    document.set_language(language);

    if !report.missing.is_empty() {
        debug!(language, missing = ?report.missing, "Translation keys missing");
    }
    report
}

/// A resolved language waiting for its dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTranslation {
    language: String,
}

impl PendingTranslation {
    pub fn language(&self) -> &str {
        &self.language
    }

    /// URL path the dictionary is served from.
    pub fn dictionary_path(&self) -> String {
        format!("/i18n/{}.json", self.language)
    }

    /// Apply the fetched dictionary. Consumes the pending state.
    pub fn apply(
        self,
        dictionary: &Dictionary,
        document: &mut dyn TranslatableDocument,
    ) -> AppliedTranslation {
        let report = apply(&self.language, dictionary, document);
        AppliedTranslation {
            language: self.language,
            report,
        }
    }
}

/// Result of a completed translation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTranslation {
    pub language: String,
    pub report: ApplyReport,
}

/// Dictionaries stored as `{dir}/{lang}.json`.
#[derive(Debug, Clone)]
pub struct DictionaryStore {
    dir: PathBuf,
    policy: LanguagePolicy,
}

impl DictionaryStore {
    pub fn new(dir: impl Into<PathBuf>, policy: LanguagePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    pub fn from_config(config: &I18nConfig) -> Self {
        Self::new(&config.dir, LanguagePolicy::from_config(config))
    }

    pub fn policy(&self) -> &LanguagePolicy {
        &self.policy
    }

    /// Load the dictionary for a supported language.
    pub async fn load(&self, language: &str) -> Result<(String, Dictionary), I18nError> {
        let language = self
            .policy
            .normalize(language)
            .ok_or_else(|| I18nError::UnsupportedLanguage(language.to_string()))?
            .to_string();

        let path = self.dir.join(format!("{}.json", language));
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(I18nError::NotFound(language));
            }
            Err(e) => return Err(e.into()),
        };

        let dictionary = Dictionary::from_json(&bytes)?;
        Ok((language, dictionary))
    }
}
