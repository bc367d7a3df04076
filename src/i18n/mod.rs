//! # Localization
//!
//! Locale bundles keyed by Discord locale tag (`en-US`, `es-ES`, ...). Each
//! bundle is a YAML document of `namespace -> key -> template`, and templates
//! use `{{name}}` placeholders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

type Bundle = HashMap<String, HashMap<String, String>>;

const BUILTIN_BUNDLES: &[(&str, &str)] = &[
    ("en-US", include_str!("../../locales/en-US.yaml")),
    ("es-ES", include_str!("../../locales/es-ES.yaml")),
];

pub struct I18n {
    bundles: HashMap<String, Bundle>,
    default_tag: String,
    placeholder: Regex,
}

impl I18n {
    /// Create a resolver with no bundles loaded
    pub fn new(default_tag: &str) -> Self {
        Self {
            bundles: HashMap::new(),
            default_tag: default_tag.to_string(),
            // Static pattern, cannot fail to compile
            placeholder: Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder pattern"),
        }
    }

    /// Create a resolver with the bundles compiled into the binary
    pub fn builtin(default_tag: &str) -> Result<Self> {
        let mut i18n = Self::new(default_tag);
        for (tag, source) in BUILTIN_BUNDLES {
            i18n.add_bundle(tag, source)?;
        }
        if !i18n.bundles.contains_key(default_tag) {
            return Err(anyhow!("No locale bundle for default locale {default_tag}"));
        }
        Ok(i18n)
    }

    /// Parse a YAML bundle and merge it over any bundle already loaded for `tag`
    pub fn add_bundle(&mut self, tag: &str, source: &str) -> Result<()> {
        let parsed: Bundle = serde_yaml::from_str(source)
            .with_context(|| format!("Invalid locale bundle for {tag}"))?;
        let bundle = self.bundles.entry(tag.to_string()).or_default();
        for (namespace, keys) in parsed {
            bundle.entry(namespace).or_default().extend(keys);
        }
        Ok(())
    }

    /// Load every `<tag>.yaml` file in `dir`, returning how many bundles were read
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read locales directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            let Some(tag) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_yaml {
                continue;
            }
            let source = std::fs::read_to_string(&path)?;
            self.add_bundle(tag, &source)?;
            debug!("Loaded locale bundle {tag} from {}", path.display());
            loaded += 1;
        }
        info!("Loaded {loaded} locale bundle(s) from {}", dir.display());
        Ok(loaded)
    }

    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    pub fn has_locale(&self, tag: &str) -> bool {
        self.bundles.contains_key(tag)
    }

    /// Available locale tags, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Bind a text resolver to the closest available locale
    pub fn set_locale(self: &Arc<Self>, tag: &str) -> LocaleText {
        LocaleText {
            tag: self.resolve_tag(tag).to_string(),
            i18n: Arc::clone(self),
        }
    }

    pub fn default_locale(self: &Arc<Self>) -> LocaleText {
        let tag = self.default_tag.clone();
        LocaleText {
            tag,
            i18n: Arc::clone(self),
        }
    }

    /// Exact tag, then a bundle sharing the language prefix, then the default
    fn resolve_tag<'a>(&'a self, tag: &'a str) -> &'a str {
        if self.bundles.contains_key(tag) {
            return tag;
        }
        let language = tag.split('-').next().unwrap_or(tag);
        let mut same_language: Vec<&str> = self
            .bundles
            .keys()
            .map(String::as_str)
            .filter(|candidate| candidate.split('-').next() == Some(language))
            .collect();
        same_language.sort_unstable();
        same_language
            .first()
            .copied()
            .unwrap_or(self.default_tag.as_str())
    }

    fn lookup(&self, tag: &str, key: &str) -> Option<&str> {
        let (namespace, name) = key.split_once(':').unwrap_or(("misc", key));
        self.bundles
            .get(tag)?
            .get(namespace)?
            .get(name)
            .map(String::as_str)
    }

    fn interpolate(&self, template: &str, params: &[(&str, &str)]) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                params
                    .iter()
                    .find(|(name, _)| *name == &caps[1])
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Text resolver bound to one locale for the duration of a dispatch
#[derive(Clone)]
pub struct LocaleText {
    i18n: Arc<I18n>,
    tag: String,
}

impl LocaleText {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Resolve `namespace:key` and substitute `{{name}}` placeholders.
    ///
    /// Missing keys fall back to the default locale, then to the key itself.
    pub fn text(&self, key: &str, params: &[(&str, &str)]) -> String {
        match self
            .i18n
            .lookup(&self.tag, key)
            .or_else(|| self.i18n.lookup(&self.i18n.default_tag, key))
        {
            Some(template) => self.i18n.interpolate(template, params),
            None => key.to_string(),
        }
    }
}
