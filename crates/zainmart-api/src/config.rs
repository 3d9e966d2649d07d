use serde::Serialize;

/// Site-wide constants of the web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    pub title: String,
    pub short_name: String,
    pub description: String,
    /// `(code, native name)` pairs in display order.
    pub languages: Vec<(String, String)>,
    pub default_language: String,
    pub backend: String,
    pub websocket: String,
    pub main_space: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "DMART Unified Data Platform".into(),
            short_name: "dmart".into(),
            description: "dmart unified data platform".into(),
            languages: vec![
                ("ar".into(), "العربية".into()),
                ("en".into(), "English".into()),
                ("ku".into(), "کوردی".into()),
            ],
            default_language: "ar".into(),
            backend: "https://api.dmart.cc".into(),
            websocket: "wss://api.dmart.cc/ws".into(),
            main_space: "zainmart".into(),
        }
    }
}

impl SiteConfig {
    /// Defaults overridden by `ZAINMART_BACKEND`, `ZAINMART_WEBSOCKET`,
    /// `ZAINMART_MAIN_SPACE` and `ZAINMART_LOCALE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var("ZAINMART_BACKEND") {
            config.backend = backend.trim_end_matches('/').to_string();
        }
        if let Some(websocket) = var("ZAINMART_WEBSOCKET") {
            config.websocket = websocket;
        }
        if let Some(space) = var("ZAINMART_MAIN_SPACE") {
            config.main_space = space;
        }
        if let Some(locale) = var("ZAINMART_LOCALE") {
            if config.supports(&locale) {
                config.default_language = locale;
            } else {
                tracing::warn!(locale = %locale, "Unsupported locale, keeping default");
            }
        }
        config
    }

    pub fn supports(&self, locale: &str) -> bool {
        self.languages.iter().any(|(code, _)| code == locale)
    }
}
