//! Theme token substitution for combined stylesheets.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::application::ports::{ThemeError, ThemeProcessor};
use crate::domain::ThemeId;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)").expect("token pattern compiles"));

/// Replaces `$name` tokens with the value configured for the active theme.
///
/// Tokens the theme does not define are left in place.
#[derive(Debug, Clone, Default)]
pub struct TokenThemeProcessor {
    themes: HashMap<ThemeId, HashMap<String, String>>,
}

impl TokenThemeProcessor {
    pub fn new(themes: HashMap<ThemeId, HashMap<String, String>>) -> Self {
        Self { themes }
    }

    pub fn with_theme<I, K, V>(mut self, theme: impl Into<ThemeId>, tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.themes.insert(
            theme.into(),
            tokens
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }
}

impl ThemeProcessor for TokenThemeProcessor {
    fn apply(&self, theme: &ThemeId, css: &str) -> Result<String, ThemeError> {
        let tokens = self
            .themes
            .get(theme)
            .ok_or_else(|| ThemeError::UnknownTheme(theme.to_string()))?;

        let themed = TOKEN_PATTERN.replace_all(css, |captures: &Captures<'_>| {
            match tokens.get(&captures[1]) {
                Some(value) => value.clone(),
                None => captures[0].to_string(),
            }
        });
        Ok(themed.into_owned())
    }
}

/// Leaves stylesheets untouched whatever the theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopThemeProcessor;

impl ThemeProcessor for NoopThemeProcessor {
    fn apply(&self, _theme: &ThemeId, css: &str) -> Result<String, ThemeError> {
        Ok(css.to_string())
    }
}
