//! User-facing messages
//!
//! A small fixed catalog; unknown locales fall back to English.

use crate::types::TrackMetadata;
use serde::{Deserialize, Serialize};

/// Supported message locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Spanish
    Es,
    /// German
    De,
}

impl Locale {
    /// Parse a locale tag such as `en`, `es-MX` or `de_DE`
    ///
    /// Only the primary language subtag is considered. Returns `None` for
    /// languages without a catalog.
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            "de" => Some(Self::De),
            _ => None,
        }
    }
}

/// Message catalog bound to one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    /// Catalog for an explicit locale
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Catalog for a locale tag, falling back to English
    pub fn for_locale(tag: &str) -> Self {
        Self::new(Locale::parse(tag).unwrap_or_default())
    }

    /// Locale in use
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Announcement when a track begins streaming
    pub fn started_playing(&self, track: &TrackMetadata) -> String {
        match self.locale {
            Locale::En => format!("Started playing: {} [{}] {}", track.title, track.duration_label(), track.url),
            Locale::Es => format!("Reproduciendo: {} [{}] {}", track.title, track.duration_label(), track.url),
            Locale::De => format!("Wiedergabe gestartet: {} [{}] {}", track.title, track.duration_label(), track.url),
        }
    }

    /// Report for a track whose pipeline failed
    pub fn playback_failed(&self, track: &TrackMetadata, reason: &str) -> String {
        match self.locale {
            Locale::En => format!("Playback of {} ({}) failed: {}", track.title, track.url, reason),
            Locale::Es => format!("Error al reproducir {} ({}): {}", track.title, track.url, reason),
            Locale::De => format!("Wiedergabe von {} ({}) fehlgeschlagen: {}", track.title, track.url, reason),
        }
    }

    /// Report for a search with no matches
    pub fn no_results(&self, query: &str) -> String {
        match self.locale {
            Locale::En => format!("No search results found for {}", query),
            Locale::Es => format!("No se encontraron resultados para {}", query),
            Locale::De => format!("Keine Suchergebnisse für {}", query),
        }
    }

    /// Report for a link that could not be resolved
    pub fn invalid_link(&self, url: &str) -> String {
        match self.locale {
            Locale::En => format!("Invalid link: {}", url),
            Locale::Es => format!("Enlace no válido: {}", url),
            Locale::De => format!("Ungültiger Link: {}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TrackMetadata {
        TrackMetadata::new("https://youtube.com/watch?v=abc", "Intro", 95)
    }

    #[test]
    fn parse_uses_primary_subtag() {
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("es-MX"), Some(Locale::Es));
        assert_eq!(Locale::parse("DE_de"), Some(Locale::De));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let messages = Messages::for_locale("ja");
        assert_eq!(messages.locale(), Locale::En);
        assert_eq!(
            messages.started_playing(&track()),
            "Started playing: Intro [1:35] https://youtube.com/watch?v=abc"
        );
    }

    #[test]
    fn failure_message_names_title_and_url() {
        let text = Messages::for_locale("es").playback_failed(&track(), "ffmpeg exited with code 1");
        assert!(text.contains("Intro"));
        assert!(text.contains("https://youtube.com/watch?v=abc"));
        assert!(text.contains("ffmpeg exited with code 1"));
    }

    #[test]
    fn lookup_failures() {
        let messages = Messages::new(Locale::De);
        assert_eq!(messages.no_results("foo"), "Keine Suchergebnisse für foo");
        assert_eq!(messages.invalid_link("x"), "Ungültiger Link: x");
    }
}
