//! Deterministic keyword classifier
//!
//! Stands in for the AI oracle when none is configured (or it was disabled
//! by a configuration failure). Its verdicts are never written to the rule
//! cache.

use async_trait::async_trait;
use focusledger_domain::{normalize_app_name, Classification, OracleVerdict, Result};

use super::ports::ClassifierOracle;

const BILLABLE_HINTS: &[&str] = &[
    "code", "vscode", "idea", "intellij", "pycharm", "webstorm", "rider", "clion", "goland",
    "xcode", "android studio", "sublime", "vim", "nvim", "emacs", "terminal", "iterm",
    "alacritty", "kitty", "wezterm", "powershell", "cmd", "excel", "word", "powerpoint",
    "libreoffice", "figma", "postman", "dbeaver", "datagrip", "docker",
];

const NON_BILLABLE_HINTS: &[&str] = &[
    "spotify", "netflix", "youtube", "steam", "discord", "twitch", "facebook", "instagram",
    "tiktok", "reddit", "twitter", "solitaire", "minecraft", "epic games", "vlc",
];

const AMBIGUOUS_HINTS: &[&str] = &[
    "chrome", "firefox", "safari", "edge", "brave", "opera", "slack", "teams", "zoom",
    "outlook", "thunderbird", "mail", "telegram", "whatsapp", "explorer", "finder",
];

/// Keyword-table classifier over the app name and window title.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// App-name matches win over title matches; within each, non-billable
    /// beats ambiguous beats billable.
    pub fn verdict(&self, app_name: &str, app_title: &str) -> OracleVerdict {
        let key = normalize_app_name(app_name);
        if let Some(verdict) = match_hints(&key, "app name", 0.6) {
            return verdict;
        }
        let title = app_title.to_lowercase();
        if let Some(verdict) = match_hints(&title, "window title", 0.4) {
            return verdict;
        }
        OracleVerdict::new(Classification::Ambiguous, 0.0)
            .with_reasoning("no keyword matched; needs review")
    }
}

fn match_hints(text: &str, field: &str, confidence: f64) -> Option<OracleVerdict> {
    if text.is_empty() {
        return None;
    }
    let tables = [
        (NON_BILLABLE_HINTS, Classification::NonBillable),
        (AMBIGUOUS_HINTS, Classification::Ambiguous),
        (BILLABLE_HINTS, Classification::Billable),
    ];
    tables.iter().find_map(|(hints, classification)| {
        hints.iter().find(|hint| contains_word(text, hint)).map(|hint| {
            OracleVerdict::new(*classification, confidence)
                .with_reasoning(format!("{field} matched keyword '{hint}'"))
        })
    })
}

/// Whole-word (or whole-phrase) containment, so "code" does not match
/// "barcode".
fn contains_word(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
        let after_ok = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[async_trait]
impl ClassifierOracle for KeywordClassifier {
    async fn classify(
        &self,
        app_name: &str,
        app_title: &str,
        _context: Option<&str>,
    ) -> Result<OracleVerdict> {
        Ok(self.verdict(app_name, app_title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(app: &str, title: &str) -> Classification {
        KeywordClassifier.verdict(app, title).classification
    }

    #[test]
    fn ides_and_terminals_are_billable() {
        assert_eq!(class("C:\\Apps\\Code.exe", "main.rs"), Classification::Billable);
        assert_eq!(class("/usr/bin/alacritty", ""), Classification::Billable);
    }

    #[test]
    fn entertainment_is_non_billable() {
        assert_eq!(class("Spotify.exe", "Daily Mix"), Classification::NonBillable);
        assert_eq!(class("", "YouTube - Cats"), Classification::NonBillable);
    }

    #[test]
    fn browsers_and_chat_are_ambiguous() {
        assert_eq!(class("chrome.exe", "Docs"), Classification::Ambiguous);
        assert_eq!(class("slack", "#general"), Classification::Ambiguous);
        assert_eq!(class("mystery-tool", "untitled"), Classification::Ambiguous);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(class("barcode-scanner", ""), Classification::Ambiguous);
        assert!(contains_word("visual studio code", "code"));
        assert!(!contains_word("barcode", "code"));
    }
}
