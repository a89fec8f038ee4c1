//! Routing table: which slots serve a source language
//!
//! | prefix | path |
//! |---|---|
//! | `en` | forward (en→fr) |
//! | `fr` | reverse (fr→en) |
//! | `ta` | ta→fr if loaded, else ta→en then en→fr, else no path |
//! | other | forward |

use super::slot::Slot;
use super::types::{Language, LanguageCode};
use serde::Serialize;
use std::fmt;

/// Every direction the engine can hold
#[derive(Debug)]
pub struct SlotSet<T> {
    /// Default source -> target (required)
    pub forward: T,
    /// Target -> default source (required)
    pub reverse: T,
    /// Low-resource source -> target
    pub low_resource_direct: Slot<T>,
    /// Low-resource source -> default source, composed with `forward`
    pub low_resource_intermediate: Slot<T>,
}

/// Slots to run, in order
#[derive(Debug, Clone, Copy)]
pub enum TranslationPath<'a, T> {
    Direct(&'a T),
    Composed { first: &'a T, second: &'a T },
}

impl<'a, T> TranslationPath<'a, T> {
    pub fn hops(&self) -> Vec<&'a T> {
        match *self {
            TranslationPath::Direct(slot) => vec![slot],
            TranslationPath::Composed { first, second } => vec![first, second],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TranslationPath::Direct(_) => 1,
            TranslationPath::Composed { .. } => 2,
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self, TranslationPath::Composed { .. })
    }
}

/// No loaded slot covers the requested language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoPathAvailable {
    pub source: Language,
    pub target: Language,
}

impl NoPathAvailable {
    /// Degraded output standing in for a translation
    pub fn placeholder(&self, text: &str) -> String {
        format!("[no-{}-{}-model] {}", self.source.code(), self.target.code(), text)
    }
}

impl fmt::Display for NoPathAvailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no model path from {} to {}",
            self.source.name(),
            self.target.name()
        )
    }
}

/// Target language of the forward and low-resource directions
pub const TARGET_LANGUAGE: Language = Language::French;

impl<T> SlotSet<T> {
    /// Pick the path for `source`; first matching rule wins
    pub fn resolve_path(
        &self,
        source: &LanguageCode,
    ) -> Result<TranslationPath<'_, T>, NoPathAvailable> {
        match source.language() {
            Some(Language::English) | None => Ok(TranslationPath::Direct(&self.forward)),
            Some(Language::French) => Ok(TranslationPath::Direct(&self.reverse)),
            Some(Language::Tamil) => {
                match (
                    self.low_resource_direct.as_ref(),
                    self.low_resource_intermediate.as_ref(),
                ) {
                    (Slot::Present(direct), _) => Ok(TranslationPath::Direct(direct)),
                    (Slot::Absent, Slot::Present(intermediate)) => Ok(TranslationPath::Composed {
                        first: intermediate,
                        second: &self.forward,
                    }),
                    (Slot::Absent, Slot::Absent) => Err(NoPathAvailable {
                        source: Language::Tamil,
                        target: TARGET_LANGUAGE,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(direct: bool, intermediate: bool) -> SlotSet<&'static str> {
        SlotSet {
            forward: "en-fr",
            reverse: "fr-en",
            low_resource_direct: if direct {
                Slot::Present("ta-fr")
            } else {
                Slot::Absent
            },
            low_resource_intermediate: if intermediate {
                Slot::Present("ta-en")
            } else {
                Slot::Absent
            },
        }
    }

    fn hops(set: &SlotSet<&'static str>, code: &str) -> Vec<&'static str> {
        set.resolve_path(&LanguageCode::new(code))
            .unwrap()
            .hops()
            .into_iter()
            .copied()
            .collect()
    }

    #[test]
    fn test_english_uses_forward() {
        let set = table(true, true);
        assert_eq!(hops(&set, "en"), vec!["en-fr"]);
        assert_eq!(hops(&set, "EN-us"), vec!["en-fr"]);
    }

    #[test]
    fn test_french_uses_reverse() {
        assert_eq!(hops(&table(false, false), "fr"), vec!["fr-en"]);
        assert_eq!(hops(&table(false, false), "French"), vec!["fr-en"]);
    }

    #[test]
    fn test_unknown_defaults_to_forward() {
        let set = table(false, false);
        assert_eq!(hops(&set, "xx"), hops(&set, "en"));
        assert_eq!(hops(&set, ""), vec!["en-fr"]);
        assert_eq!(hops(&set, "de"), vec!["en-fr"]);
    }

    #[test]
    fn test_tamil_prefers_direct() {
        assert_eq!(hops(&table(true, true), "ta"), vec!["ta-fr"]);
        assert_eq!(hops(&table(true, false), "ta"), vec!["ta-fr"]);
    }

    #[test]
    fn test_tamil_composes_through_english() {
        let set = table(false, true);
        let path = set.resolve_path(&LanguageCode::new("ta")).unwrap();
        assert!(path.is_composed());
        assert_eq!(path.len(), 2);
        assert_eq!(hops(&set, "ta"), vec!["ta-en", "en-fr"]);
    }

    #[test]
    fn test_tamil_without_models_has_no_path() {
        let err = table(false, false)
            .resolve_path(&LanguageCode::new("TA"))
            .unwrap_err();
        assert_eq!(err.source, Language::Tamil);
        assert_eq!(
            err.placeholder("bonjour tout le monde"),
            "[no-ta-fr-model] bonjour tout le monde"
        );
    }
}
