//! Resource naming for associations: `has_one :author` resolves resource `authors`.
//!
//! Regular English suffix rules only; irregular nouns need an entry in the override table.

use std::collections::HashMap;

const DEFAULT_IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
];

#[derive(Clone, Debug)]
pub struct Inflector {
    irregular: HashMap<String, String>,
}

impl Default for Inflector {
    fn default() -> Self {
        Inflector {
            irregular: DEFAULT_IRREGULARS
                .iter()
                .map(|(s, p)| (s.to_string(), p.to_string()))
                .collect(),
        }
    }
}

impl Inflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an irregular plural. Later entries replace earlier ones.
    pub fn irregular(&mut self, singular: impl Into<String>, plural: impl Into<String>) {
        self.irregular.insert(singular.into(), plural.into());
    }

    /// Plural form of an identifier. Words already ending in `s` (or a registered plural)
    /// are returned unchanged so `has_many :books` resolves `books`.
    pub fn pluralize(&self, word: &str) -> String {
        if let Some(p) = self.irregular.get(word) {
            return p.clone();
        }
        if word.is_empty() || word.ends_with('s') || self.irregular.values().any(|p| p == word) {
            return word.to_string();
        }
        if ["x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
            return format!("{}es", word);
        }
        let mut chars = word.chars().rev();
        if let (Some('y'), Some(prev)) = (chars.next(), chars.next()) {
            if !"aeiou".contains(prev) {
                return format!("{}ies", &word[..word.len() - 1]);
            }
        }
        format!("{}s", word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_words_gain_suffix() {
        let i = Inflector::new();
        assert_eq!(i.pluralize("user"), "users");
        assert_eq!(i.pluralize("author"), "authors");
        assert_eq!(i.pluralize("box"), "boxes");
        assert_eq!(i.pluralize("branch"), "branches");
        assert_eq!(i.pluralize("category"), "categories");
        assert_eq!(i.pluralize("day"), "days");
    }

    #[test]
    fn plurals_are_left_alone() {
        let i = Inflector::new();
        assert_eq!(i.pluralize("books"), "books");
        assert_eq!(i.pluralize("people"), "people");
    }

    #[test]
    fn override_table_wins() {
        let mut i = Inflector::new();
        assert_eq!(i.pluralize("person"), "people");
        i.irregular("octopus", "octopodes");
        assert_eq!(i.pluralize("octopus"), "octopodes");
    }
}
