/* Symbols shared by the input alphabet and the stack alphabet. A symbol is an atomic
 * token, possibly longer than one character (z0, Z1 ...), so strings are split into
 * symbols by longest match against the alphabet they are drawn from. */

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Spellings accepted for the empty symbol ε in textual input.
pub const EPSILON_SPELLINGS: [&str; 6] = ["ε", "ϵ", "ɛ", "eps", "epsilon", "~"];

/// Returns true if the text denotes ε.
pub fn is_epsilon(text: &str) -> bool {
    EPSILON_SPELLINGS.contains(&text.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_epsilon(&self) -> bool {
        is_epsilon(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

/// What a transition reads from the input: nothing, or one input symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    Epsilon,
    Input(Symbol),
}

impl Trigger {
    /// Parses a trigger, mapping every ε spelling to [`Trigger::Epsilon`].
    pub fn parse(text: &str) -> Self {
        if is_epsilon(text) {
            Trigger::Epsilon
        } else {
            Trigger::Input(Symbol::new(text.trim()))
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Trigger::Epsilon)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Epsilon => write!(f, "ε"),
            Trigger::Input(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// Split `text` into symbols of `alphabet`. Longer symbols are tried first, and a
/// shorter one is taken when the longer choice leaves a remainder that cannot be split.
/// Returns `None` if no split covers the whole text.
pub fn tokenize(text: &str, alphabet: &BTreeSet<Symbol>) -> Option<Vec<Symbol>> {
    let longest = alphabet.iter().map(|s| s.as_str().len()).max().unwrap_or(0);
    // dead[i]: no split of text[i..] exists
    let mut dead = vec![false; text.len() + 1];
    let mut splits: Vec<(usize, usize)> = Vec::new(); // (start, length) of each symbol
    let mut position = 0;
    let mut max_length = longest;

    while position < text.len() {
        let rest = &text[position..];
        let found = (1..=max_length.min(rest.len())).rev().find(|&length| {
            rest.is_char_boundary(length)
                && !dead[position + length]
                && alphabet.contains(&rest[..length])
        });

        match found {
            Some(length) => {
                splits.push((position, length));
                position += length;
                max_length = longest;
            }
            None => {
                dead[position] = true;
                let (start, length) = splits.pop()?;
                position = start;
                max_length = length - 1;
            }
        }
    }

    Some(
        splits
            .into_iter()
            .map(|(start, length)| Symbol::new(&text[start..start + length]))
            .collect(),
    )
}

#[cfg(test)]
mod symbol_tests {
    use super::*;

    fn alphabet(symbols: &[&str]) -> BTreeSet<Symbol> {
        symbols.iter().map(|s| Symbol::from(*s)).collect()
    }

    #[test]
    fn test_epsilon_spellings() {
        for spelling in EPSILON_SPELLINGS {
            assert!(is_epsilon(spelling));
            assert_eq!(Trigger::parse(spelling), Trigger::Epsilon);
        }
        assert!(is_epsilon(" ε "));
        assert!(!is_epsilon("e"));
        assert_eq!(Trigger::parse(" a "), Trigger::Input(Symbol::from("a")));
    }

    #[test]
    fn test_tokenize_single_chars() {
        let tokens = tokenize("aab", &alphabet(&["a", "b"])).unwrap();
        let tokens: Vec<&str> = tokens.iter().map(Symbol::as_str).collect();
        assert_eq!(tokens, vec!["a", "a", "b"]);
    }

    #[test]
    fn test_tokenize_longest_match() {
        let tokens = tokenize("Az0A", &alphabet(&["A", "z", "z0"])).unwrap();
        let tokens: Vec<&str> = tokens.iter().map(Symbol::as_str).collect();
        assert_eq!(tokens, vec!["A", "z0", "A"]);
    }

    #[test]
    fn test_tokenize_unicode_and_failure() {
        let tokens = tokenize("Ω$", &alphabet(&["Ω", "$"])).unwrap();
        assert_eq!(tokens.len(), 2);

        assert!(tokenize("abc", &alphabet(&["a", "b"])).is_none());
        assert_eq!(tokenize("", &alphabet(&[])), Some(vec![]));
        assert!(tokenize("a", &alphabet(&[])).is_none());
    }

    #[test]
    fn test_tokenize_backs_off_from_longest_match() {
        let tokens = tokenize("abc", &alphabet(&["a", "ab", "bc"])).unwrap();
        let tokens: Vec<&str> = tokens.iter().map(Symbol::as_str).collect();
        assert_eq!(tokens, vec!["a", "bc"]);

        let tokens = tokenize("abab", &alphabet(&["a", "b", "ab"])).unwrap();
        let tokens: Vec<&str> = tokens.iter().map(Symbol::as_str).collect();
        assert_eq!(tokens, vec!["ab", "ab"]);

        // the first choice only fails at the very end
        let tokens = tokenize("aaaab", &alphabet(&["aa", "a", "ab"])).unwrap();
        let tokens: Vec<&str> = tokens.iter().map(Symbol::as_str).collect();
        assert_eq!(tokens, vec!["aa", "a", "ab"]);

        assert!(tokenize("abcd", &alphabet(&["a", "ab", "bc"])).is_none());
    }
}
