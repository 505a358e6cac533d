// src/analyze/filter.rs
//! Required / ignored keyword gates.
//!
//! Keywords are matched against tokenizer output by exact, case-sensitive
//! membership. List "Tesla,tesla" if both spellings should count.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    MissingRequired,
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilterSet {
    required: HashSet<String>,
    ignored: HashSet<String>,
}

/// Split a comma-separated keyword list; entries are trimmed, blanks dropped.
pub fn parse_keyword_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl KeywordFilterSet {
    pub fn new(required: HashSet<String>, ignored: HashSet<String>) -> Self {
        Self { required, ignored }
    }

    /// Build from the optional comma-separated CLI/config lists.
    pub fn from_lists(required: Option<&str>, ignored: Option<&str>) -> Self {
        Self {
            required: required.map(parse_keyword_list).unwrap_or_default(),
            ignored: ignored.map(parse_keyword_list).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.ignored.is_empty()
    }

    pub fn required(&self) -> &HashSet<String> {
        &self.required
    }

    pub fn ignored(&self) -> &HashSet<String> {
        &self.ignored
    }

    /// Required gate first (any one token suffices), then the ignored veto.
    pub fn check<S: AsRef<str>>(&self, tokens: &[S]) -> FilterVerdict {
        if !self.required.is_empty()
            && !tokens.iter().any(|t| self.required.contains(t.as_ref()))
        {
            return FilterVerdict::MissingRequired;
        }
        if tokens.iter().any(|t| self.ignored.contains(t.as_ref())) {
            return FilterVerdict::Ignored;
        }
        FilterVerdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_parsing_trims_and_drops_blanks() {
        let s = parse_keyword_list(" TSLA, ,Tesla ,,");
        assert_eq!(s.len(), 2);
        assert!(s.contains("TSLA") && s.contains("Tesla"));
    }

    #[test]
    fn empty_sets_pass_everything() {
        let f = KeywordFilterSet::from_lists(None, Some(""));
        assert!(f.is_empty());
        assert_eq!(f.check::<&str>(&[]), FilterVerdict::Pass);
    }

    #[test]
    fn required_is_or_and_case_sensitive() {
        let f = KeywordFilterSet::from_lists(Some("TSLA,Musk"), None);
        assert_eq!(f.check(&["buy", "Musk"]), FilterVerdict::Pass);
        assert_eq!(f.check(&["buy", "tsla"]), FilterVerdict::MissingRequired);
    }

    #[test]
    fn ignored_vetoes_even_when_required_matches() {
        let f = KeywordFilterSet::from_lists(Some("TSLA"), Some("win,Giveaway"));
        assert_eq!(f.check(&["Giveaway", "TSLA"]), FilterVerdict::Ignored);
        assert_eq!(f.check(&["giveaway", "TSLA"]), FilterVerdict::Pass);
    }
}
