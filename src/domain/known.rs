use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Video ids processed by earlier runs.
///
/// Serialises as a sorted JSON array so persisted ledgers diff cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KnownIdentifierSet {
    ids: HashSet<String>,
}

impl KnownIdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn insert(&mut self, video_id: impl Into<String>) -> bool {
        self.ids.insert(video_id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

impl<S: Into<String>> FromIterator<S> for KnownIdentifierSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for KnownIdentifierSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.ids.extend(iter.into_iter().map(Into::into));
    }
}

impl From<Vec<String>> for KnownIdentifierSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<KnownIdentifierSet> for Vec<String> {
    fn from(set: KnownIdentifierSet) -> Self {
        set.to_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_sorted() {
        let known: KnownIdentifierSet = ["ccccccccccc", "aaaaaaaaaaa", "bbbbbbbbbbb"]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&known).unwrap();
        assert_eq!(json, r#"["aaaaaaaaaaa","bbbbbbbbbbb","ccccccccccc"]"#);
    }

    #[test]
    fn test_deserialises_with_repeats() {
        let known: KnownIdentifierSet =
            serde_json::from_str(r#"["aaaaaaaaaaa","aaaaaaaaaaa"]"#).unwrap();
        assert_eq!(known.len(), 1);
        assert!(known.contains("aaaaaaaaaaa"));
    }

    #[test]
    fn test_extend_reports_growth() {
        let mut known = KnownIdentifierSet::new();
        assert!(known.insert("aaaaaaaaaaa"));
        assert!(!known.insert("aaaaaaaaaaa"));
        known.extend(vec!["bbbbbbbbbbb".to_string()]);
        assert_eq!(known.len(), 2);
    }
}
