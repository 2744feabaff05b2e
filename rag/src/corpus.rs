//! Ordered, immutable document storage.

use crate::types::Document;

/// Ordered sequence of documents, aligned by position with a vector index.
///
/// Positions are assigned when the store is created and never change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorpusStore {
    documents: Vec<Document>,
}

impl CorpusStore {
    /// Creates a store from texts in corpus order.
    pub fn new<I, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let documents = texts
            .into_iter()
            .enumerate()
            .map(|(id, text)| Document::new(id, text))
            .collect();
        Self { documents }
    }

    /// Returns the document at `id`.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterates over documents in corpus order.
    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl<'a> IntoIterator for &'a CorpusStore {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Into<String>> FromIterator<T> for CorpusStore {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_load_order() {
        let corpus = CorpusStore::new(["cat sat on mat", "dog ran in park"]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().text, "cat sat on mat");
        assert_eq!(corpus.get(1).unwrap().id, 1);
        assert!(corpus.get(2).is_none());
    }

    #[test]
    fn collects_from_owned_strings() {
        let corpus: CorpusStore = vec![String::from("a"), String::from("b")]
            .into_iter()
            .collect();
        let ids: Vec<usize> = corpus.iter().map(|doc| doc.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
