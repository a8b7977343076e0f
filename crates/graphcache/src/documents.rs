use std::sync::Arc;

use crate::{
    ast::{Document, DocumentHash, SharedDocument},
    error::DocumentError,
};

/// A bounded cache of formatted documents, keyed by the hash of the document
/// they were formatted from.
pub struct DocumentCache {
    inner: mini_moka::sync::Cache<DocumentHash, SharedDocument>,
    add_typenames: bool,
}

impl DocumentCache {
    pub fn new(limit: u64, add_typenames: bool) -> Self {
        DocumentCache {
            inner: mini_moka::sync::Cache::builder().max_capacity(limit).build(),
            add_typenames,
        }
    }

    /// The document that gets forwarded and read for `document`: a copy with
    /// `__typename` added to every selection set.
    pub fn format(&self, document: &SharedDocument) -> Result<SharedDocument, DocumentError> {
        if !self.add_typenames {
            return Ok(Arc::clone(document));
        }

        let hash = document.hash();
        if let Some(formatted) = self.inner.get(&hash) {
            return Ok(formatted);
        }

        let formatted = Arc::new(document.with_typenames()?);
        self.inner.insert(hash, Arc::clone(&formatted));
        // A formatted document formats to itself
        self.inner.insert(formatted.hash(), Arc::clone(&formatted));

        Ok(formatted)
    }

    /// Parses and formats a document
    pub fn parse(&self, source: &str) -> Result<SharedDocument, DocumentError> {
        self.format(&Arc::new(Document::parse(source)?))
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn formats_once() {
        let cache = DocumentCache::new(10, true);
        let document = Arc::new(Document::parse("{ todos { id } }").unwrap());

        let first = cache.format(&document).unwrap();
        let second = cache.format(&document).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let again = cache.format(&first).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        insta::assert_snapshot!(first.to_string(), @r"
        query {
          todos {
            id
            __typename
          }
        }
        ");
    }

    #[test]
    fn leaves_documents_alone_without_typenames() {
        let cache = DocumentCache::new(10, false);
        let document = Arc::new(
            Document::parse(indoc! {r"
                query {
                  todos { id }
                }
            "})
            .unwrap(),
        );

        assert!(Arc::ptr_eq(&cache.format(&document).unwrap(), &document));
    }
}
