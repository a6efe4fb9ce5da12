//! Collection and document addressing.
//!
//! A collection path has an odd number of segments (`presence/t1/users`);
//! a document path appends one more segment, the document id.

use std::fmt;

use serde::{Deserialize, Serialize};
use taskdeck_common::StoreError;

fn check_segment(path: &str, segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment.contains('/') || segment.trim() != segment {
        return Err(StoreError::InvalidPath(format!(
            "bad segment {segment:?} in {path:?}"
        )));
    }
    Ok(())
}

/// Address of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments {
            check_segment(path, segment)?;
        }
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(format!(
                "{path:?} names a document, not a collection"
            )));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    /// Build a collection path from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self::parse(&joined)
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }

    /// Reference a document inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentRef, StoreError> {
        check_segment(&format!("{}/{id}", self.path), id)?;
        Ok(DocumentRef {
            collection: self.clone(),
            id: id.to_string(),
        })
    }

    /// The document this collection is nested under, if any.
    pub fn parent(&self) -> Option<DocumentRef> {
        let (parent, _) = self.path.rsplit_once('/')?;
        DocumentRef::parse(parent).ok()
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl TryFrom<String> for CollectionRef {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CollectionRef> for String {
    fn from(value: CollectionRef) -> Self {
        value.path
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    collection: CollectionRef,
    id: String,
}

impl DocumentRef {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let (collection, id) = path.rsplit_once('/').ok_or_else(|| {
            StoreError::InvalidPath(format!("{path:?} names a collection, not a document"))
        })?;
        CollectionRef::parse(collection)?.doc(id)
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full slash-separated path.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
