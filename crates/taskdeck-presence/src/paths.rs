//! Where viewer records live.

use taskdeck_common::StoreError;
use taskdeck_store::{CollectionRef, DocumentRef, OwnRecordOnly};

pub const PRESENCE_ROOT: &str = "presence";
pub const VIEWERS_COLLECTION: &str = "users";

/// `presence/{resource_id}/users`
pub fn viewers_collection(resource_id: &str) -> Result<CollectionRef, StoreError> {
    CollectionRef::from_segments([PRESENCE_ROOT, resource_id, VIEWERS_COLLECTION])
}

/// `presence/{resource_id}/users/{subject_id}`
pub fn viewer_doc(resource_id: &str, subject_id: &str) -> Result<DocumentRef, StoreError> {
    viewers_collection(resource_id)?.doc(subject_id)
}

/// Store policy letting a principal write only its own viewer records.
pub fn write_policy() -> OwnRecordOnly {
    OwnRecordOnly::new(PRESENCE_ROOT, VIEWERS_COLLECTION)
}
