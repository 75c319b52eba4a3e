use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    /// Lifecycle state of a booklet. Owned by the printing workflow; this service
    /// only reads it to decide whether placements may change.
    BookletStatus {
        Draft => "DRAFT",
        ReadyForPrint => "READY_FOR_PRINT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
}

impl BookletStatus {
    pub fn allows_mutation(self) -> bool {
        matches!(self, BookletStatus::Draft | BookletStatus::ReadyForPrint)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booklet {
    pub id: Uuid,
    pub status: BookletStatus,
    pub is_active: bool,
}
