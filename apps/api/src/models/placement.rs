use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Size tiers and content types
// ────────────────────────────────────────────────────────────────────────────

text_enum! {
    /// Named capacity class of a placement. Unit costs live in `layout::allocator`.
    #[derive(PartialOrd, Ord)]
    SizeTier {
        Single => "SINGLE",
        Quarter => "QUARTER",
        Half => "HALF",
        Full => "FULL",
    }
}

text_enum! {
    ContentType {
        Voucher => "VOUCHER",
        Ad => "AD",
        Image => "IMAGE",
        Text => "TEXT",
    }
}

impl ContentType {
    /// Payload fields that must be present (non-blank) for this content type.
    pub fn required_fields(self) -> &'static [PayloadField] {
        match self {
            ContentType::Voucher => &[],
            ContentType::Ad => &[PayloadField::Title],
            ContentType::Image => &[PayloadField::ImageUrl],
            ContentType::Text => &[PayloadField::BodyText],
        }
    }
}

/// A payload field that some content type may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    Title,
    ImageUrl,
    BodyText,
}

impl PayloadField {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadField::Title => "title",
            PayloadField::ImageUrl => "image_url",
            PayloadField::BodyText => "body_text",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload
// ────────────────────────────────────────────────────────────────────────────

/// Free-form payload carried by every placement. Which fields are mandatory
/// depends on the `ContentType` (see `ContentType::required_fields`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlacementContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
}

impl PlacementContent {
    fn field(&self, field: PayloadField) -> Option<&str> {
        match field {
            PayloadField::Title => self.title.as_deref(),
            PayloadField::ImageUrl => self.image_url.as_deref(),
            PayloadField::BodyText => self.body_text.as_deref(),
        }
    }

    /// Required fields of `content_type` that are absent or blank.
    pub fn missing_fields(&self, content_type: ContentType) -> Vec<PayloadField> {
        content_type
            .required_fields()
            .iter()
            .copied()
            .filter(|f| self.field(*f).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pages and placements
// ────────────────────────────────────────────────────────────────────────────

/// Address of one physical page. Capacity is always enforced per `PageRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageRef {
    pub booklet_id: Uuid,
    pub page_number: i32,
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.booklet_id, self.page_number)
    }
}

/// One row of `booklet_placements`; enum columns decode from their text names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Placement {
    pub id: Uuid,
    pub booklet_id: Uuid,
    pub page_number: i32,
    pub size_tier: SizeTier,
    pub content_type: ContentType,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub content: PlacementContent,
    pub display_order: i32,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Placement {
    pub fn page(&self) -> PageRef {
        PageRef {
            booklet_id: self.booklet_id,
            page_number: self.page_number,
        }
    }

    /// Returns the placement as it would look after `patch` is applied.
    /// A blank string in a payload field clears that field.
    pub fn merged_with(&self, patch: &PlacementPatch) -> Placement {
        let mut next = self.clone();
        if let Some(page_number) = patch.page_number {
            next.page_number = page_number;
        }
        if let Some(tier) = patch.size_tier {
            next.size_tier = tier;
        }
        if let Some(content_type) = patch.content_type {
            next.content_type = content_type;
        }
        merge_field(&mut next.content.title, &patch.title);
        merge_field(&mut next.content.description, &patch.description);
        merge_field(&mut next.content.link_url, &patch.link_url);
        merge_field(&mut next.content.image_url, &patch.image_url);
        merge_field(&mut next.content.body_text, &patch.body_text);
        if let Some(order) = patch.display_order {
            next.display_order = order;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }
        next
    }
}

fn merge_field(target: &mut Option<String>, update: &Option<String>) {
    if let Some(value) = update {
        *target = if value.trim().is_empty() {
            None
        } else {
            Some(value.clone())
        };
    }
}

/// Request body for creating a placement. `display_order` is always assigned
/// by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlacement {
    pub booklet_id: Uuid,
    pub page_number: i32,
    pub size_tier: SizeTier,
    pub content_type: ContentType,
    #[serde(flatten)]
    pub content: PlacementContent,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

/// Row handed to the store once the service has validated a `NewPlacement`.
#[derive(Debug, Clone)]
pub struct PlacementDraft {
    pub id: Uuid,
    pub placement: NewPlacement,
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementPatch {
    #[serde(default)]
    pub page_number: Option<i32>,
    #[serde(default)]
    pub size_tier: Option<SizeTier>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Set by the service when a placement moves to another page.
    #[serde(skip)]
    pub display_order: Option<i32>,
}

impl PlacementPatch {
    pub fn touches_payload(&self) -> bool {
        self.content_type.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.link_url.is_some()
            || self.image_url.is_some()
            || self.body_text.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub id: Uuid,
    pub display_order: i32,
}
