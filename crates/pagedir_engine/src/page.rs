/* 📖 # Why keep store records and transport records apart?

`Page` is what the store persists. `NewPage` and `UpdatePage` are what callers
send, `PageEntity` and `PageListItem` are what they get back. The service
converts between them so that fields owned by the directory (id, parent API,
timestamps, type) can never be overwritten through an update payload.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal of a page among its siblings.
pub type Position = u32;

/// Position given to the first page of a partition.
///
/// The max-order query answers `FIRST_POSITION - 1` for an empty partition,
/// so `max + 1` is always the next free slot.
pub const FIRST_POSITION: Position = 1;

/// Content type reported for pages whose content parses as JSON.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type reported for every other non-empty content (YAML, RAML, markdown).
pub const TEXT_YAML: &str = "text/yaml";

/// Opaque, immutable page identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        PageId(nanoid::nanoid!())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        PageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the API owning a set of pages. Each API is an independent
/// ordering partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiId(String);

impl ApiId {
    pub fn from_string(id: impl Into<String>) -> Self {
        ApiId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Documentation format of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageType {
    Markdown,
    Raml,
    Swagger,
}

/// A page as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub api: ApiId,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,
    pub order: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contributor: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a page.
///
/// A missing `order` appends the page after its last sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPage {
    pub name: String,
    #[serde(rename = "type", default)]
    pub page_type: Option<PageType>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub last_contributor: Option<String>,
    #[serde(default)]
    pub order: Option<Position>,
    #[serde(default)]
    pub published: bool,
}

/// Payload for updating a page. Replaces every mutable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePage {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub last_contributor: Option<String>,
    pub order: Position,
    #[serde(default)]
    pub published: bool,
}

impl UpdatePage {
    /// An update payload that keeps every field of `page` as it is.
    pub fn from_page(page: &Page) -> Self {
        Self {
            name: page.name.clone(),
            content: page.content.clone(),
            last_contributor: page.last_contributor.clone(),
            order: page.order,
            published: page.published,
        }
    }

    pub fn with_order(mut self, order: Position) -> Self {
        self.order = order;
        self
    }
}

/// Detailed view of a page returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntity {
    pub id: PageId,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contributor: Option<String>,
    pub last_modification_date: DateTime<Utc>,
    pub order: Position,
    pub published: bool,
}

/// Summary of a page used in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageListItem {
    pub id: PageId,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,
    pub order: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contributor: Option<String>,
    pub published: bool,
}

impl Page {
    /// Build a record for a new page. Order is resolved by the caller.
    pub fn create(
        id: PageId,
        api: ApiId,
        new_page: NewPage,
        order: Position,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            api,
            name: new_page.name,
            page_type: new_page.page_type,
            order,
            content: new_page.content,
            last_contributor: new_page.last_contributor,
            published: new_page.published,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update payload, keeping the directory-owned fields of `self`.
    pub fn updated_with(&self, update: UpdatePage, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            api: self.api.clone(),
            name: update.name,
            page_type: self.page_type,
            order: update.order,
            content: update.content,
            last_contributor: update.last_contributor,
            published: update.published,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Copy of this page moved to `order`.
    pub fn with_order(&self, order: Position) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    pub fn to_entity(&self) -> PageEntity {
        PageEntity {
            id: self.id.clone(),
            name: self.name.clone(),
            page_type: self.page_type,
            content: self.content.clone(),
            content_type: self.content.as_deref().map(detect_content_type).map(String::from),
            last_contributor: self.last_contributor.clone(),
            last_modification_date: self.updated_at,
            order: self.order,
            published: self.published,
        }
    }

    pub fn to_list_item(&self) -> PageListItem {
        PageListItem {
            id: self.id.clone(),
            name: self.name.clone(),
            page_type: self.page_type,
            order: self.order,
            last_contributor: self.last_contributor.clone(),
            published: self.published,
        }
    }
}

/// Guess the content type of a page body: JSON if it parses as JSON,
/// YAML otherwise.
pub fn detect_content_type(content: &str) -> &'static str {
    if serde_json::from_str::<serde_json::Value>(content).is_ok() {
        APPLICATION_JSON
    } else {
        TEXT_YAML
    }
}
