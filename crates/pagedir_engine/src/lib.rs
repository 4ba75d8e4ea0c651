pub mod config;
pub mod page;
pub mod partition;
pub mod reindex;
pub mod service;
pub mod store;

pub use config::{Config, MoveConfig, SeedPage, load_config, load_seed_pages};
pub use page::{
    ApiId, FIRST_POSITION, NewPage, Page, PageEntity, PageId, PageListItem, PageType, Position,
    UpdatePage, detect_content_type,
};
pub use partition::{PartitionLocks, PartitionReport};
pub use reindex::{PositionUpdate, SiblingReindexer, apply_plan};
pub use service::PageService;
