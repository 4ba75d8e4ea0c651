pub mod memory;
pub mod traits;
pub mod transaction;

pub use memory::InMemoryStore;
pub use traits::{PageStore, StoreHandle};
pub use transaction::StoreTransaction;
