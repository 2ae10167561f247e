use searchgate::SearchGateway;
use std::sync::Arc;

pub mod documents;
pub mod health;
pub mod memcache;
pub mod reset;
pub mod search;

pub struct AppState {
    pub gateway: Arc<SearchGateway>,
}

pub use documents::{delete_documents, drop_index, put_documents};
pub use health::health;
pub use memcache::{delete_memcache, get_memcache, set_memcache};
pub use reset::reset_search;
pub use search::search;
