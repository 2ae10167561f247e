pub mod generation;
pub mod invalidation;
pub mod results;

pub use generation::{generation_key, GenerationStore};
pub use invalidation::{Invalidation, Invalidator};
pub use results::{CachedResult, ResultCache};
