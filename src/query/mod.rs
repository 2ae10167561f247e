pub mod facets;
pub mod params;

pub use facets::{compile_facets, FacetSpec, FacetValueSpec};
pub use params::{QueryParams, SearchRequest};
