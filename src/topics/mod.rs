//! Topic trees: the walk that builds them and the types they are stored as.

pub mod fetcher;
pub mod model;
pub mod registry;

pub use fetcher::{FetchError, RootSelector, TopicTreeFetcher};
pub use model::Topic;
pub use registry::{Subtopic, SubtopicRegistry};
