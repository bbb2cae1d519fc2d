mod mongo_extractor;

pub use mongo_extractor::{MongoExtractor, MongoSourceConfig};
