pub mod config;
pub mod paper_document;
pub mod paper_ingest;
pub mod topics;

pub use config::*;
pub use paper_document::*;
pub use paper_ingest::*;
pub use topics::*;
