pub mod files;
pub mod jsonl;
pub mod traits;

pub use files::{FilenameStrategy, ImageWriter};
pub use jsonl::{JsonlRecordStore, RECORD_FORMAT_VERSION};
pub use traits::RecordStore;
