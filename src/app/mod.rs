pub mod record;
pub mod record_store;
pub mod upload_handler;

pub use record::LaiRecord;
pub use record_store::{InMemoryRecordStore, RecordStore};
pub use upload_handler::{Upload, UploadHandler};
