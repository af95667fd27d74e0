// IDs module
pub mod raw_id;
pub mod record_key;

pub use raw_id::{RawId, RAW_ID_LEN};
pub use record_key::RecordKey;
