//! Record-store and object-storage operations:
//! - Profile operations (read-by-id, partial update-by-id)
//! - Document operations (keyed upload with overwrite, public URL resolution)

pub mod profile;
pub use profile::*;

pub mod storage;
pub use storage::*;
