//! Feature image storage.

pub mod storage;

pub use storage::{
    ALLOWED_IMAGE_TYPES, FileStorage, LocalFileStorage, MAX_IMAGE_SIZE, sanitize_filename,
};
