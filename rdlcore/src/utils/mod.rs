pub mod error;
pub mod opaque;
