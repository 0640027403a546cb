//! An ISO 9660 / ECMA-119 filesystem image builder, reader and writer, with
//! Joliet and El Torito extensions.

pub mod boot;
pub mod directory;
pub mod error;
pub mod image;
pub mod layout;
pub mod mangle;
pub mod parser;
pub mod path_table;
pub mod tree;
pub mod types;
pub mod volume;
pub mod writer;

pub use boot::{MediaType, PlatformId};
pub use error::IsoError;
pub use image::{ElToritoOptions, IsoImage, JolietLevel, NewOptions};
pub use mangle::InterchangeLevel;
