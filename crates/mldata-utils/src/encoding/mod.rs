//! Integer encodings used by the row block codec.
pub mod bitpacked;
pub mod frame_of_reference;
pub mod uleb128;
