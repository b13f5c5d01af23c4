//! Property-based tests for the key codec

mod codec_roundtrip;
mod spacing;
