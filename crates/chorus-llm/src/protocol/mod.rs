//! Wire format types for vendor APIs
//!
//! Pure serde structs matching each vendor's JSON. Response types are
//! lenient: optional or vendor-specific fields default rather than fail, so
//! OpenAI-compatible servers with partial implementations still decode.

pub mod anthropic;
pub mod google;
pub mod openai;
