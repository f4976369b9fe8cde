//! Key sources and persistence for fieldseal.
//! Master keys come from the environment or the OS keyring; envelope tokens
//! are stored as opaque text files.

pub mod file_token_store;
pub mod key_source;
pub mod profiles;
