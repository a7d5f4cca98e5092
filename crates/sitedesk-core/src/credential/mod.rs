//! Client-held credential: structural decoding and the process-wide store.

pub mod parser;
pub mod store;

pub use parser::{classify, decode, decode_live};
pub use store::{ClientBackend, ClientStore, CredentialSlot, MemoryBackend};
