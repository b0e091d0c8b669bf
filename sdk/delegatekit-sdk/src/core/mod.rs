pub mod clock;
pub mod connection;
pub mod payload;
pub mod signer;
