// Services module - Business logic

pub mod pass_issuer;
pub mod pass_signer;
pub mod pass_verifier;
pub mod password;
pub mod qr_generator;
pub mod signature;
