pub mod api;
pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod issuer;
pub mod notify;
pub mod policy;
pub mod registry;

pub use error::{Error, ErrorKind, Result};
pub use issuer::{IssuedCredentials, Issuer};
pub use registry::{IdentifierMetadata, Registry};
