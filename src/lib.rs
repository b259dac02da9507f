pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod provision;
pub mod registry;
pub mod tx;
pub mod xdr;

pub use config::BootstrapConfig;
pub use error::BootstrapError;
pub use provision::{Provisioner, RunReport};
pub use registry::AccountRegistry;
