use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid strkey: {0}")]
    InvalidStrkey(String),
    #[error("account {name}: address in file ({declared}) does not match derived address ({derived})")]
    AddressMismatch {
        name: String,
        declared: String,
        derived: String,
    },
    #[error("duplicate account name in input file: {0}")]
    DuplicateAccount(String),
    #[error("token issuer account not found: {0}")]
    MissingIssuer(String),
    #[error("invalid asset {code}: {reason}")]
    InvalidAsset { code: String, reason: String },
    #[error("could not build transaction: {0}")]
    TxBuild(String),
    #[error("horizon request failed: {0}")]
    Horizon(String),
    #[error("friendbot request failed: {0}")]
    Faucet(String),
}
