pub mod faucet;
pub mod horizon;

pub use faucet::{Faucet, FriendbotClient};
pub use horizon::{Horizon, HorizonClient};
