pub mod common;
pub mod ethereum;
pub mod evm;
