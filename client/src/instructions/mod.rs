pub mod accounts;
pub mod rpc;
pub mod stake_pool_instructions;
pub mod utils;
