pub mod audit;
pub mod basic_auth;
