pub mod account;
pub mod code_store;
pub mod password;
pub mod password_reset;
