pub mod anthropic;
pub mod mapping;
pub mod server_tools;
