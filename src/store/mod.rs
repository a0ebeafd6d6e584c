pub mod config_store;
pub mod script_io;
