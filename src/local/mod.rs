pub mod client;
pub mod export;
pub mod process_file;
pub mod server;
pub mod simulator;
