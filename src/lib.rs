// Public library interface for revmap-rs
// The CLI and the debug-layout tool both drive the pipeline through these modules

pub mod config;
pub mod layout;
pub mod manager;
pub mod output;
pub mod scanner;
pub mod tree;
