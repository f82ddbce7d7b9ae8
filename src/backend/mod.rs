pub mod directory;
pub mod export;
pub mod loader;
pub mod merge;
pub mod parser;
pub mod settings;
