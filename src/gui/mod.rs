pub mod app;
pub mod windows;
