pub mod agent;
pub mod browser;
pub mod cli;
pub mod screen;
pub mod trace;
