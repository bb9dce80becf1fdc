pub mod memory;
pub mod page;
pub mod session;
