pub mod action;
pub mod agent;
pub mod agent_model;
pub mod ai_model;
pub mod error;
pub mod executor;
pub mod global;
pub mod parser;
pub mod step_plan;
