pub mod command_parser;
pub mod command_runner;
pub mod config_loader;
pub mod contest_processor;
pub mod freeze_control;
pub mod scroll_flow;
pub mod submission_query;
