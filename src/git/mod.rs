pub mod diff_parser;
pub mod history;
pub mod log_parser;
