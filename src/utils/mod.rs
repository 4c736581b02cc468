//! Small conversion and formatting helpers

pub mod helper;

pub use helper::{format_address, format_token_amount, parse_address, parse_token_amount, to_display_f64};
