pub mod bridge_control;
pub mod channel_select;
pub mod config_form;
pub mod log_console;
pub mod settings;
pub mod source_select;
pub mod welcome;
