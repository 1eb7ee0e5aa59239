// TUI widget modules for each board panel.

pub mod activity;
pub mod contributors;
pub mod idle;
pub mod standings;
pub mod status_bar;
