pub mod config;
pub mod notify;
pub mod output;
pub mod source;
pub mod timetable;
pub mod watch;
