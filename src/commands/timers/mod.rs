pub mod edit_session_command;
pub mod manual_entry_command;
pub mod start_timer_command;
pub mod stop_timer_command;
