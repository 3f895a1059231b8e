pub mod append_misc_hours_command;
pub mod update_roster_status_command;
