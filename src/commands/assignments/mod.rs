pub mod complete_assignment_command;
pub mod create_assignment_command;
pub mod update_assignment_command;
