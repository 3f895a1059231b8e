pub mod create_project_task_command;
