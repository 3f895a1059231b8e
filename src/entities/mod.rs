// Reference data
pub mod city;
pub mod holiday;
pub mod product;
pub mod product_subcategory;
pub mod product_task;
pub mod project_status_option;
pub mod region;
pub mod user;

// Projects and assignments
pub mod project;
pub mod project_status_history;
pub mod project_task;
pub mod task_assignment;

// Time accounting
pub mod active_timer;
pub mod daily_time_total;
pub mod time_session;
pub mod timer_action_log;

// Roster, deliveries and metrics
pub mod daily_roster;
pub mod project_delivery;
pub mod team_member_metrics;

pub mod sequence_lock;
