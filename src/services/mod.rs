// Identifiers
pub mod sequences;

// Projects, tasks and assignments
pub mod assignments;
pub mod projects;

// Time accounting
pub mod roster;
pub mod timers;

// Derived records
pub mod delivery;
pub mod metrics;

pub mod users;

// Service factory for dependency injection
pub mod factory;
