use std::sync::Arc;

use crate::{
    commands::CommandContext,
    services::{
        assignments::AssignmentService, metrics::MetricsService,
        projects::ProjectService, roster::RosterService, timers::TimerService, users::UserService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    ctx: Arc<CommandContext>,
}

impl ServiceFactory {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(self.ctx.clone())
    }

    pub fn assignment_service(&self) -> AssignmentService {
        AssignmentService::new(self.ctx.clone())
    }

    pub fn timer_service(&self) -> TimerService {
        TimerService::new(self.ctx.clone())
    }

    pub fn roster_service(&self) -> RosterService {
        RosterService::new(self.ctx.clone())
    }

    pub fn metrics_service(&self) -> MetricsService {
        self.ctx.metrics()
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.ctx.db.clone())
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub projects: Arc<ProjectService>,
    pub assignments: Arc<AssignmentService>,
    pub timers: Arc<TimerService>,
    pub roster: Arc<RosterService>,
    pub metrics: Arc<MetricsService>,
    pub users: Arc<UserService>,
}

impl ServiceContainer {
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            projects: Arc::new(factory.project_service()),
            assignments: Arc::new(factory.assignment_service()),
            timers: Arc::new(factory.timer_service()),
            roster: Arc::new(factory.roster_service()),
            metrics: Arc::new(factory.metrics_service()),
            users: Arc::new(factory.user_service()),
        }
    }
}
