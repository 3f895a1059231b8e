#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use worklog_api::{
    auth::{Actor, USER_ID_HEADER},
    clock::ManualClock,
    commands::{
        assignments::create_assignment_command::NewAssignment,
        projects::create_project_command::NewProject,
        tasks::create_project_task_command::NewProjectTask,
    },
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        city, product, product_task, project, project_status_option, project_task, region,
        task_assignment,
        project_task::TaskType,
        user::{self, UserRole},
    },
    events::EventSender,
    services::factory::ServiceContainer,
    AppState,
};

/// Names the Postgres server used by the `#[ignore]`d lock-contention tests.
pub const POSTGRES_URL_ENV: &str = "WORKLOG_TEST_POSTGRES_URL";

/// Monday, 4 March 2024, 09:00 UTC.
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Statuses {
    pub sales_confirmation: project_status_option::Model,
    pub in_progress: project_status_option::Model,
    pub awaiting_approval: project_status_option::Model,
    pub final_delivery: project_status_option::Model,
    pub deemed_consumed: project_status_option::Model,
    pub retired: project_status_option::Model,
}

/// Application state over a fresh in-memory SQLite database with seeded
/// reference data, a manual clock and a running event loop.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: ManualClock,
    pub pm: user::Model,
    pub other_pm: user::Model,
    pub tm: user::Model,
    pub tm2: user::Model,
    pub inactive: user::Model,
    pub region: region::Model,
    pub city: city::Model,
    pub product: product::Model,
    pub other_product: product::Model,
    pub product_task: product_task::Model,
    pub foreign_product_task: product_task::Model,
    pub statuses: Statuses,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        customize(&mut cfg);

        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let clock = ManualClock::new(start_instant());
        let (event_sender, event_rx) = EventSender::channel(256);
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            Arc::new(clock.clone()),
            Arc::new(event_sender),
        );
        let event_task = tokio::spawn(worklog_api::events::process_events(
            event_rx,
            worklog_api::event_handlers(&state.ctx),
        ));

        let db = state.db.as_ref();
        let now = start_instant();

        let pm = seed_user(db, "pm.one", "Priya Menon", UserRole::Dpm, now).await;
        let other_pm = seed_user(db, "pm.two", "Omar Haddad", UserRole::Dpm, now).await;
        let tm = seed_user(db, "tm.one", "Tara Mills", UserRole::TeamMember, now).await;
        let tm2 = seed_user(db, "tm.two", "Ken Ito", UserRole::TeamMember, now).await;
        let inactive = {
            let mut row: user::ActiveModel =
                seed_user(db, "tm.gone", "Lee Park", UserRole::TeamMember, now).await.into();
            row.is_active = Set(false);
            row.update(db).await.expect("deactivate user")
        };

        let region = region::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("South".into()),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("seed region");
        let city = city::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Chennai".into()),
            region_id: Set(Some(region.id)),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("seed city");

        let product = seed_product(db, "Facade Design", now).await;
        let other_product = seed_product(db, "Interior Design", now).await;
        let product_task = seed_product_task(db, &product, "Elevation drawing", now).await;
        let foreign_product_task =
            seed_product_task(db, &other_product, "Furniture layout", now).await;

        let statuses = Statuses {
            sales_confirmation: seed_status(db, "Sales Confirmation", 1, true, now).await,
            in_progress: seed_status(db, "Design In Progress", 2, true, now).await,
            awaiting_approval: seed_status(db, "Approval for Deemed Consumed", 3, true, now).await,
            final_delivery: seed_status(db, "Final Delivery", 4, true, now).await,
            deemed_consumed: seed_status(db, "Deemed Consumed", 5, true, now).await,
            retired: seed_status(db, "Retired Stage", 9, false, now).await,
        };

        let router = worklog_api::build_router(state.clone());

        Self {
            router,
            state,
            clock,
            pm,
            other_pm,
            tm,
            tm2,
            inactive,
            region,
            city,
            product,
            other_product,
            product_task,
            foreign_product_task,
            statuses,
            _event_task: event_task,
        }
    }

    /// The same seed data in a fresh schema on the Postgres server named by
    /// `WORKLOG_TEST_POSTGRES_URL`, with a pool large enough for real
    /// row-lock contention.
    pub async fn postgres() -> Self {
        let base = std::env::var(POSTGRES_URL_ENV)
            .unwrap_or_else(|_| panic!("{} must point at a Postgres server", POSTGRES_URL_ENV));
        let schema = format!("worklog_test_{}", Uuid::new_v4().simple());

        let admin = Database::connect(base.as_str())
            .await
            .expect("connect to postgres");
        admin
            .execute_unprepared(&format!("CREATE SCHEMA {}", schema))
            .await
            .expect("create test schema");
        let _ = admin.close().await;

        let separator = if base.contains('?') { '&' } else { '?' };
        let url = format!("{}{}options=-c%20search_path%3D{}", base, separator, schema);
        Self::with_config(move |cfg| {
            cfg.database_url = url;
            cfg.db_max_connections = 16;
            cfg.db_min_connections = 1;
        })
        .await
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.state.db.as_ref()
    }

    pub fn services(&self) -> &ServiceContainer {
        &self.state.services
    }

    pub fn pm_actor(&self) -> Actor {
        Actor::from(&self.pm)
    }

    pub fn tm_actor(&self) -> Actor {
        Actor::from(&self.tm)
    }

    pub fn today(&self) -> NaiveDate {
        self.state.ctx.today()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn new_project(&self, name: &str) -> NewProject {
        NewProject {
            opportunity_id: format!("OPP-{}", name.to_uppercase().replace(' ', "-")),
            project_name: name.to_string(),
            builder_name: "Skyline Builders".into(),
            city_id: self.city.id,
            product_id: self.product.id,
            product_subcategory_id: None,
            quantity: 1,
            purchase_date: date(2024, 2, 1),
            sales_confirmation_date: date(2024, 2, 5),
            expected_tat_days: None,
            account_manager: "Anita Rao".into(),
            status_id: self.statuses.sales_confirmation.id,
            project_incharge_id: Some(self.tm.id),
            expected_completion_date: Some(date(2024, 3, 10)),
            delivery_performance_rating: None,
        }
    }

    /// A configured project owned by `pm`, with `tm` as incharge.
    pub async fn create_project(&self, name: &str) -> project::Model {
        self.services()
            .projects
            .create(self.pm_actor(), self.new_project(name), false)
            .await
            .expect("create project")
    }

    pub async fn create_task(&self, project: &project::Model) -> project_task::Model {
        self.services()
            .assignments
            .create_task(
                self.pm_actor(),
                project.id,
                NewProjectTask {
                    product_task_id: self.product_task.id,
                    task_type: TaskType::New,
                    estimated_time: 240,
                },
            )
            .await
            .expect("create task")
    }

    pub fn new_assignment(
        &self,
        task: &project_task::Model,
        assignee: Uuid,
        projected: i32,
    ) -> NewAssignment {
        NewAssignment {
            project_task_id: task.id,
            assigned_to: assignee,
            projected_hours: projected,
            sub_task: "Front elevation".into(),
            rework_type: None,
            expected_delivery_date: self.today() + Duration::days(5),
        }
    }

    pub async fn create_assignment(
        &self,
        task: &project_task::Model,
        assignee: Uuid,
        projected: i32,
    ) -> task_assignment::Model {
        self.services()
            .assignments
            .create(self.pm_actor(), self.new_assignment(task, assignee, projected))
            .await
            .expect("create assignment")
    }

    /// Project, task and an assignment for `tm` with `projected` minutes.
    pub async fn assignment_for_tm(&self, name: &str, projected: i32) -> task_assignment::Model {
        let project = self.create_project(name).await;
        let task = self.create_task(&project).await;
        self.create_assignment(&task, self.tm.id, projected).await
    }

    /// Runs a timer for `minutes` on behalf of `actor`.
    pub async fn work(&self, actor: Actor, assignment_id: Uuid, minutes: i64) {
        self.services()
            .timers
            .start(actor, assignment_id)
            .await
            .expect("start timer");
        self.advance(Duration::minutes(minutes));
        self.services()
            .timers
            .stop(actor, None)
            .await
            .expect("stop timer");
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<Uuid>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json response")
}

async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    full_name: &str,
    role: UserRole,
    now: DateTime<Utc>,
) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.into()),
        full_name: Set(full_name.into()),
        email: Set(Some(format!("{}@example.com", username))),
        role: Set(role),
        location: Set(None),
        is_active: Set(true),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed user")
}

async fn seed_product(db: &DatabaseConnection, name: &str, now: DateTime<Utc>) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        expected_tat_days: Set(30),
        is_active: Set(true),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed product")
}

async fn seed_product_task(
    db: &DatabaseConnection,
    product: &product::Model,
    name: &str,
    now: DateTime<Utc>,
) -> product_task::Model {
    product_task::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        name: Set(name.into()),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed product task")
}

async fn seed_status(
    db: &DatabaseConnection,
    name: &str,
    sort_order: i32,
    is_active: bool,
    now: DateTime<Utc>,
) -> project_status_option::Model {
    project_status_option::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        sort_order: Set(sort_order),
        category_one: Set("Design".into()),
        category_two: Set(if sort_order >= 4 { "Closed" } else { "Open" }.into()),
        is_active: Set(is_active),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed status")
}
