use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_reference_tables::Migration),
            Box::new(m20240301_000002_create_project_tables::Migration),
            Box::new(m20240301_000003_create_time_tables::Migration),
            Box::new(m20240301_000004_create_roster_delivery_metrics_tables::Migration),
            Box::new(m20240301_000005_create_sequence_locks::Migration),
        ]
    }
}

mod m20240301_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Users::Location).string().null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::ExpectedTatDays)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSubcategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductSubcategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductSubcategories::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductSubcategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductSubcategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_subcategories_product_id")
                                .from(ProductSubcategories::Table, ProductSubcategories::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductTasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductTasks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductTasks::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductTasks::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductTasks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_tasks_product_id")
                                .from(ProductTasks::Table, ProductTasks::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_tasks_product_name")
                        .table(ProductTasks::Table)
                        .col(ProductTasks::ProductId)
                        .col(ProductTasks::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Regions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Regions::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Regions::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Regions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Cities::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Cities::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Cities::Name).string().not_null())
                        .col(ColumnDef::new(Cities::RegionId).uuid().null())
                        .col(
                            ColumnDef::new(Cities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cities_region_id")
                                .from(Cities::Table, Cities::RegionId)
                                .to(Regions::Table, Regions::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectStatusOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectStatusOptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::CategoryOne)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::CategoryTwo)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusOptions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Holidays::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Holidays::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Holidays::Date).date().not_null())
                        .col(ColumnDef::new(Holidays::Location).string().not_null())
                        .col(ColumnDef::new(Holidays::Name).string().not_null())
                        .col(
                            ColumnDef::new(Holidays::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Holidays::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_holidays_date_location")
                        .table(Holidays::Table)
                        .col(Holidays::Date)
                        .col(Holidays::Location)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Holidays::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProjectStatusOptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Cities::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Regions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductTasks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductSubcategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Username,
        FullName,
        Email,
        Role,
        Location,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        ExpectedTatDays,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductSubcategories {
        Table,
        Id,
        ProductId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductTasks {
        Table,
        Id,
        ProductId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Regions {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Cities {
        Table,
        Id,
        Name,
        RegionId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProjectStatusOptions {
        Table,
        Id,
        Name,
        SortOrder,
        CategoryOne,
        CategoryTwo,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Holidays {
        Table,
        Id,
        Date,
        Location,
        Name,
        IsActive,
        CreatedAt,
    }
}

mod m20240301_000002_create_project_tables {
    use super::m20240301_000001_create_reference_tables::{
        Cities, ProductSubcategories, ProductTasks, Products, ProjectStatusOptions, Users,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_project_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Projects::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Projects::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Projects::HsId)
                                .string_len(8)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Projects::OpportunityId).string().not_null())
                        .col(ColumnDef::new(Projects::ProjectName).string().not_null())
                        .col(ColumnDef::new(Projects::BuilderName).string().not_null())
                        .col(ColumnDef::new(Projects::CityId).uuid().not_null())
                        .col(ColumnDef::new(Projects::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Projects::ProductSubcategoryId).uuid().null())
                        .col(ColumnDef::new(Projects::Quantity).integer().not_null())
                        .col(ColumnDef::new(Projects::PurchaseDate).date().not_null())
                        .col(
                            ColumnDef::new(Projects::SalesConfirmationDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Projects::ExpectedTatDays)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Projects::AccountManager).string().not_null())
                        .col(ColumnDef::new(Projects::DpmId).uuid().not_null())
                        .col(ColumnDef::new(Projects::CurrentStatusId).uuid().not_null())
                        .col(ColumnDef::new(Projects::ProjectInchargeId).uuid().null())
                        .col(ColumnDef::new(Projects::ExpectedCompletionDate).date().null())
                        .col(
                            ColumnDef::new(Projects::DeliveryPerformanceRating)
                                .decimal_len(3, 1)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Projects::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Projects::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_city_id")
                                .from(Projects::Table, Projects::CityId)
                                .to(Cities::Table, Cities::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_product_id")
                                .from(Projects::Table, Projects::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_product_subcategory_id")
                                .from(Projects::Table, Projects::ProductSubcategoryId)
                                .to(ProductSubcategories::Table, ProductSubcategories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_dpm_id")
                                .from(Projects::Table, Projects::DpmId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_current_status_id")
                                .from(Projects::Table, Projects::CurrentStatusId)
                                .to(ProjectStatusOptions::Table, ProjectStatusOptions::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_projects_project_incharge_id")
                                .from(Projects::Table, Projects::ProjectInchargeId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_projects_created_at")
                        .table(Projects::Table)
                        .col(Projects::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::ProjectId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::StatusId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::StatusNameSnapshot)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::CategoryOneSnapshot)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::CategoryTwoSnapshot)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::ChangedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectStatusHistory::ChangedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectStatusHistory::Comments).text().null())
                        .col(
                            ColumnDef::new(ProjectStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_status_history_project_id")
                                .from(ProjectStatusHistory::Table, ProjectStatusHistory::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_status_history_status_id")
                                .from(ProjectStatusHistory::Table, ProjectStatusHistory::StatusId)
                                .to(ProjectStatusOptions::Table, ProjectStatusOptions::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_status_history_changed_by")
                                .from(ProjectStatusHistory::Table, ProjectStatusHistory::ChangedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_project_status_history_project_changed_at")
                        .table(ProjectStatusHistory::Table)
                        .col(ProjectStatusHistory::ProjectId)
                        .col(ProjectStatusHistory::ChangedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectTasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectTasks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectTasks::TaskId)
                                .string_len(20)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProjectTasks::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(ProjectTasks::ProductTaskId).uuid().not_null())
                        .col(ColumnDef::new(ProjectTasks::TaskType).string_len(20).not_null())
                        .col(ColumnDef::new(ProjectTasks::EstimatedTime).integer().not_null())
                        .col(ColumnDef::new(ProjectTasks::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ProjectTasks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_tasks_project_id")
                                .from(ProjectTasks::Table, ProjectTasks::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_tasks_product_task_id")
                                .from(ProjectTasks::Table, ProjectTasks::ProductTaskId)
                                .to(ProductTasks::Table, ProductTasks::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_tasks_created_by")
                                .from(ProjectTasks::Table, ProjectTasks::CreatedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TaskAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TaskAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::AssignmentId)
                                .string_len(20)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::ProjectTaskId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TaskAssignments::AssignedTo).uuid().not_null())
                        .col(
                            ColumnDef::new(TaskAssignments::ProjectedHours)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TaskAssignments::SubTask).text().not_null())
                        .col(
                            ColumnDef::new(TaskAssignments::ReworkType)
                                .string_len(20)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::ExpectedDeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::IsCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::CompletionDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::QualityRating)
                                .decimal_len(3, 1)
                                .null(),
                        )
                        .col(ColumnDef::new(TaskAssignments::AssignedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(TaskAssignments::AssignedDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TaskAssignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_task_assignments_project_task_id")
                                .from(TaskAssignments::Table, TaskAssignments::ProjectTaskId)
                                .to(ProjectTasks::Table, ProjectTasks::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_task_assignments_assigned_to")
                                .from(TaskAssignments::Table, TaskAssignments::AssignedTo)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_task_assignments_assigned_by")
                                .from(TaskAssignments::Table, TaskAssignments::AssignedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_task_assignments_assigned_to")
                        .table(TaskAssignments::Table)
                        .col(TaskAssignments::AssignedTo)
                        .col(TaskAssignments::IsCompleted)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TaskAssignments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProjectTasks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProjectStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Projects::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Projects {
        Table,
        Id,
        HsId,
        OpportunityId,
        ProjectName,
        BuilderName,
        CityId,
        ProductId,
        ProductSubcategoryId,
        Quantity,
        PurchaseDate,
        SalesConfirmationDate,
        ExpectedTatDays,
        AccountManager,
        DpmId,
        CurrentStatusId,
        ProjectInchargeId,
        ExpectedCompletionDate,
        DeliveryPerformanceRating,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProjectStatusHistory {
        Table,
        Id,
        ProjectId,
        StatusId,
        StatusNameSnapshot,
        CategoryOneSnapshot,
        CategoryTwoSnapshot,
        ChangedBy,
        ChangedAt,
        Comments,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProjectTasks {
        Table,
        Id,
        TaskId,
        ProjectId,
        ProductTaskId,
        TaskType,
        EstimatedTime,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum TaskAssignments {
        Table,
        Id,
        AssignmentId,
        ProjectTaskId,
        AssignedTo,
        ProjectedHours,
        SubTask,
        ReworkType,
        ExpectedDeliveryDate,
        IsActive,
        IsCompleted,
        CompletionDate,
        QualityRating,
        AssignedBy,
        AssignedDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_time_tables {
    use super::m20240301_000001_create_reference_tables::Users;
    use super::m20240301_000002_create_project_tables::TaskAssignments;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_time_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ActiveTimers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActiveTimers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActiveTimers::TaskAssignmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActiveTimers::TeamMemberId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ActiveTimers::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_active_timers_task_assignment_id")
                                .from(ActiveTimers::Table, ActiveTimers::TaskAssignmentId)
                                .to(TaskAssignments::Table, TaskAssignments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_active_timers_team_member_id")
                                .from(ActiveTimers::Table, ActiveTimers::TeamMemberId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TimeSessions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TimeSessions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimeSessions::TaskAssignmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TimeSessions::TeamMemberId).uuid().not_null())
                        .col(
                            ColumnDef::new(TimeSessions::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimeSessions::EndedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimeSessions::DurationMinutes)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TimeSessions::DateWorked).date().not_null())
                        .col(
                            ColumnDef::new(TimeSessions::SessionType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(TimeSessions::Description).text().null())
                        .col(
                            ColumnDef::new(TimeSessions::IsEdited)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(TimeSessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimeSessions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_time_sessions_task_assignment_id")
                                .from(TimeSessions::Table, TimeSessions::TaskAssignmentId)
                                .to(TaskAssignments::Table, TaskAssignments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_time_sessions_team_member_id")
                                .from(TimeSessions::Table, TimeSessions::TeamMemberId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_time_sessions_assignment_member_date")
                        .table(TimeSessions::Table)
                        .col(TimeSessions::TaskAssignmentId)
                        .col(TimeSessions::TeamMemberId)
                        .col(TimeSessions::DateWorked)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DailyTimeTotals::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyTimeTotals::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyTimeTotals::TaskAssignmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyTimeTotals::TeamMemberId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DailyTimeTotals::DateWorked).date().not_null())
                        .col(
                            ColumnDef::new(DailyTimeTotals::TotalMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyTimeTotals::IsManuallyEdited)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(DailyTimeTotals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyTimeTotals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_time_totals_task_assignment_id")
                                .from(DailyTimeTotals::Table, DailyTimeTotals::TaskAssignmentId)
                                .to(TaskAssignments::Table, TaskAssignments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_time_totals_team_member_id")
                                .from(DailyTimeTotals::Table, DailyTimeTotals::TeamMemberId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_daily_time_totals_assignment_member_date")
                        .table(DailyTimeTotals::Table)
                        .col(DailyTimeTotals::TaskAssignmentId)
                        .col(DailyTimeTotals::TeamMemberId)
                        .col(DailyTimeTotals::DateWorked)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_daily_time_totals_member_date")
                        .table(DailyTimeTotals::Table)
                        .col(DailyTimeTotals::TeamMemberId)
                        .col(DailyTimeTotals::DateWorked)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TimerActionLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TimerActionLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimerActionLogs::TaskAssignmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimerActionLogs::TeamMemberId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimerActionLogs::Action)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimerActionLogs::LoggedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TimerActionLogs::Details).text().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_timer_action_logs_assignment")
                        .table(TimerActionLogs::Table)
                        .col(TimerActionLogs::TaskAssignmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TimerActionLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DailyTimeTotals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TimeSessions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ActiveTimers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ActiveTimers {
        Table,
        Id,
        TaskAssignmentId,
        TeamMemberId,
        StartedAt,
    }

    #[derive(DeriveIden)]
    enum TimeSessions {
        Table,
        Id,
        TaskAssignmentId,
        TeamMemberId,
        StartedAt,
        EndedAt,
        DurationMinutes,
        DateWorked,
        SessionType,
        Description,
        IsEdited,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DailyTimeTotals {
        Table,
        Id,
        TaskAssignmentId,
        TeamMemberId,
        DateWorked,
        TotalMinutes,
        IsManuallyEdited,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TimerActionLogs {
        Table,
        Id,
        TaskAssignmentId,
        TeamMemberId,
        Action,
        LoggedAt,
        Details,
    }
}

mod m20240301_000004_create_roster_delivery_metrics_tables {
    use super::m20240301_000001_create_reference_tables::Users;
    use super::m20240301_000002_create_project_tables::Projects;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_roster_delivery_metrics_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DailyRosters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyRosters::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DailyRosters::TeamMemberId).uuid().not_null())
                        .col(ColumnDef::new(DailyRosters::Date).date().not_null())
                        .col(ColumnDef::new(DailyRosters::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(DailyRosters::MiscHours)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DailyRosters::MiscDescription).text().null())
                        .col(ColumnDef::new(DailyRosters::Notes).text().null())
                        .col(
                            ColumnDef::new(DailyRosters::IsAutoCreated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(DailyRosters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyRosters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_rosters_team_member_id")
                                .from(DailyRosters::Table, DailyRosters::TeamMemberId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_daily_rosters_member_date")
                        .table(DailyRosters::Table)
                        .col(DailyRosters::TeamMemberId)
                        .col(DailyRosters::Date)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectDeliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectDeliveries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectDeliveries::ProjectId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProjectDeliveries::DeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::ProjectName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectDeliveries::HsId).string_len(8).not_null())
                        .col(
                            ColumnDef::new(ProjectDeliveries::ProjectInchargeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::ExpectedCompletionDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::ActualCompletionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::DeliveryPerformanceRating)
                                .decimal_len(3, 1)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::DaysVarianceSnapshot)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectDeliveries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_deliveries_project_id")
                                .from(ProjectDeliveries::Table, ProjectDeliveries::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_deliveries_project_incharge_id")
                                .from(ProjectDeliveries::Table, ProjectDeliveries::ProjectInchargeId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_project_deliveries_project_date")
                        .table(ProjectDeliveries::Table)
                        .col(ProjectDeliveries::ProjectId)
                        .col(ProjectDeliveries::DeliveryDate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_project_deliveries_incharge_date")
                        .table(ProjectDeliveries::Table)
                        .col(ProjectDeliveries::ProjectInchargeId)
                        .col(ProjectDeliveries::DeliveryDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TeamMemberMetrics::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TeamMemberMetrics::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::TeamMemberId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TeamMemberMetrics::Date).date().not_null())
                        .col(
                            ColumnDef::new(TeamMemberMetrics::TotalProjectedMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::TotalWorkedMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::AvailableMinutes)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::WorkedTodayMinutes)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::UtilizationPct)
                                .decimal_len(5, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::ProductivityScore)
                                .decimal_len(5, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::AverageQualityRating)
                                .decimal_len(3, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::AverageDeliveryRating)
                                .decimal_len(3, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::OnTimeRate)
                                .decimal_len(5, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::AssignmentsCompleted)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::RatedAssignments)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::ProjectsDelivered)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::OnTimeDeliveries)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeamMemberMetrics::ComputedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_team_member_metrics_team_member_id")
                                .from(TeamMemberMetrics::Table, TeamMemberMetrics::TeamMemberId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_team_member_metrics_member_date")
                        .table(TeamMemberMetrics::Table)
                        .col(TeamMemberMetrics::TeamMemberId)
                        .col(TeamMemberMetrics::Date)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TeamMemberMetrics::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProjectDeliveries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DailyRosters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DailyRosters {
        Table,
        Id,
        TeamMemberId,
        Date,
        Status,
        MiscHours,
        MiscDescription,
        Notes,
        IsAutoCreated,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProjectDeliveries {
        Table,
        Id,
        ProjectId,
        DeliveryDate,
        ProjectName,
        HsId,
        ProjectInchargeId,
        ExpectedCompletionDate,
        ActualCompletionDate,
        DeliveryPerformanceRating,
        DaysVarianceSnapshot,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TeamMemberMetrics {
        Table,
        Id,
        TeamMemberId,
        Date,
        TotalProjectedMinutes,
        TotalWorkedMinutes,
        AvailableMinutes,
        WorkedTodayMinutes,
        UtilizationPct,
        ProductivityScore,
        AverageQualityRating,
        AverageDeliveryRating,
        OnTimeRate,
        AssignmentsCompleted,
        RatedAssignments,
        ProjectsDelivered,
        OnTimeDeliveries,
        ComputedAt,
    }
}

mod m20240301_000005_create_sequence_locks {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_sequence_locks"
        }
    }

    /// Names of the identifier sequences guarded by a lock row.
    pub const SEQUENCES: [&str; 3] = ["hs_id", "task_id", "assignment_id"];

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SequenceLocks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SequenceLocks::Name)
                                .string_len(32)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceLocks::Version)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            for name in SEQUENCES {
                let insert = Query::insert()
                    .into_table(SequenceLocks::Table)
                    .columns([SequenceLocks::Name, SequenceLocks::Version])
                    .values([name.into(), 0i64.into()])
                    .map_err(|e| DbErr::Migration(e.to_string()))?
                    .to_owned();
                manager.exec_stmt(insert).await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SequenceLocks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SequenceLocks {
        Table,
        Name,
        Version,
    }
}
