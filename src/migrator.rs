use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_inventory_items_table::Migration),
            Box::new(m20240101_000002_create_dispatches_table::Migration),
            Box::new(m20240101_000003_create_dispatch_lines_table::Migration),
        ]
    }
}

mod m20240101_000001_create_inventory_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Code).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Kind).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::LastUpdated)
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
                        .name("idx_inventory_items_code")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_kind")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Kind)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryItems {
        Table,
        Id,
        Code,
        Name,
        Kind,
        AvailableQuantity,
        CreatedAt,
        LastUpdated,
    }
}

mod m20240101_000002_create_dispatches_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_dispatches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Dispatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Dispatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Dispatches::Destination).string().not_null())
                        .col(
                            ColumnDef::new(Dispatches::CustomerName)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Dispatches::Address)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Dispatches::ContactNumber)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Dispatches::DispatchDate).date().not_null())
                        .col(ColumnDef::new(Dispatches::DeliveryDate).date())
                        .col(
                            ColumnDef::new(Dispatches::TransportMode)
                                .string()
                                .not_null()
                                .default("Road"),
                        )
                        .col(
                            ColumnDef::new(Dispatches::VehicleNumber)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Dispatches::DriverName)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Dispatches::DriverContact)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Dispatches::DispatchedBy)
                                .string()
                                .not_null()
                                .default("Admin"),
                        )
                        .col(
                            ColumnDef::new(Dispatches::Remarks)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Dispatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(Dispatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Dispatches::UpdatedAt)
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
                        .name("idx_dispatches_status")
                        .table(Dispatches::Table)
                        .col(Dispatches::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dispatches_dispatch_date")
                        .table(Dispatches::Table)
                        .col(Dispatches::DispatchDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Dispatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Dispatches {
        Table,
        Id,
        Destination,
        CustomerName,
        Address,
        ContactNumber,
        DispatchDate,
        DeliveryDate,
        TransportMode,
        VehicleNumber,
        DriverName,
        DriverContact,
        DispatchedBy,
        Remarks,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_dispatch_lines_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_dispatch_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DispatchLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DispatchLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DispatchLines::DispatchId).uuid().not_null())
                        .col(ColumnDef::new(DispatchLines::ItemId).uuid().not_null())
                        .col(ColumnDef::new(DispatchLines::ItemCode).string().not_null())
                        .col(ColumnDef::new(DispatchLines::ItemName).string().not_null())
                        .col(ColumnDef::new(DispatchLines::ItemKind).string().not_null())
                        .col(ColumnDef::new(DispatchLines::Quantity).integer().not_null())
                        .col(ColumnDef::new(DispatchLines::Position).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dispatch_lines_dispatch_id")
                                .from(DispatchLines::Table, DispatchLines::DispatchId)
                                .to(
                                    super::m20240101_000002_create_dispatches_table::Dispatches::Table,
                                    super::m20240101_000002_create_dispatches_table::Dispatches::Id,
                                )
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dispatch_lines_dispatch_id")
                        .table(DispatchLines::Table)
                        .col(DispatchLines::DispatchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dispatch_lines_item_id")
                        .table(DispatchLines::Table)
                        .col(DispatchLines::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DispatchLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DispatchLines {
        Table,
        Id,
        DispatchId,
        ItemId,
        ItemCode,
        ItemName,
        ItemKind,
        Quantity,
        Position,
    }
}
