use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_movement_tables::Migration),
            Box::new(m20240301_000003_create_balance_and_ledger_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Articles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Articles::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Articles::Code).string().not_null())
                        .col(ColumnDef::new(Articles::Description).string().null())
                        .col(
                            ColumnDef::new(Articles::LotTracking)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Articles::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Articles::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Articles::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_articles_code")
                        .table(Articles::Table)
                        .col(Articles::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Code).string().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Warehouses::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLocations::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLocations::WarehouseId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLocations::Code).string().not_null())
                        .col(
                            ColumnDef::new(StockLocations::IsScrap)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(StockLocations::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(StockLocations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLocations::UpdatedAt)
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
                        .name("uidx_stock_locations_warehouse_code")
                        .table(StockLocations::Table)
                        .col(StockLocations::WarehouseId)
                        .col(StockLocations::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Lots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Lots::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Lots::ArticleId).big_integer().not_null())
                        .col(ColumnDef::new(Lots::LotNumber).string().not_null())
                        .col(ColumnDef::new(Lots::ExpirationDate).date().null())
                        .col(ColumnDef::new(Lots::Notes).string().null())
                        .col(ColumnDef::new(Lots::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Lots::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_lots_article_lot_number")
                        .table(Lots::Table)
                        .col(Lots::ArticleId)
                        .col(Lots::LotNumber)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Lots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Articles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Articles {
        Table,
        Id,
        Code,
        Description,
        LotTracking,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Code,
        Name,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockLocations {
        Table,
        Id,
        WarehouseId,
        Code,
        IsScrap,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Lots {
        Table,
        Id,
        ArticleId,
        LotNumber,
        ExpirationDate,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_movement_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_movement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementNo)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::EffectiveAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::IdempotencyKey)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::SourceDocumentType)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::SourceDocumentId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReasonCode).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::PostedBy).string().null())
                        .col(ColumnDef::new(StockMovements::CancelledBy).string().null())
                        .col(ColumnDef::new(StockMovements::PostedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(StockMovements::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::UpdatedAt)
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
                        .name("uidx_stock_movements_movement_no")
                        .table(StockMovements::Table)
                        .col(StockMovements::MovementNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Race-safety contract of idempotent create: duplicates are caught
            // here, not by a prior read.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_stock_movements_idempotency_key")
                        .table(StockMovements::Table)
                        .col(StockMovements::IdempotencyKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_status")
                        .table(StockMovements::Table)
                        .col(StockMovements::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovementLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovementLines::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::MovementId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::LineNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::ArticleId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::LotId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::Qty)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::UnitCost)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::SrcWarehouseId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::SrcLocationId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::DstWarehouseId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::DstLocationId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementLines::Direction)
                                .string_len(8)
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovementLines::Notes).string().null())
                        .col(
                            ColumnDef::new(StockMovementLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movement_lines_movement")
                                .from(StockMovementLines::Table, StockMovementLines::MovementId)
                                .to(StockMovements::Table, StockMovements::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_stock_movement_lines_movement_line_no")
                        .table(StockMovementLines::Table)
                        .col(StockMovementLines::MovementId)
                        .col(StockMovementLines::LineNo)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovementLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        MovementNo,
        MovementType,
        Status,
        EffectiveAt,
        IdempotencyKey,
        SourceDocumentType,
        SourceDocumentId,
        ReasonCode,
        Notes,
        CreatedBy,
        PostedBy,
        CancelledBy,
        PostedAt,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovementLines {
        Table,
        Id,
        MovementId,
        LineNo,
        ArticleId,
        LotId,
        Qty,
        UnitCost,
        SrcWarehouseId,
        SrcLocationId,
        DstWarehouseId,
        DstLocationId,
        Direction,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000003_create_balance_and_ledger_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_balance_and_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBalances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockBalances::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::ArticleId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::WarehouseId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::LocationId)
                                .big_integer()
                                .not_null(),
                        )
                        // 0 = no lot; kept NOT NULL so the unique index below
                        // covers lot-less stock (NULLs are distinct in SQL).
                        .col(
                            ColumnDef::new(StockBalances::LotId)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockBalances::QtyOnHand)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockBalances::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::UpdatedAt)
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
                        .name("uidx_stock_balances_key")
                        .table(StockBalances::Table)
                        .col(StockBalances::ArticleId)
                        .col(StockBalances::WarehouseId)
                        .col(StockBalances::LocationId)
                        .col(StockBalances::LotId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockLedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedgerEntries::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::MovementId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::MovementLineId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::LegNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ArticleId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::WarehouseId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::LocationId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::LotId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::DeltaQty)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::QtyBefore)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::QtyAfter)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::UnitCost)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::EffectiveAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::PostedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_ledger_entries_movement")
                                .from(StockLedgerEntries::Table, StockLedgerEntries::MovementId)
                                .to(StockMovements::Table, StockMovements::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_entries_movement_id")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::MovementId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_entries_key")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::ArticleId)
                        .col(StockLedgerEntries::WarehouseId)
                        .col(StockLedgerEntries::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovementEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovementEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementEvents::MovementId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementEvents::EventType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementEvents::Actor)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementEvents::StatusBefore)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovementEvents::StatusAfter)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovementEvents::Details).json().null())
                        .col(
                            ColumnDef::new(StockMovementEvents::CreatedAt)
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
                        .name("idx_stock_movement_events_movement_id")
                        .table(StockMovementEvents::Table)
                        .col(StockMovementEvents::MovementId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovementEvents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLedgerEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockBalances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum StockBalances {
        Table,
        Id,
        ArticleId,
        WarehouseId,
        LocationId,
        LotId,
        QtyOnHand,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockLedgerEntries {
        Table,
        Id,
        MovementId,
        MovementLineId,
        LegNo,
        ArticleId,
        WarehouseId,
        LocationId,
        LotId,
        DeltaQty,
        QtyBefore,
        QtyAfter,
        UnitCost,
        EffectiveAt,
        PostedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovementEvents {
        Table,
        Id,
        MovementId,
        EventType,
        Actor,
        StatusBefore,
        StatusAfter,
        Details,
        CreatedAt,
    }
}
