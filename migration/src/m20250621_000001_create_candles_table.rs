use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Candles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candles::Market).string_len(32).not_null())
                    .col(ColumnDef::new(Candles::Timestamp).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Candles::Open).double().not_null())
                    .col(ColumnDef::new(Candles::High).double().not_null())
                    .col(ColumnDef::new(Candles::Low).double().not_null())
                    .col(ColumnDef::new(Candles::Close).double().not_null())
                    .col(ColumnDef::new(Candles::Volume).double().not_null())
                    .col(ColumnDef::new(Candles::AccTradeValue).double().not_null())
                    .col(ColumnDef::new(Candles::Timeframe).string_len(8).not_null().default("1m"))
                    .col(
                        ColumnDef::new(Candles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One candle per market and start time; range queries use the same index
        manager
            .create_index(
                Index::create()
                    .name("idx_candles_market_timestamp")
                    .table(Candles::Table)
                    .col(Candles::Market)
                    .col(Candles::Timestamp)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Candles {
    Table,
    Id,
    Market,
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
    AccTradeValue,
    Timeframe,
    CreatedAt,
}
