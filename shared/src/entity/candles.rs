//! `SeaORM` Entity, @generated manually

use aitrading_rs::data::Candle;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "candles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub market: String,
    /// Candle start, UTC
    pub timestamp: DateTimeUtc,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub acc_trade_value: f64,
    pub timeframe: String, // "1m"
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Candle {
    fn from(model: Model) -> Self {
        Candle::new(
            model.market,
            model.timestamp,
            model.open,
            model.high,
            model.low,
            model.close,
            model.volume,
            model.acc_trade_value,
        )
        .with_timeframe(model.timeframe)
    }
}
