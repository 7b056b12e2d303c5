//! Candle store backed by a sea-orm connection

use crate::entity::candles::{self, Entity as Candles};
use aitrading_rs::data::{validate_batch, Candle, CandleStore, DUPLICATE_WINDOW_SECS};
use aitrading_rs::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Insert, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;

fn store_err(e: DbErr) -> Error {
    Error::Store(e.to_string())
}

/// Insert that leaves an existing `(market, timestamp)` row untouched.
///
/// MySQL has no `DO NOTHING`; naming a target column makes sea-query emit a
/// no-op `ON DUPLICATE KEY UPDATE market = market` there and
/// `ON CONFLICT (..) DO NOTHING` on SQLite and Postgres.
fn insert_ignoring_duplicate(model: candles::ActiveModel) -> Insert<candles::ActiveModel> {
    Candles::insert(model).on_conflict(
        OnConflict::columns([candles::Column::Market, candles::Column::Timestamp])
            .do_nothing_on([candles::Column::Market])
            .to_owned(),
    )
}

/// `CandleStore` over a relational database.
///
/// Expects the `candles` table from the migration crate, including its unique
/// `(market, timestamp)` index.
#[derive(Debug, Clone)]
pub struct SeaOrmCandleStore {
    db: DatabaseConnection,
}

impl SeaOrmCandleStore {
    /// Create new store
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Whether a stored candle starts within the duplicate window of `timestamp`
    async fn has_neighbour<C: ConnectionTrait>(
        conn: &C,
        market: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        let window = Duration::seconds(DUPLICATE_WINDOW_SECS);
        let found = Candles::find()
            .filter(candles::Column::Market.eq(market))
            .filter(candles::Column::Timestamp.gt(timestamp - window))
            .filter(candles::Column::Timestamp.lt(timestamp + window))
            .count(conn)
            .await
            .map_err(store_err)?;
        Ok(found > 0)
    }

    async fn edge_timestamp(&self, market: &str, newest: bool) -> Result<Option<DateTime<Utc>>> {
        let query = Candles::find().filter(candles::Column::Market.eq(market));
        let query = if newest {
            query.order_by_desc(candles::Column::Timestamp)
        } else {
            query.order_by_asc(candles::Column::Timestamp)
        };
        let model = query.one(&self.db).await.map_err(store_err)?;
        Ok(model.map(|m| m.timestamp))
    }
}

#[async_trait]
impl CandleStore for SeaOrmCandleStore {
    async fn insert_batch(&self, candles: Vec<Candle>) -> Result<usize> {
        validate_batch(&candles)?;
        if candles.is_empty() {
            return Ok(0);
        }

        let received = candles.len();
        let txn = self.db.begin().await.map_err(store_err)?;
        let now = Utc::now();
        let mut inserted = 0usize;

        for candle in candles {
            if Self::has_neighbour(&txn, &candle.market, candle.timestamp).await? {
                continue;
            }
            let model = candles::ActiveModel {
                id: NotSet,
                market: Set(candle.market),
                timestamp: Set(candle.timestamp),
                open: Set(candle.open),
                high: Set(candle.high),
                low: Set(candle.low),
                close: Set(candle.close),
                volume: Set(candle.volume),
                acc_trade_value: Set(candle.acc_trade_value),
                timeframe: Set(candle.timeframe),
                created_at: Set(now),
            };
            let rows = insert_ignoring_duplicate(model)
                .exec_without_returning(&txn)
                .await
                .map_err(store_err)?;
            inserted += rows as usize;
        }

        txn.commit().await.map_err(store_err)?;
        debug!(received, inserted, "Candle batch committed");
        Ok(inserted)
    }

    async fn query(
        &self,
        market: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let mut query = Candles::find().filter(candles::Column::Market.eq(market));
        if let Some(start) = start {
            query = query.filter(candles::Column::Timestamp.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(candles::Column::Timestamp.lte(end));
        }
        let models = query
            .order_by_asc(candles::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(store_err)?;
        Ok(models.into_iter().map(Candle::from).collect())
    }

    async fn count(&self, market: &str) -> Result<u64> {
        Candles::find()
            .filter(candles::Column::Market.eq(market))
            .count(&self.db)
            .await
            .map_err(store_err)
    }

    async fn first_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        self.edge_timestamp(market, false).await
    }

    async fn last_timestamp(&self, market: &str) -> Result<Option<DateTime<Utc>>> {
        self.edge_timestamp(market, true).await
    }

    async fn list_markets(&self) -> Result<Vec<String>> {
        Candles::find()
            .select_only()
            .column(candles::Column::Market)
            .distinct()
            .order_by_asc(candles::Column::Market)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(store_err)
    }

    async fn delete_range(
        &self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let result = Candles::delete_many()
            .filter(candles::Column::Market.eq(market))
            .filter(candles::Column::Timestamp.gte(start))
            .filter(candles::Column::Timestamp.lte(end))
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_all(&self, market: &str) -> Result<u64> {
        let result = Candles::delete_many()
            .filter(candles::Column::Market.eq(market))
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_all_markets(&self) -> Result<u64> {
        let result = Candles::delete_many()
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_oldest(&self, market: &str, count: u64) -> Result<u64> {
        if count == 0 {
            return Ok(0);
        }
        let ids: Vec<i64> = Candles::find()
            .select_only()
            .column(candles::Column::Id)
            .filter(candles::Column::Market.eq(market))
            .order_by_asc(candles::Column::Timestamp)
            .limit(count)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(store_err)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let result = Candles::delete_many()
            .filter(candles::Column::Id.is_in(ids))
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected)
    }
}
