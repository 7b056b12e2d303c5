pub mod candle_store;
pub mod config;
pub mod database;
pub mod entity;

pub use candle_store::SeaOrmCandleStore;
pub use config::Config;
pub use database::get_db_connection;
