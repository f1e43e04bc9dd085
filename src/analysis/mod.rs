pub mod aggregate;
mod cache;
pub mod day_lookup;
pub mod fetch;
pub mod period;


pub use aggregate::{aggregate, bucket_key};
pub use cache::CacheManager;
pub use day_lookup::{count_for, DayIndex};
pub use fetch::{decode_body, fetch_many, fetch_or_empty, DataSource, HttpDataSource};
pub use period::resolve_period;
