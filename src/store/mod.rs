mod db;
mod records;

pub use db::{KeyedStore, StoreTransaction};
pub use records::{
    now_millis, CachedSubtitle, Collection, IndexValue, OverlaySettings, QuotaRecord, Record,
    TokenRecord, UserInfoRecord,
};
