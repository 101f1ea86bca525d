mod account;
mod settings;
mod subtitles;

pub use account::{AccountRecords, ApiEndpoint, TokenVault};
pub use settings::SettingsRepository;
pub use subtitles::{SubtitleCache, SUBTITLE_CACHE_SIZE};
