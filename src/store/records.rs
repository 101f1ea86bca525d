use crate::scheduler::{AnimationType, Transition};
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Текущее время в миллисекундах Unix
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Логические коллекции хранилища
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Токены авторизации
    Tokens,
    /// Скачанные файлы субтитров
    Subtitles,
    /// Настройки и метаданные (одиночные записи)
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Tokens, Collection::Subtitles, Collection::Settings];

    /// Имя таблицы
    pub fn table(&self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Subtitles => "subtitles",
            Self::Settings => "settings",
        }
    }

    /// Вторичные индексы коллекции
    pub fn indices(&self) -> &'static [&'static str] {
        match self {
            Self::Tokens => &["token"],
            Self::Subtitles => &["timestamp", "language"],
            Self::Settings => &[],
        }
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indices().contains(&field)
    }
}

/// Значение поля вторичного индекса
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
}

impl ToSql for IndexValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(value) => value.to_sql(),
            Self::Integer(value) => value.to_sql(),
        }
    }
}

/// Запись, которую можно положить в хранилище
///
/// Тело записи хранится как JSON, поля вторичных индексов дублируются в
/// отдельные колонки.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Коллекция, в которой живет запись
    const COLLECTION: Collection;

    /// Первичный ключ
    fn key(&self) -> &str;

    /// Значения вторичных индексов, имена должны совпадать с `Collection::indices`
    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        Vec::new()
    }
}

/// Токен авторизации у провайдера субтитров (единственная запись)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub base_url: String,
    /// Время сохранения, мс
    pub timestamp: i64,
}

impl TokenRecord {
    pub const KEY: &'static str = "current";

    pub fn new(token: String, api_key: String, base_url: String) -> Self {
        Self {
            token,
            api_key,
            base_url,
            timestamp: now_millis(),
        }
    }
}

impl Record for TokenRecord {
    const COLLECTION: Collection = Collection::Tokens;

    fn key(&self) -> &str {
        Self::KEY
    }

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![("token", IndexValue::Text(self.token.clone()))]
    }
}

/// Скачанный файл субтитров в кэше
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSubtitle {
    /// Идентификатор субтитров у провайдера
    pub id: String,
    /// Исходный текст файла
    pub content: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub language: String,
    pub title: String,
    /// Время сохранения, мс; по нему вытесняются старые записи
    pub timestamp: i64,
}

impl CachedSubtitle {
    pub fn new(id: String, content: String, file_name: String, language: String, title: String) -> Self {
        Self {
            id,
            content,
            file_name,
            language,
            title,
            timestamp: now_millis(),
        }
    }
}

impl Record for CachedSubtitle {
    const COLLECTION: Collection = Collection::Subtitles;

    fn key(&self) -> &str {
        &self.id
    }

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![
            ("timestamp", IndexValue::Integer(self.timestamp)),
            ("language", IndexValue::Text(self.language.clone())),
        ]
    }
}

/// Пользовательские настройки отображения
///
/// Отсутствующие в сохраненной записи поля заполняются значениями по умолчанию.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    pub font_size: u32,
    pub font_color: String,
    pub bg_enabled: bool,
    pub bg_color: String,
    pub bg_opacity: f64,
    pub outline_enabled: bool,
    pub outline_color: String,
    /// Смещение синхронизации в секундах
    pub sync_offset: f64,
    pub animation_enabled: bool,
    pub animation_type: AnimationType,
    /// Длительность анимации в секундах
    pub animation_duration: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            font_color: "#FFFFFF".to_string(),
            bg_enabled: true,
            bg_color: "#000000".to_string(),
            bg_opacity: 0.5,
            outline_enabled: false,
            outline_color: "#000000".to_string(),
            sync_offset: 0.0,
            animation_enabled: true,
            animation_type: AnimationType::Fade,
            animation_duration: 0.3,
        }
    }
}

impl OverlaySettings {
    pub const KEY: &'static str = "userSettings";

    /// Анимация появления реплик, если она включена
    pub fn transition(&self) -> Option<Transition> {
        if !self.animation_enabled {
            return None;
        }
        Some(Transition {
            kind: self.animation_type,
            duration: Duration::try_from_secs_f64(self.animation_duration).unwrap_or_default(),
        })
    }
}

impl Record for OverlaySettings {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> &str {
        Self::KEY
    }
}

/// Данные аккаунта пользователя у провайдера
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfoRecord {
    pub user_id: Option<i64>,
    pub level: Option<String>,
    pub vip: bool,
    pub allowed_downloads: Option<i64>,
    pub downloads_count: Option<i64>,
    pub remaining_downloads: Option<i64>,
    /// Время сохранения, мс
    pub timestamp: i64,
}

impl UserInfoRecord {
    pub const KEY: &'static str = "userInfo";
}

impl Record for UserInfoRecord {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> &str {
        Self::KEY
    }
}

/// Счетчики квоты скачиваний из последнего ответа провайдера
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub requests: i64,
    pub remaining: i64,
    pub reset_time: String,
    pub reset_time_utc: String,
    /// Время сохранения, мс
    pub timestamp: i64,
}

impl QuotaRecord {
    pub const KEY: &'static str = "quotaInfo";
}

impl Record for QuotaRecord {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> &str {
        Self::KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_filled_with_defaults() {
        let settings: OverlaySettings =
            serde_json::from_str(r##"{"fontSize": 24, "fontColor": "#FFFF00", "syncOffset": -1.5}"##).unwrap();

        assert_eq!(settings.font_size, 24);
        assert_eq!(settings.font_color, "#FFFF00");
        assert_eq!(settings.sync_offset, -1.5);
        assert!(settings.bg_enabled);
        assert_eq!(settings.bg_opacity, 0.5);
        assert_eq!(settings.animation_type, AnimationType::Fade);
        assert_eq!(settings.animation_duration, 0.3);
    }

    #[test]
    fn test_settings_transition() {
        let mut settings = OverlaySettings::default();
        settings.animation_type = AnimationType::SlideDown;

        let transition = settings.transition().unwrap();
        assert_eq!(transition.kind, AnimationType::SlideDown);
        assert!((transition.duration.as_secs_f64() - 0.3).abs() < 1e-6);

        settings.animation_enabled = false;
        assert_eq!(settings.transition(), None);
    }

    #[test]
    fn test_collection_indices() {
        assert!(Collection::Subtitles.has_index("timestamp"));
        assert!(Collection::Subtitles.has_index("language"));
        assert!(Collection::Tokens.has_index("token"));
        assert!(!Collection::Settings.has_index("timestamp"));
    }

    #[test]
    fn test_token_record_field_names() {
        let record = TokenRecord {
            token: "abc".to_string(),
            api_key: "key".to_string(),
            base_url: "api.opensubtitles.com".to_string(),
            timestamp: 1,
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["apiKey"], "key");
        assert_eq!(json["base_url"], "api.opensubtitles.com");
    }
}
