pub mod error;
pub mod logging;
pub mod cue;
pub mod scheduler;
pub mod store;
pub mod cache;
pub mod provider;
pub mod overlay;

pub use error::{Error, Result, ErrorType};
pub use logging::{
    setup_logging, setup_test_logging, log_error, log_warning, log_info, log_debug, log_trace
};
pub use cue::{Cue, CueTrack, CueParser, CueSource, SrtSource, VttSource, SubtitleFormat};
pub use scheduler::{
    AnimationType, CueFrame, CueScheduler, DisplayLoop, RenderTarget, SyncOffset, TimeSource, Transition
};
pub use store::{
    CachedSubtitle, Collection, KeyedStore, OverlaySettings, QuotaRecord, Record, TokenRecord, UserInfoRecord
};
pub use cache::{AccountRecords, ApiEndpoint, SettingsRepository, SubtitleCache, TokenVault, SUBTITLE_CACHE_SIZE};
pub use provider::{
    DownloadLink, DownloadRequest, OpenSubtitlesClient, SearchFilter, SearchPage, SearchParams, SubtitleFetcher,
    SubtitleProvider, SubtitleResult,
};
pub use overlay::{
    ApplyOutcome, Cursor, DragController, DragState, OverlayStyle, Placement, PlayerOverlaySession,
    Point, Rect, SessionState, TextAlign
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Настройки библиотеки
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Путь к файлу локального хранилища
    pub db_path: PathBuf,

    /// Сколько файлов субтитров хранится в кэше
    pub cache_capacity: usize,

    /// Интервал тиков цикла отображения
    pub tick_interval: Duration,

    /// Пауза между остановкой старого цикла и запуском нового
    pub settle_delay: Duration,

    /// Максимальное ожидание при открытии хранилища
    pub open_timeout: Duration,

    /// Срок жизни токена без проверки на сервере, дни
    pub token_expiry_days: i64,

    /// Через сколько часов данные аккаунта запрашиваются заново
    pub user_info_expiry_hours: i64,

    /// Уровень логирования
    pub log_level: log::LevelFilter,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("subtitle-overlay.db"),
            cache_capacity: SUBTITLE_CACHE_SIZE,
            tick_interval: overlay::DEFAULT_TICK_INTERVAL,
            settle_delay: overlay::DEFAULT_SETTLE_DELAY,
            open_timeout: Duration::from_secs(5),
            token_expiry_days: TokenVault::DEFAULT_EXPIRY_DAYS,
            user_info_expiry_hours: AccountRecords::DEFAULT_USER_INFO_EXPIRY_HOURS,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl OverlayOptions {
    pub fn with_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn with_token_expiry_days(mut self, days: i64) -> Self {
        self.token_expiry_days = days;
        self
    }

    pub fn with_user_info_expiry_hours(mut self, hours: i64) -> Self {
        self.user_info_expiry_hours = hours;
        self
    }

    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

/// Компоненты, работающие поверх постоянного хранилища
#[derive(Clone)]
struct Persistence {
    store: KeyedStore,
    cache: SubtitleCache,
    tokens: TokenVault,
    account: AccountRecords,
    settings: SettingsRepository,
}

impl Persistence {
    fn new(store: KeyedStore, options: &OverlayOptions) -> Self {
        Self {
            cache: SubtitleCache::with_capacity(store.clone(), options.cache_capacity),
            tokens: TokenVault::new(store.clone()).with_expiry_days(options.token_expiry_days),
            account: AccountRecords::new(store.clone()).with_user_info_expiry_hours(options.user_info_expiry_hours),
            settings: SettingsRepository::new(store.clone()),
            store,
        }
    }
}

/// Основной интерфейс: хранилище, аккаунт провайдера и сессии наложения
pub struct SubtitleOverlay {
    options: OverlayOptions,
    persistence: Option<Persistence>,
}

impl SubtitleOverlay {
    fn init_logging(level: log::LevelFilter) {
        #[cfg(test)]
        {
            setup_test_logging(level);
        }
        #[cfg(not(test))]
        {
            setup_logging(level);
        }
    }

    /// Открывает локальное хранилище и создает экземпляр
    pub async fn open(options: OverlayOptions) -> Result<Self> {
        Self::init_logging(options.log_level);
        log_info(&format!("Создан новый экземпляр SubtitleOverlay с настройками: {:?}", options));

        let store = KeyedStore::open(&options.db_path, options.open_timeout).await?;
        let collections = store.existing_collections().await?;
        log_debug(&format!("Коллекции хранилища: {}", collections.join(", ")));

        Ok(Self {
            persistence: Some(Persistence::new(store, &options)),
            options,
        })
    }

    /// Экземпляр на хранилище в памяти: кэш и настройки живут до конца процесса
    pub fn in_memory(options: OverlayOptions) -> Result<Self> {
        Self::init_logging(options.log_level);
        let store = KeyedStore::in_memory()?;

        Ok(Self {
            persistence: Some(Persistence::new(store, &options)),
            options,
        })
    }

    /// Экземпляр без хранилища: только разбор и отображение субтитров
    pub fn transient(options: OverlayOptions) -> Self {
        Self::init_logging(options.log_level);
        log_warning("Хранилище не используется, кэш и настройки не сохраняются");

        Self {
            options,
            persistence: None,
        }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn has_storage(&self) -> bool {
        self.persistence.is_some()
    }

    fn persistence(&self) -> Result<&Persistence> {
        self.persistence
            .as_ref()
            .ok_or_else(|| Error::StorageUnavailable("Хранилище не открыто".to_string()))
    }

    pub fn store(&self) -> Result<&KeyedStore> {
        Ok(&self.persistence()?.store)
    }

    pub fn cache(&self) -> Result<&SubtitleCache> {
        Ok(&self.persistence()?.cache)
    }

    pub fn tokens(&self) -> Result<&TokenVault> {
        Ok(&self.persistence()?.tokens)
    }

    pub fn account(&self) -> Result<&AccountRecords> {
        Ok(&self.persistence()?.account)
    }

    /// Загрузчик субтитров через кэш с учетом квоты
    pub fn fetcher(&self) -> Result<SubtitleFetcher> {
        let persistence = self.persistence()?;
        Ok(SubtitleFetcher::new(persistence.cache.clone()).with_account(persistence.account.clone()))
    }

    /// Сохраненные настройки; без хранилища значения по умолчанию
    pub async fn load_settings(&self) -> OverlaySettings {
        match &self.persistence {
            Some(persistence) => persistence.settings.load().await,
            None => OverlaySettings::default(),
        }
    }

    pub async fn save_settings(&self, settings: &OverlaySettings) -> Result<()> {
        self.persistence()?.settings.save(settings).await
    }

    /// Создает сессию наложения с сохраненными настройками
    pub async fn create_session<T, R>(&self, time_source: Arc<T>, target: Arc<R>) -> PlayerOverlaySession<T, R>
    where
        T: TimeSource + ?Sized + 'static,
        R: RenderTarget + ?Sized + 'static,
    {
        let settings = self.load_settings().await;
        PlayerOverlaySession::new(time_source, target)
            .with_tick_interval(self.options.tick_interval)
            .with_settle_delay(self.options.settle_delay)
            .with_settings(settings)
    }

    /// Клиент провайдера по сохраненному токену
    pub async fn provider(&self) -> Result<OpenSubtitlesClient> {
        match self.tokens()?.get_token().await {
            Some(record) => Ok(OpenSubtitlesClient::from_token(&record)),
            None => Err(Error::new(ErrorType::Authentication, "Токен не найден. Войдите снова")),
        }
    }

    /// Поиск субтитров с сохраненным токеном; результаты из кэша отмечены `cached`
    pub async fn search(&self, params: &SearchParams, page: u32) -> Result<SearchPage> {
        let client = self.provider().await?;
        self.fetcher()?.search(&client, params, page).await
    }

    /// Есть ли пригодный токен; устаревший по локальному времени проверяется на сервере
    pub async fn check_token(&self) -> bool {
        match self.provider().await {
            Ok(client) => self.check_token_with(&client).await,
            Err(e) => {
                log_info(&format!("Действующего токена нет: {}", e));
                false
            }
        }
    }

    /// То же, что `check_token`, но с указанным провайдером
    ///
    /// Принятый сервером токен продлевается. Сетевая ошибка не считается
    /// отказом: токен остается действительным.
    pub async fn check_token_with<P: SubtitleProvider>(&self, provider: &P) -> bool {
        let Ok(tokens) = self.tokens() else {
            return false;
        };
        if tokens.get_token().await.is_none() {
            log_info("Токен не найден");
            return false;
        }
        if tokens.is_token_valid().await {
            return true;
        }

        log_info("Токен устарел по локальному времени, проверяем на сервере");
        match provider.fetch_user_info().await {
            Ok(_) => {
                if let Err(e) = tokens.touch_token().await {
                    log_warning(&format!("Не удалось продлить токен: {}", e));
                }
                log_info("Сервер подтвердил токен");
                true
            }
            Err(Error::Authentication(message)) => {
                log_warning(&format!("Сервер отклонил токен: {}", message));
                false
            }
            Err(e) => {
                log_warning(&format!("Не удалось проверить токен, считаем его действительным: {}", e));
                true
            }
        }
    }

    /// Проверяет токен на сервере и сохраняет его вместе с данными аккаунта
    pub async fn login(&self, token: &str, api_key: &str) -> Result<UserInfoRecord> {
        let persistence = self.persistence()?;
        if token.trim().is_empty() {
            return Err(Error::new(ErrorType::Authentication, "Введите токен"));
        }
        let client = OpenSubtitlesClient::new(api_key.to_string())
            .with_token(token.trim().to_string())
            .with_endpoint(ApiEndpoint::Public);

        let info = client.fetch_user_info().await.map_err(|e| {
            log_warning(&format!("Не удалось проверить токен: {}", e));
            e
        })?;

        persistence.tokens.store_token(token, api_key, ApiEndpoint::PUBLIC_HOST).await?;
        persistence.account.store_user_info(info.clone()).await?;
        log_info("Вход выполнен");
        Ok(info)
    }

    /// Удаляет токен и данные аккаунта
    pub async fn logout(&self) -> Result<bool> {
        let persistence = self.persistence()?;
        persistence.store.delete(Collection::Settings, UserInfoRecord::KEY).await?;
        persistence.tokens.clear_token().await
    }

    /// Данные аккаунта; устаревшие запрашиваются у провайдера заново
    pub async fn user_info(&self) -> Result<Option<UserInfoRecord>> {
        let account = self.account()?;
        if !account.user_info_is_stale().await {
            return Ok(account.get_user_info().await);
        }

        log_info("Данные пользователя устарели или отсутствуют, запрашиваем заново");
        let client = self.provider().await?;
        let info = client.fetch_user_info().await?;
        account.store_user_info(info).await?;
        Ok(account.get_user_info().await)
    }
}
