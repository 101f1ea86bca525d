use crate::error::{Error, Result};
use crate::logging::{log_debug, log_info, log_warning};
use crate::store::{now_millis, Collection, KeyedStore, QuotaRecord, TokenRecord, UserInfoRecord};
use chrono::Duration;

/// Эндпоинт API провайдера, выбранный по сохраненному `base_url`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEndpoint {
    Vip,
    Public,
}

impl ApiEndpoint {
    pub const VIP_HOST: &'static str = "vip-api.opensubtitles.com";
    pub const PUBLIC_HOST: &'static str = "api.opensubtitles.com";

    /// VIP только при точном совпадении хоста, иначе публичный
    pub fn for_base_url(base_url: &str) -> Self {
        if base_url == Self::VIP_HOST {
            Self::Vip
        } else {
            Self::Public
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Self::Vip => "https://vip-api.opensubtitles.com/api/v1",
            Self::Public => "https://api.opensubtitles.com/api/v1",
        }
    }
}

/// Хранилище токена авторизации
#[derive(Clone)]
pub struct TokenVault {
    store: KeyedStore,
    expiry: Duration,
}

impl TokenVault {
    pub const DEFAULT_EXPIRY_DAYS: i64 = 30;

    pub fn new(store: KeyedStore) -> Self {
        Self {
            store,
            expiry: Duration::days(Self::DEFAULT_EXPIRY_DAYS),
        }
    }

    pub fn with_expiry_days(mut self, days: i64) -> Self {
        self.expiry = Duration::days(days);
        self
    }

    /// Сохраняет токен, заменяя предыдущий
    pub async fn store_token(&self, token: &str, api_key: &str, base_url: &str) -> Result<TokenRecord> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Authentication("Пустой токен".to_string()));
        }

        let record = TokenRecord::new(token.to_string(), api_key.to_string(), base_url.to_string());
        self.store.put(record.clone()).await?;
        log_info(&format!("Токен сохранен для {}", base_url));
        Ok(record)
    }

    /// Текущий токен; ошибка хранилища считается отсутствием токена
    pub async fn get_token(&self) -> Option<TokenRecord> {
        match self.store.get::<TokenRecord>(TokenRecord::KEY).await {
            Ok(record) => record.filter(|r| !r.token.is_empty()),
            Err(e) => {
                log_warning(&format!("Не удалось прочитать токен: {}", e));
                None
            }
        }
    }

    /// Токен есть и сохранен не раньше срока истечения
    pub async fn is_token_valid(&self) -> bool {
        match self.get_token().await {
            Some(record) => now_millis() - record.timestamp < self.expiry.num_milliseconds(),
            None => false,
        }
    }

    /// Продлевает срок жизни токена после успешной проверки на сервере
    pub async fn touch_token(&self) -> Result<bool> {
        let Some(mut record) = self.get_token().await else {
            return Ok(false);
        };
        record.timestamp = now_millis();
        self.store.put(record).await?;
        log_debug("Метка времени токена обновлена");
        Ok(true)
    }

    /// Удаляет токен (выход из аккаунта)
    pub async fn clear_token(&self) -> Result<bool> {
        let removed = self.store.delete(Collection::Tokens, TokenRecord::KEY).await?;
        if removed {
            log_info("Токен удален");
        }
        Ok(removed)
    }

    /// Эндпоинт, соответствующий сохраненному токену
    pub async fn endpoint(&self) -> ApiEndpoint {
        self.get_token()
            .await
            .map(|record| ApiEndpoint::for_base_url(&record.base_url))
            .unwrap_or(ApiEndpoint::Public)
    }
}

/// Сведения об аккаунте и квоте скачиваний
#[derive(Clone)]
pub struct AccountRecords {
    store: KeyedStore,
    user_info_expiry: Duration,
}

impl AccountRecords {
    pub const DEFAULT_USER_INFO_EXPIRY_HOURS: i64 = 1;

    pub fn new(store: KeyedStore) -> Self {
        Self {
            store,
            user_info_expiry: Duration::hours(Self::DEFAULT_USER_INFO_EXPIRY_HOURS),
        }
    }

    pub fn with_user_info_expiry_hours(mut self, hours: i64) -> Self {
        self.user_info_expiry = Duration::hours(hours);
        self
    }

    pub async fn store_user_info(&self, mut info: UserInfoRecord) -> Result<()> {
        info.timestamp = now_millis();
        self.store.put(info).await
    }

    pub async fn get_user_info(&self) -> Option<UserInfoRecord> {
        self.store
            .get::<UserInfoRecord>(UserInfoRecord::KEY)
            .await
            .unwrap_or_else(|e| {
                log_warning(&format!("Не удалось прочитать данные пользователя: {}", e));
                None
            })
    }

    /// Данные пользователя отсутствуют или устарели и их нужно запросить заново
    pub async fn user_info_is_stale(&self) -> bool {
        match self.get_user_info().await {
            Some(info) => now_millis() - info.timestamp >= self.user_info_expiry.num_milliseconds(),
            None => true,
        }
    }

    pub async fn store_quota(&self, mut quota: QuotaRecord) -> Result<()> {
        quota.timestamp = now_millis();
        log_debug(&format!(
            "Квота скачиваний: {}/{} (сброс: {})",
            quota.remaining, quota.requests, quota.reset_time
        ));
        self.store.put(quota).await
    }

    pub async fn get_quota(&self) -> Option<QuotaRecord> {
        self.store
            .get::<QuotaRecord>(QuotaRecord::KEY)
            .await
            .unwrap_or_else(|e| {
                log_warning(&format!("Не удалось прочитать квоту: {}", e));
                None
            })
    }
}
