use crate::cache::{AccountRecords, SubtitleCache};
use crate::error::{Error, ErrorType, Result};
use crate::logging::{log_info, log_warning};
use crate::provider::{SearchPage, SearchParams, SubtitleProvider};
use crate::store::CachedSubtitle;

/// Что скачать: идентификатор субтитров и файла у провайдера
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub subtitle_id: String,
    pub file_id: u64,
    pub language: String,
    pub title: Option<String>,
}

impl DownloadRequest {
    pub fn new(subtitle_id: impl Into<String>, file_id: u64, language: impl Into<String>) -> Self {
        Self {
            subtitle_id: subtitle_id.into(),
            file_id,
            language: language.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Получает субтитры из кэша, а при промахе скачивает и кэширует их
#[derive(Clone)]
pub struct SubtitleFetcher {
    cache: SubtitleCache,
    account: Option<AccountRecords>,
}

impl SubtitleFetcher {
    pub fn new(cache: SubtitleCache) -> Self {
        Self { cache, account: None }
    }

    /// Сохранять квоту скачиваний из ответов провайдера
    pub fn with_account(mut self, account: AccountRecords) -> Self {
        self.account = Some(account);
        self
    }

    /// Ищет субтитры и отмечает результаты, которые уже есть в кэше
    pub async fn search<P>(&self, provider: &P, params: &SearchParams, page: u32) -> Result<SearchPage>
    where
        P: SubtitleProvider,
    {
        let mut page = provider.search(params, page).await?;
        for result in &mut page.data {
            result.cached = self.cache.is_cached(&result.id).await;
        }
        Ok(page)
    }

    pub async fn fetch<P>(&self, provider: &P, request: &DownloadRequest) -> Result<CachedSubtitle>
    where
        P: SubtitleProvider,
    {
        if let Some(cached) = self.cache.get_cached(&request.subtitle_id).await {
            log_info(&format!("Субтитры {} взяты из кэша", request.subtitle_id));
            return Ok(cached);
        }

        let link = provider.request_download(request.file_id).await?;

        if let (Some(account), Some(quota)) = (&self.account, link.quota()) {
            if let Err(e) = account.store_quota(quota).await {
                log_warning(&format!("Не удалось сохранить квоту: {}", e));
            }
        }

        let content = provider.fetch_file(&link.link).await.map_err(|e| match e {
            Error::FileFetch(_) => e,
            other => Error::new(
                ErrorType::FileFetch,
                &format!("{}. Скачайте файл субтитров вручную и загрузите его", other),
            ),
        })?;

        let record = CachedSubtitle::new(
            request.subtitle_id.clone(),
            content,
            link.file_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("subtitle_{}.srt", request.subtitle_id)),
            request.language.clone(),
            request.title.clone().unwrap_or_else(|| "Unknown".to_string()),
        );

        // Файл уже скачан, поэтому ошибка кэша не отменяет результат
        if let Err(e) = self.cache.store(record.clone()).await {
            log_warning(&format!("Не удалось закэшировать субтитры {}: {}", record.id, e));
        }

        Ok(record)
    }
}
