use crate::error::Result;
use crate::store::{QuotaRecord, UserInfoRecord};
use serde::Deserialize;
use std::future::Future;

mod fetcher;
mod opensubtitles;
mod search;

pub use fetcher::{DownloadRequest, SubtitleFetcher};
pub use opensubtitles::{OpenSubtitlesClient, USER_AGENT};
pub use search::{
    FeatureDetails, SearchFilter, SearchPage, SearchParams, SubtitleAttributes, SubtitleFile, SubtitleResult,
    DEFAULT_PER_PAGE,
};

/// Ответ провайдера на запрос ссылки для скачивания
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DownloadLink {
    /// Идентификатор файла у провайдера; в ответе отсутствует и заполняется клиентом
    #[serde(default)]
    pub file_id: u64,
    pub link: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub requests: Option<i64>,
    #[serde(default)]
    pub remaining: Option<i64>,
    #[serde(default)]
    pub reset_time: Option<String>,
    #[serde(default)]
    pub reset_time_utc: Option<String>,
}

impl DownloadLink {
    /// Счетчики квоты, если провайдер их прислал
    pub fn quota(&self) -> Option<QuotaRecord> {
        match (self.requests, self.remaining, &self.reset_time_utc) {
            (Some(requests), Some(remaining), Some(reset_time_utc)) if !reset_time_utc.is_empty() => {
                Some(QuotaRecord {
                    requests,
                    remaining,
                    reset_time: self.reset_time.clone().unwrap_or_default(),
                    reset_time_utc: reset_time_utc.clone(),
                    timestamp: 0,
                })
            }
            _ => None,
        }
    }
}

/// Интерфейс провайдера субтитров
pub trait SubtitleProvider: Send + Sync {
    /// Ищет субтитры и возвращает страницу `page` результатов
    fn search(&self, params: &SearchParams, page: u32) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Запрашивает ссылку на скачивание файла
    fn request_download(&self, file_id: u64) -> impl Future<Output = Result<DownloadLink>> + Send;

    /// Скачивает текст файла по ссылке
    fn fetch_file(&self, link: &str) -> impl Future<Output = Result<String>> + Send;

    /// Данные аккаунта; отказ сервера возвращается как `Error::Authentication`
    fn fetch_user_info(&self) -> impl Future<Output = Result<UserInfoRecord>> + Send;
}

impl SubtitleProvider for OpenSubtitlesClient {
    fn search(&self, params: &SearchParams, page: u32) -> impl Future<Output = Result<SearchPage>> + Send {
        self.search(params, page)
    }

    fn request_download(&self, file_id: u64) -> impl Future<Output = Result<DownloadLink>> + Send {
        self.request_download(file_id)
    }

    fn fetch_file(&self, link: &str) -> impl Future<Output = Result<String>> + Send {
        self.fetch_file(link)
    }

    fn fetch_user_info(&self) -> impl Future<Output = Result<UserInfoRecord>> + Send {
        self.fetch_user_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_link_from_response() {
        let link: DownloadLink = serde_json::from_str(
            r#"{"link":"https://dl.example/x.srt","file_name":"x.srt","requests":3,"remaining":17,
                "message":"ok","reset_time":"22 hours","reset_time_utc":"2026-10-20T00:00:00.000Z"}"#,
        )
        .unwrap();

        assert_eq!(link.file_name.as_deref(), Some("x.srt"));
        let quota = link.quota().unwrap();
        assert_eq!(quota.requests, 3);
        assert_eq!(quota.remaining, 17);
        assert_eq!(quota.reset_time, "22 hours");
    }

    #[test]
    fn test_quota_requires_all_counters() {
        let link = DownloadLink {
            link: "https://dl.example/x.srt".to_string(),
            requests: Some(1),
            remaining: Some(19),
            ..Default::default()
        };
        assert!(link.quota().is_none());
    }
}
