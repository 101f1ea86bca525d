use crate::cache::ApiEndpoint;
use crate::error::{Error, ErrorType, Result};
use crate::logging::{log_debug, log_info, log_warning};
use crate::provider::search::SearchResponse;
use crate::provider::{DownloadLink, SearchPage, SearchParams};
use crate::store::{TokenRecord, UserInfoRecord};
use serde::{Deserialize, Serialize};

/// Значение заголовка User-Agent для запросов к провайдеру
pub const USER_AGENT: &str = concat!("subtitle-overlay ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct DownloadBody {
    file_id: u64,
}

/// Тело ответа с ошибкой
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    data: Option<UserInfoRecord>,
}

/// Клиент OpenSubtitles REST API
pub struct OpenSubtitlesClient {
    api_key: String,
    token: Option<String>,
    endpoint: ApiEndpoint,
    client: reqwest::Client,
}

impl OpenSubtitlesClient {
    /// Создает клиент без авторизации (публичный эндпоинт)
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            token: None,
            endpoint: ApiEndpoint::Public,
            client: reqwest::Client::new(),
        }
    }

    /// Создает клиент по сохраненному токену; эндпоинт выбирается по `base_url`
    pub fn from_token(record: &TokenRecord) -> Self {
        Self::new(record.api_key.clone())
            .with_token(record.token.clone())
            .with_endpoint(ApiEndpoint::for_base_url(&record.base_url))
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token).filter(|t| !t.is_empty());
        self
    }

    pub fn with_endpoint(mut self, endpoint: ApiEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn endpoint(&self) -> ApiEndpoint {
        self.endpoint
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Content-Type", "application/json")
            .header("Api-Key", &self.api_key)
            .header("User-Agent", USER_AGENT);

        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    fn download_request(&self, file_id: u64) -> reqwest::RequestBuilder {
        self.authorized(self.client.post(format!("{}/download", self.endpoint.url())))
            .json(&DownloadBody { file_id })
    }

    fn search_request(&self, params: &SearchParams, page: u32) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(format!("{}/subtitles", self.endpoint.url())))
            .query(&params.to_query(page))
    }

    fn user_info_request(&self) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(format!("{}/infos/user", self.endpoint.url())))
    }

    /// Поиск субтитров; `page` считается с единицы
    pub async fn search(&self, params: &SearchParams, page: u32) -> Result<SearchPage> {
        log_debug(&format!("Поиск субтитров, страница {}", page));

        let response = self
            .search_request(params, page)
            .send()
            .await
            .map_err(|e| Error::new(ErrorType::Search, &format!("Ошибка при отправке запроса: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| format!("Поиск не удался ({})", status));
            log_warning(&format!("Провайдер отклонил поиск: {}", message));
            return Err(Error::new(ErrorType::Search, &message));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::new(ErrorType::Search, &format!("Некорректный ответ провайдера: {}", e)))?;
        let page = SearchPage::from_response(body, page);
        log_info(&format!(
            "Найдено субтитров: {} (страница {} из {})",
            page.total_count, page.page, page.total_pages
        ));
        Ok(page)
    }

    /// Запрашивает ссылку на скачивание файла
    pub async fn request_download(&self, file_id: u64) -> Result<DownloadLink> {
        log_debug(&format!("Запрос ссылки на скачивание файла {}", file_id));

        let response = self
            .download_request(file_id)
            .send()
            .await
            .map_err(|e| Error::new(ErrorType::DownloadLink, &format!("Ошибка при отправке запроса: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| format!("Не удалось получить ссылку на скачивание ({})", status));
            log_warning(&format!("Провайдер отказал в ссылке на файл {}: {}", file_id, message));
            return Err(Error::new(ErrorType::DownloadLink, &message));
        }

        let mut link: DownloadLink = response
            .json()
            .await
            .map_err(|e| Error::new(ErrorType::DownloadLink, &format!("Некорректный ответ провайдера: {}", e)))?;
        if link.link.is_empty() {
            return Err(Error::new(ErrorType::DownloadLink, "Провайдер не вернул ссылку"));
        }
        link.file_id = file_id;

        if let (Some(remaining), Some(requests)) = (link.remaining, link.requests) {
            log_info(&format!(
                "Квота скачиваний: {}/{} (сброс: {})",
                remaining,
                requests,
                link.reset_time.as_deref().unwrap_or("-")
            ));
        }
        Ok(link)
    }

    /// Скачивает текст файла субтитров по прямой ссылке
    pub async fn fetch_file(&self, link: &str) -> Result<String> {
        log_debug(&format!("Скачивание файла: {}", link));

        let response = self.client.get(link).send().await.map_err(|e| {
            log_warning(&format!("Прямое скачивание не удалось: {}", e));
            manual_download_error(&e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(manual_download_error(&format!("статус {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| manual_download_error(&e.to_string()))
    }

    /// Данные аккаунта; используется для проверки токена при входе
    pub async fn fetch_user_info(&self) -> Result<UserInfoRecord> {
        if self.token.is_none() {
            return Err(Error::new(ErrorType::Authentication, "Токен не задан, войдите снова"));
        }

        let response = self.user_info_request().send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(Error::new(
                ErrorType::Authentication,
                &format!("Ошибка API ({}): {}", status, body.message.unwrap_or_default()),
            ));
        }

        let body: UserInfoResponse = response.json().await?;
        body.data
            .ok_or_else(|| Error::new(ErrorType::Authentication, "Некорректный формат ответа API"))
    }
}

fn manual_download_error(reason: &str) -> Error {
    Error::new(
        ErrorType::FileFetch,
        &format!(
            "Не удалось скачать файл напрямую ({}). Скачайте файл субтитров вручную с OpenSubtitles и загрузите его",
            reason
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenSubtitlesClient {
        OpenSubtitlesClient::from_token(&TokenRecord::new(
            "tok".to_string(),
            "key".to_string(),
            ApiEndpoint::VIP_HOST.to_string(),
        ))
    }

    #[test]
    fn test_download_request_headers() {
        let request = client().download_request(42).build().unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://vip-api.opensubtitles.com/api/v1/download");
        assert_eq!(request.headers()["Api-Key"], "key");
        assert_eq!(request.headers()["Authorization"], "Bearer tok");
        assert_eq!(request.headers()["User-Agent"], USER_AGENT);

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"file_id":42}"#);
    }

    #[test]
    fn test_anonymous_client_has_no_authorization() {
        let request = OpenSubtitlesClient::new("key".to_string())
            .user_info_request()
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "https://api.opensubtitles.com/api/v1/infos/user");
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn test_search_request_query_string() {
        let params = SearchParams::new()
            .with_query("Amélie")
            .with_languages(["fr", "en"])
            .with_filter(crate::provider::SearchFilter::Type, "movie");
        let request = client().search_request(&params, 3).build().unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://vip-api.opensubtitles.com/api/v1/subtitles?query=Am%C3%A9lie&languages=fr%2Cen&type=movie&page=3"
        );
        assert_eq!(request.headers()["Authorization"], "Bearer tok");
    }

    #[tokio::test]
    async fn test_user_info_requires_token() {
        let result = OpenSubtitlesClient::new("key".to_string()).fetch_user_info().await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[test]
    fn test_manual_download_message() {
        let error = manual_download_error("статус 403");
        assert!(matches!(error, Error::FileFetch(_)));
        assert!(error.to_string().contains("вручную"));
    }
}
