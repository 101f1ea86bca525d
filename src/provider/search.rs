use crate::provider::DownloadRequest;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Размер страницы, если провайдер его не прислал
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Дополнительные фильтры поиска `GET /subtitles`
///
/// Порядок вариантов задает порядок параметров в строке запроса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchFilter {
    AiTranslated,
    EpisodeNumber,
    ForeignPartsOnly,
    HearingImpaired,
    Id,
    ImdbId,
    MachineTranslated,
    Moviehash,
    MoviehashMatch,
    OrderBy,
    OrderDirection,
    SeasonNumber,
    TmdbId,
    TrustedSources,
    Type,
    Year,
}

impl SearchFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiTranslated => "ai_translated",
            Self::EpisodeNumber => "episode_number",
            Self::ForeignPartsOnly => "foreign_parts_only",
            Self::HearingImpaired => "hearing_impaired",
            Self::Id => "id",
            Self::ImdbId => "imdb_id",
            Self::MachineTranslated => "machine_translated",
            Self::Moviehash => "moviehash",
            Self::MoviehashMatch => "moviehash_match",
            Self::OrderBy => "order_by",
            Self::OrderDirection => "order_direction",
            Self::SeasonNumber => "season_number",
            Self::TmdbId => "tmdb_id",
            Self::TrustedSources => "trusted_sources",
            Self::Type => "type",
            Self::Year => "year",
        }
    }
}

/// Параметры поиска субтитров
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    pub languages: Vec<String>,
    pub filters: BTreeMap<SearchFilter, String>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Коды языков, например `en` или `ru`
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter, value: impl Into<String>) -> Self {
        self.filters.insert(filter, value.into());
        self
    }

    /// Пары строки запроса для страницы `page`; пустые значения пропускаются
    pub fn to_query(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("query", query.to_string()));
        }

        let languages: Vec<&str> = self
            .languages
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        if !languages.is_empty() {
            pairs.push(("languages", languages.join(",")));
        }

        for (filter, value) in &self.filters {
            let value = value.trim();
            if !value.is_empty() {
                pairs.push((filter.as_str(), value.to_string()));
            }
        }

        pairs.push(("page", page.max(1).to_string()));
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FeatureDetails {
    pub title: Option<String>,
    pub movie_name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SubtitleFile {
    pub file_id: u64,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SubtitleAttributes {
    pub language: Option<String>,
    pub release: Option<String>,
    pub download_count: Option<u64>,
    #[serde(default)]
    pub hearing_impaired: bool,
    #[serde(default)]
    pub ai_translated: bool,
    #[serde(default)]
    pub machine_translated: bool,
    pub feature_details: Option<FeatureDetails>,
    /// Старый формат ответа: идентификатор файла без списка `files`
    pub file_id: Option<u64>,
    #[serde(default)]
    pub files: Vec<SubtitleFile>,
}

/// Одна запись результатов поиска
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubtitleResult {
    pub id: String,
    #[serde(default)]
    pub attributes: SubtitleAttributes,
    /// Файл уже лежит в локальном кэше
    #[serde(skip)]
    pub cached: bool,
}

impl SubtitleResult {
    /// Название фильма или сериала для списка результатов
    pub fn feature_title(&self) -> &str {
        self.attributes
            .feature_details
            .as_ref()
            .and_then(|details| details.title.as_deref().or(details.movie_name.as_deref()))
            .unwrap_or("Unknown title")
    }

    pub fn file_id(&self) -> Option<u64> {
        self.attributes
            .files
            .first()
            .map(|file| file.file_id)
            .or(self.attributes.file_id)
    }

    /// Запрос на скачивание первого файла; `None`, если файла нет
    pub fn download_request(&self) -> Option<DownloadRequest> {
        let file_id = self.file_id()?;
        let request = DownloadRequest::new(
            self.id.clone(),
            file_id,
            self.attributes.language.clone().unwrap_or_default(),
        );

        match self.attributes.feature_details.as_ref().and_then(|d| d.title.clone()) {
            Some(title) => Some(request.with_title(title)),
            None => Some(request),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    data: Vec<SubtitleResult>,
    page: Option<u32>,
    total_pages: Option<u32>,
    total_count: Option<u64>,
    per_page: Option<u32>,
}

/// Страница результатов поиска
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub data: Vec<SubtitleResult>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub per_page: u32,
}

impl SearchPage {
    /// Заполняет отсутствующие в ответе поля значениями по умолчанию
    pub(crate) fn from_response(response: SearchResponse, requested_page: u32) -> Self {
        Self {
            data: response.data,
            page: response.page.filter(|p| *p > 0).unwrap_or(requested_page.max(1)),
            total_pages: response.total_pages.filter(|p| *p > 0).unwrap_or(1),
            total_count: response.total_count.unwrap_or(0),
            per_page: response.per_page.filter(|p| *p > 0).unwrap_or(DEFAULT_PER_PAGE),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_skips_blank_values_and_keeps_order() {
        let params = SearchParams::new()
            .with_query("  The Matrix ")
            .with_languages(["en", " ", "ru"])
            .with_filter(SearchFilter::Year, "1999")
            .with_filter(SearchFilter::HearingImpaired, "exclude")
            .with_filter(SearchFilter::ImdbId, "  ");

        assert_eq!(
            params.to_query(2),
            vec![
                ("query", "The Matrix".to_string()),
                ("languages", "en,ru".to_string()),
                ("hearing_impaired", "exclude".to_string()),
                ("year", "1999".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_params_request_first_page() {
        assert_eq!(SearchParams::new().to_query(0), vec![("page", "1".to_string())]);
    }

    #[test]
    fn test_page_defaults_when_fields_missing() {
        let response: SearchResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        let page = SearchPage::from_response(response, 3);

        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_count, 0);
        assert_eq!(page.per_page, DEFAULT_PER_PAGE);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_result_download_request() {
        let result: SubtitleResult = serde_json::from_str(
            r#"{"id":"9001","type":"subtitle","attributes":{"language":"ru","release":"BluRay",
                "feature_details":{"movie_name":"1999 - The Matrix","year":1999},
                "files":[{"file_id":123,"file_name":"matrix.ru.srt"},{"file_id":124}]}}"#,
        )
        .unwrap();

        assert!(!result.cached);
        assert_eq!(result.feature_title(), "1999 - The Matrix");

        let request = result.download_request().unwrap();
        assert_eq!(request.subtitle_id, "9001");
        assert_eq!(request.file_id, 123);
        assert_eq!(request.language, "ru");
        assert_eq!(request.title, None);
    }

    #[test]
    fn test_result_without_files_falls_back_to_file_id() {
        let result: SubtitleResult =
            serde_json::from_str(r#"{"id":"7","attributes":{"file_id":55}}"#).unwrap();
        assert_eq!(result.file_id(), Some(55));
        assert_eq!(result.feature_title(), "Unknown title");

        let empty: SubtitleResult = serde_json::from_str(r#"{"id":"8"}"#).unwrap();
        assert!(empty.download_request().is_none());
    }
}
