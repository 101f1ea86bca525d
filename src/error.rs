use thiserror::Error;

/// Типы ошибок, которые могут возникнуть при работе с субтитрами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Ошибка ввода/вывода
    Io,
    /// Ошибка парсинга субтитров
    Parsing,
    /// Постоянное хранилище недоступно
    StorageUnavailable,
    /// Хранилище заблокировано другим процессом
    StorageBlocked,
    /// Ошибка операции с хранилищем
    Storage,
    /// Не удалось получить ссылку на скачивание
    DownloadLink,
    /// Не удалось скачать файл субтитров
    FileFetch,
    /// Провайдер отклонил поисковый запрос
    Search,
    /// Ошибка авторизации
    Authentication,
    /// Неверные параметры
    InvalidParameters,
}

/// Ошибки библиотеки
#[derive(Debug, Error)]
pub enum Error {
    #[error("Ошибка ввода/вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка парсинга субтитров: {0}")]
    Parsing(String),

    #[error("Хранилище недоступно: {0}")]
    StorageUnavailable(String),

    #[error("Хранилище заблокировано: {0}")]
    StorageBlocked(String),

    #[error("Ошибка хранилища: {0}")]
    Storage(String),

    #[error("Ошибка сериализации JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Не удалось получить ссылку на скачивание: {0}")]
    DownloadLink(String),

    #[error("Не удалось скачать файл субтитров: {0}")]
    FileFetch(String),

    #[error("Ошибка поиска субтитров: {0}")]
    Search(String),

    #[error("Ошибка авторизации: {0}")]
    Authentication(String),

    #[error("Ошибка HTTP запроса: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Неверные параметры: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    LoggedError(String),
}

impl Error {
    /// Создает новую ошибку указанного типа с сообщением
    pub fn new(error_type: ErrorType, message: &str) -> Self {
        match error_type {
            ErrorType::Io => Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message)),
            ErrorType::Parsing => Self::Parsing(message.to_string()),
            ErrorType::StorageUnavailable => Self::StorageUnavailable(message.to_string()),
            ErrorType::StorageBlocked => Self::StorageBlocked(message.to_string()),
            ErrorType::Storage => Self::Storage(message.to_string()),
            ErrorType::DownloadLink => Self::DownloadLink(message.to_string()),
            ErrorType::FileFetch => Self::FileFetch(message.to_string()),
            ErrorType::Search => Self::Search(message.to_string()),
            ErrorType::Authentication => Self::Authentication(message.to_string()),
            ErrorType::InvalidParameters => Self::InvalidParameters(message.to_string()),
        }
    }

    /// Проверяет, относится ли ошибка к хранилищу
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::StorageBlocked(_) | Self::Storage(_)
        )
    }
}

/// Результат с обработкой ошибок
pub type Result<T> = std::result::Result<T, Error>;
