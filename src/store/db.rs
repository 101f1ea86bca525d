use crate::error::{Error, Result};
use crate::logging::{log_debug, log_error, log_info, log_warning};
use crate::store::records::{Collection, IndexValue, Record};
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Схема хранилища; повторное выполнение ничего не пересоздает
const SCHEMA: &str = r#"
    -- Токены авторизации
    CREATE TABLE IF NOT EXISTS tokens (
        id TEXT PRIMARY KEY,
        payload TEXT NOT NULL,
        token TEXT NOT NULL DEFAULT ''
    );

    -- Кэш скачанных субтитров
    CREATE TABLE IF NOT EXISTS subtitles (
        id TEXT PRIMARY KEY,
        payload TEXT NOT NULL,
        timestamp INTEGER NOT NULL DEFAULT 0,
        language TEXT NOT NULL DEFAULT ''
    );

    -- Настройки и метаданные аккаунта
    CREATE TABLE IF NOT EXISTS settings (
        id TEXT PRIMARY KEY,
        payload TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tokens_token ON tokens(token);
    CREATE INDEX IF NOT EXISTS idx_subtitles_timestamp ON subtitles(timestamp);
    CREATE INDEX IF NOT EXISTS idx_subtitles_language ON subtitles(language);
"#;

/// Переводит ошибку SQLite в ошибку библиотеки; занятая база считается заблокированной
fn map_sqlite(e: rusqlite::Error, context: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            Error::StorageBlocked(format!(
                "{}: {}. Закройте другие сессии и повторите попытку",
                context, e
            ))
        }
        _ => Error::Storage(format!("{}: {}", context, e)),
    }
}

/// Операции над коллекциями внутри одной транзакции
pub struct StoreTransaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl StoreTransaction<'_> {
    /// Возвращает запись по ключу
    pub fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let table = R::COLLECTION.table();
        let payload: Option<String> = self
            .tx
            .query_row(
                &format!("SELECT payload FROM {} WHERE id = ?1", table),
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| map_sqlite(e, &format!("Не удалось прочитать запись {} из {}", key, table)))?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Вставляет запись или заменяет существующую с тем же ключом
    pub fn put<R: Record>(&self, record: &R) -> Result<()> {
        let collection = R::COLLECTION;
        let mut columns = vec!["id", "payload"];
        let mut values = vec![
            IndexValue::Text(record.key().to_string()),
            IndexValue::Text(serde_json::to_string(record)?),
        ];

        for (field, value) in record.index_values() {
            if !collection.has_index(field) {
                return Err(Error::InvalidParameters(format!(
                    "Коллекция {} не индексирует поле {}",
                    collection.table(),
                    field
                )));
            }
            columns.push(field);
            values.push(value);
        }

        let placeholders = (1..=values.len()).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            collection.table(),
            columns.join(", "),
            placeholders
        );

        self.tx
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| map_sqlite(e, &format!("Не удалось сохранить запись {}", record.key())))?;
        Ok(())
    }

    /// Удаляет запись; возвращает `true`, если она существовала
    pub fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        let removed = self
            .tx
            .execute(&format!("DELETE FROM {} WHERE id = ?1", collection.table()), [key])
            .map_err(|e| map_sqlite(e, &format!("Не удалось удалить запись {}", key)))?;
        Ok(removed > 0)
    }

    /// Количество записей в коллекции
    pub fn count(&self, collection: Collection) -> Result<usize> {
        let count: i64 = self
            .tx
            .query_row(&format!("SELECT COUNT(*) FROM {}", collection.table()), [], |row| row.get(0))
            .map_err(|e| map_sqlite(e, &format!("Не удалось посчитать записи в {}", collection.table())))?;
        Ok(count.max(0) as usize)
    }

    /// Все записи коллекции по возрастанию вторичного индекса
    pub fn scan_ordered<R: Record>(&self, index: &str) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        if !collection.has_index(index) {
            return Err(Error::InvalidParameters(format!(
                "Коллекция {} не имеет индекса {}",
                collection.table(),
                index
            )));
        }

        let sql = format!("SELECT payload FROM {} ORDER BY {} ASC, rowid ASC", collection.table(), index);
        let mut statement = self
            .tx
            .prepare(&sql)
            .map_err(|e| map_sqlite(e, "Не удалось подготовить запрос"))?;
        let payloads = statement
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
            .map_err(|e| map_sqlite(e, &format!("Не удалось прочитать {}", collection.table())))?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(Error::from))
            .collect()
    }
}

/// Постоянное хранилище с тремя коллекциями поверх SQLite
///
/// Каждая операция выполняется в собственной транзакции в пуле блокирующих
/// задач tokio. Многошаговые изменения выполняются через [`KeyedStore::transaction`].
#[derive(Clone)]
pub struct KeyedStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl KeyedStore {
    /// Открывает (или создает) хранилище по пути
    ///
    /// Если база занята другим процессом дольше `open_timeout`, возвращается
    /// `Error::StorageBlocked`.
    pub async fn open<P: AsRef<Path>>(path: P, open_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log_info(&format!("Открытие хранилища: {}", path.display()));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::StorageUnavailable(format!("Не удалось создать каталог {}: {}", parent.display(), e))
            })?;
        }

        let blocking_path = path.clone();
        let opening = tokio::task::spawn_blocking(move || Self::open_connection(&blocking_path, open_timeout));

        let conn = match tokio::time::timeout(open_timeout, opening).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(Error::Storage(format!("Задача открытия хранилища прервана: {}", e))),
            Err(_) => {
                log_warning(&format!("Открытие хранилища превысило {:?}", open_timeout));
                return Err(Error::StorageBlocked(
                    "Превышено время открытия хранилища. Закройте другие сессии и повторите попытку".to_string(),
                ));
            }
        };

        log_debug(&format!("Хранилище открыто: {}", path.display()));
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Создает хранилище в памяти (для временного использования и тестов)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::StorageUnavailable(format!("Не удалось создать хранилище в памяти: {}", e)))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
        let conn = Connection::open(path)
            .map_err(|e| Error::StorageUnavailable(format!("Не удалось открыть {}: {}", path.display(), e)))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| map_sqlite(e, "Не удалось установить таймаут ожидания"))?;
        Self::init_schema(&conn)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| map_sqlite(e, "Не удалось инициализировать схему"))
    }

    /// Путь к файлу базы, `None` для хранилища в памяти
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Выполняет замыкание в одной транзакции; при ошибке изменения откатываются
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StoreTransaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let tx = conn
                .transaction()
                .map_err(|e| map_sqlite(e, "Не удалось начать транзакцию"))?;
            let scope = StoreTransaction { tx };

            let value = f(&scope)?;
            scope.tx.commit().map_err(|e| map_sqlite(e, "Не удалось зафиксировать транзакцию"))?;
            Ok(value)
        })
        .await
        .or_else(|e| log_error(e, "Задача хранилища прервана"))?
    }

    pub async fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let key = key.to_string();
        self.transaction(move |tx| tx.get::<R>(&key)).await
    }

    pub async fn put<R: Record>(&self, record: R) -> Result<()> {
        self.transaction(move |tx| tx.put(&record)).await
    }

    pub async fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.transaction(move |tx| tx.delete(collection, &key)).await
    }

    pub async fn count(&self, collection: Collection) -> Result<usize> {
        self.transaction(move |tx| tx.count(collection)).await
    }

    /// Все записи коллекции `R` по возрастанию индекса `index`
    pub async fn scan_ordered<R: Record>(&self, index: &str) -> Result<Vec<R>> {
        let index = index.to_string();
        self.transaction(move |tx| tx.scan_ordered::<R>(&index)).await
    }

    /// Имена коллекций, уже существующих в базе
    pub async fn existing_collections(&self) -> Result<Vec<String>> {
        self.transaction(|tx| {
            let mut statement = tx
                .tx
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .map_err(|e| map_sqlite(e, "Не удалось прочитать схему"))?;
            let names = statement
                .query_map([], |row| row.get::<_, String>(0))
                .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
                .map_err(|e| map_sqlite(e, "Не удалось прочитать схему"))?;

            Ok(names
                .into_iter()
                .filter(|name| Collection::ALL.iter().any(|c| c.table() == name))
                .collect())
        })
        .await
    }
}
