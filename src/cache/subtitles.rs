use crate::error::{Error, Result};
use crate::logging::{log_debug, log_info, log_warning};
use crate::store::{CachedSubtitle, Collection, KeyedStore};
use std::path::{Path, PathBuf};

/// Сколько файлов субтитров хранится локально
pub const SUBTITLE_CACHE_SIZE: usize = 20;

/// Кэш скачанных субтитров с вытеснением самых старых записей
#[derive(Clone)]
pub struct SubtitleCache {
    store: KeyedStore,
    capacity: usize,
}

impl SubtitleCache {
    pub fn new(store: KeyedStore) -> Self {
        Self::with_capacity(store, SUBTITLE_CACHE_SIZE)
    }

    /// Кэш с произвольной емкостью (не меньше одной записи)
    pub fn with_capacity(store: KeyedStore, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Сохраняет файл субтитров, при необходимости вытесняя самые старые
    ///
    /// Подсчет, вытеснение и вставка выполняются в одной транзакции, поэтому
    /// после записи в кэше не больше `capacity` файлов. Перезапись уже
    /// сохраненного идентификатора ничего не вытесняет.
    pub async fn store(&self, record: CachedSubtitle) -> Result<()> {
        let capacity = self.capacity;
        let id = record.id.clone();

        let evicted = self
            .store
            .transaction(move |tx| {
                let mut evicted = Vec::new();
                let exists = tx.get::<CachedSubtitle>(&record.id)?.is_some();
                let count = tx.count(Collection::Subtitles)?;

                if !exists && count >= capacity {
                    let excess = count - (capacity - 1);
                    let oldest: Vec<CachedSubtitle> = tx.scan_ordered("timestamp")?;
                    for old in oldest.into_iter().take(excess) {
                        tx.delete(Collection::Subtitles, &old.id)?;
                        evicted.push(old.id);
                    }
                }

                tx.put(&record)?;
                Ok(evicted)
            })
            .await?;

        if !evicted.is_empty() {
            log_debug(&format!("Вытеснены из кэша: {}", evicted.join(", ")));
        }
        log_info(&format!("Субтитры {} сохранены в кэш", id));
        Ok(())
    }

    /// Проверяет наличие файла в кэше; ошибка хранилища считается промахом
    pub async fn is_cached(&self, id: &str) -> bool {
        self.get_cached(id).await.is_some()
    }

    /// Возвращает файл из кэша; ошибка хранилища считается промахом
    pub async fn get_cached(&self, id: &str) -> Option<CachedSubtitle> {
        match self.store.get::<CachedSubtitle>(id).await {
            Ok(record) => record,
            Err(e) => {
                log_warning(&format!("Не удалось прочитать кэш для {}: {}", id, e));
                None
            }
        }
    }

    /// Количество файлов в кэше
    pub async fn len(&self) -> Result<usize> {
        self.store.count(Collection::Subtitles).await
    }

    /// Все файлы кэша от самого старого к самому новому
    pub async fn entries(&self) -> Result<Vec<CachedSubtitle>> {
        self.store.scan_ordered("timestamp").await
    }

    /// Записывает файл из кэша в каталог `dir` под его исходным именем
    pub async fn export<P: AsRef<Path>>(&self, id: &str, dir: P) -> Result<PathBuf> {
        let record = self
            .get_cached(id)
            .await
            .ok_or_else(|| Error::InvalidParameters(format!("Субтитры {} отсутствуют в кэше", id)))?;

        // Только последний компонент имени, чтобы не выйти за пределы каталога
        let file_name = Path::new(&record.file_name)
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| format!("subtitle_{}.srt", record.id).into());
        let path = dir.as_ref().join(file_name);

        tokio::fs::create_dir_all(dir.as_ref()).await?;
        tokio::fs::write(&path, record.content.as_bytes()).await?;

        log_info(&format!("Субтитры {} записаны в {}", id, path.display()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtitle(id: &str, timestamp: i64) -> CachedSubtitle {
        CachedSubtitle {
            id: id.to_string(),
            content: "1\n00:00:01,000 --> 00:00:02,000\nHi\n".to_string(),
            file_name: format!("{}.srt", id),
            language: "ru".to_string(),
            title: "Film".to_string(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_full() {
        let cache = SubtitleCache::with_capacity(KeyedStore::in_memory().unwrap(), 3);

        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.store(subtitle(id, i as i64)).await.unwrap();
        }

        assert_eq!(cache.len().await.unwrap(), 3);
        assert!(!cache.is_cached("a").await);
        assert!(cache.is_cached("d").await);
    }

    #[tokio::test]
    async fn test_overwrite_when_full_keeps_others() {
        let cache = SubtitleCache::with_capacity(KeyedStore::in_memory().unwrap(), 2);
        cache.store(subtitle("a", 1)).await.unwrap();
        cache.store(subtitle("b", 2)).await.unwrap();

        let mut updated = subtitle("b", 3);
        updated.title = "Updated".to_string();
        cache.store(updated).await.unwrap();

        assert!(cache.is_cached("a").await);
        assert_eq!(cache.get_cached("b").await.unwrap().title, "Updated");
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_export_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SubtitleCache::new(KeyedStore::in_memory().unwrap());
        let mut record = subtitle("x", 1);
        record.file_name = "../../escape.srt".to_string();
        cache.store(record).await.unwrap();

        let path = cache.export("x", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("escape.srt"));
        assert!(std::fs::read_to_string(path).unwrap().contains("Hi"));
    }

    #[tokio::test]
    async fn test_export_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SubtitleCache::new(KeyedStore::in_memory().unwrap());

        assert!(matches!(
            cache.export("none", dir.path()).await,
            Err(Error::InvalidParameters(_))
        ));
    }
}
