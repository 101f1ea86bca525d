use crate::error::Result;
use crate::logging::{log_debug, log_warning};
use crate::store::{Collection, KeyedStore, OverlaySettings};

/// Загрузка и сохранение пользовательских настроек отображения
#[derive(Clone)]
pub struct SettingsRepository {
    store: KeyedStore,
}

impl SettingsRepository {
    pub fn new(store: KeyedStore) -> Self {
        Self { store }
    }

    /// Сохраненные настройки или значения по умолчанию, если их нет или они не читаются
    pub async fn load(&self) -> OverlaySettings {
        match self.store.get::<OverlaySettings>(OverlaySettings::KEY).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                log_debug("Настройки не найдены, используются значения по умолчанию");
                OverlaySettings::default()
            }
            Err(e) => {
                log_warning(&format!("Не удалось загрузить настройки: {}", e));
                OverlaySettings::default()
            }
        }
    }

    pub async fn save(&self, settings: &OverlaySettings) -> Result<()> {
        self.store.put(settings.clone()).await?;
        log_debug("Настройки сохранены");
        Ok(())
    }

    /// Удаляет сохраненные настройки, возвращая значения по умолчанию
    pub async fn reset(&self) -> Result<OverlaySettings> {
        self.store.delete(Collection::Settings, OverlaySettings::KEY).await?;
        Ok(OverlaySettings::default())
    }
}
