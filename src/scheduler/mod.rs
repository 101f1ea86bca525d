use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod display;

pub use display::{CueScheduler, DisplayLoop};

/// Источник текущего времени воспроизведения (видео элемент хоста)
///
/// Время только читается, плеер никогда не перематывается.
pub trait TimeSource: Send + Sync {
    /// Текущая позиция воспроизведения в секундах
    fn current_time(&self) -> f64;
}

/// Цель отрисовки текущей реплики
pub trait RenderTarget: Send + Sync {
    /// Отображает кадр; вызывается только при смене активной реплики
    fn render(&self, frame: &CueFrame);
}

/// Вид анимации появления реплики
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationType {
    #[default]
    #[serde(rename = "fade")]
    Fade,
    #[serde(rename = "slideUp")]
    SlideUp,
    #[serde(rename = "slideDown")]
    SlideDown,
    #[serde(rename = "zoom")]
    Zoom,
}

impl AnimationType {
    /// Возвращает строковое представление анимации
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::SlideUp => "slideUp",
            Self::SlideDown => "slideDown",
            Self::Zoom => "zoom",
        }
    }
}

/// Анимация, сопровождающая появление новой реплики
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub kind: AnimationType,
    pub duration: Duration,
}

/// Кадр отрисовки: что показать после смены активной реплики
#[derive(Debug, Clone, PartialEq)]
pub struct CueFrame {
    /// Индекс активной реплики во входном наборе, `None` если экран пуст
    pub cue_index: Option<usize>,
    /// Текст для отображения (пустая строка, если реплики нет)
    pub text: String,
    /// Анимация появления, только для непустых реплик
    pub transition: Option<Transition>,
}

impl CueFrame {
    /// Пустой кадр
    pub fn blank() -> Self {
        Self {
            cue_index: None,
            text: String::new(),
            transition: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cue_index.is_none()
    }
}

/// Смещение синхронизации в секундах, общее для сессии и цикла отображения
///
/// Изменение применяется на следующем тике без перезапуска цикла.
#[derive(Debug, Clone, Default)]
pub struct SyncOffset(Arc<AtomicU64>);

impl SyncOffset {
    pub fn new(seconds: f64) -> Self {
        Self(Arc::new(AtomicU64::new(seconds.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::Release);
    }
}
