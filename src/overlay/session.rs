use crate::cue::{CueParser, CueTrack};
use crate::error::{Error, Result};
use crate::logging::{log_debug, log_info, log_warning};
use crate::overlay::drag::{Cursor, DragController, Placement, Point, Rect};
use crate::overlay::style::OverlayStyle;
use crate::provider::{DownloadRequest, SubtitleFetcher, SubtitleProvider};
use crate::scheduler::{CueFrame, CueScheduler, DisplayLoop, RenderTarget, SyncOffset, TimeSource};
use crate::store::OverlaySettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Интервал тиков по умолчанию: один кадр при 60 Гц
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Пауза между остановкой старого цикла и запуском нового
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Жизненный цикл сессии
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Набор реплик не загружен
    Created,
    /// Набор реплик загружен
    Active,
    /// Сессия закрыта, дальнейшие вызовы отклоняются
    Disposed,
}

/// Результат применения субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Запущен цикл отображения
    Applied { cue_count: usize },
    /// В файле не нашлось ни одной реплики, наложение снято
    NoCues,
    /// Другое применение еще не завершено, запрос отброшен
    Busy,
}

/// Флаг «применение в процессе», снимается при выходе из любой ветки
struct ApplyGuard<'a>(&'a AtomicBool);

impl<'a> ApplyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct SessionInner {
    state: SessionState,
    track: Option<Arc<CueTrack>>,
    display: Option<DisplayLoop>,
    /// Реплика, показанная в момент приостановки цикла
    suspended_at: Option<usize>,
    drag: DragController,
    settings: OverlaySettings,
}

/// Наложение субтитров на один видео элемент
///
/// Владеет набором реплик, циклом отображения и состоянием перетаскивания.
/// В каждый момент работает не больше одного цикла.
pub struct PlayerOverlaySession<T: TimeSource + ?Sized, R: RenderTarget + ?Sized> {
    time_source: Arc<T>,
    target: Arc<R>,
    offset: SyncOffset,
    applying: AtomicBool,
    inner: Mutex<SessionInner>,
    tick_interval: Duration,
    settle_delay: Duration,
}

impl<T, R> PlayerOverlaySession<T, R>
where
    T: TimeSource + ?Sized + 'static,
    R: RenderTarget + ?Sized + 'static,
{
    pub fn new(time_source: Arc<T>, target: Arc<R>) -> Self {
        Self {
            time_source,
            target,
            offset: SyncOffset::default(),
            applying: AtomicBool::new(false),
            inner: Mutex::new(SessionInner {
                state: SessionState::Created,
                track: None,
                display: None,
                suspended_at: None,
                drag: DragController::new(),
                settings: OverlaySettings::default(),
            }),
            tick_interval: DEFAULT_TICK_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_settings(self, settings: OverlaySettings) -> Self {
        self.offset.set(settings.sync_offset);
        self.lock().settings = settings;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Идет ли сейчас применение субтитров
    pub fn is_applying(&self) -> bool {
        self.applying.load(Ordering::Acquire)
    }

    /// Количество реплик в текущем наборе
    pub fn cue_count(&self) -> usize {
        self.lock().track.as_ref().map_or(0, |track| track.len())
    }

    /// Индекс реплики на экране
    pub fn current_cue(&self) -> Option<usize> {
        let inner = self.lock();
        match &inner.display {
            Some(display) => display.current(),
            None => inner.suspended_at,
        }
    }

    /// Работает ли цикл отображения
    pub fn is_displaying(&self) -> bool {
        self.lock().display.as_ref().is_some_and(|d| !d.is_cancelled())
    }

    pub fn settings(&self) -> OverlaySettings {
        self.lock().settings.clone()
    }

    pub fn style(&self) -> OverlayStyle {
        OverlayStyle::from_settings(&self.lock().settings)
    }

    pub fn sync_offset(&self) -> f64 {
        self.offset.get()
    }

    /// Меняет смещение; действует со следующего тика без перезапуска
    pub fn set_sync_offset(&self, seconds: f64) {
        self.offset.set(seconds);
        self.lock().settings.sync_offset = seconds;
        log_debug(&format!("Смещение синхронизации: {:.2}с", seconds));
    }

    /// Применяет новые настройки и возвращает стиль для отрисовки
    ///
    /// Если цикл работает, он перезапускается с той же реплики, чтобы новые
    /// реплики появлялись с новой анимацией.
    pub fn update_settings(&self, settings: OverlaySettings) -> OverlayStyle {
        self.offset.set(settings.sync_offset);
        let style = OverlayStyle::from_settings(&settings);

        let mut inner = self.lock();
        inner.settings = settings;
        if let Some(display) = inner.display.take() {
            let current = display.cancel();
            self.start_display(&mut inner, current);
        }
        style
    }

    /// Разбирает текст субтитров и запускает отображение
    ///
    /// Пока идет другое применение, запрос отбрасывается с `ApplyOutcome::Busy`.
    pub async fn apply_subtitle(&self, content: &str) -> Result<ApplyOutcome> {
        self.ensure_open()?;
        let Some(_guard) = ApplyGuard::acquire(&self.applying) else {
            log_info("Применение субтитров уже идет, запрос пропущен");
            return Ok(ApplyOutcome::Busy);
        };

        self.clear_display();
        tokio::time::sleep(self.settle_delay).await;
        self.install(content)
    }

    /// Берет субтитры из кэша или скачивает их и применяет
    pub async fn apply_from_provider<P>(
        &self,
        fetcher: &SubtitleFetcher,
        provider: &P,
        request: &DownloadRequest,
    ) -> Result<ApplyOutcome>
    where
        P: SubtitleProvider,
    {
        self.ensure_open()?;
        let Some(_guard) = ApplyGuard::acquire(&self.applying) else {
            log_info("Применение субтитров уже идет, скачивание пропущено");
            return Ok(ApplyOutcome::Busy);
        };

        self.clear_display();
        tokio::time::sleep(self.settle_delay).await;

        let record = fetcher.fetch(provider, request).await?;
        self.install(&record.content)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state() == SessionState::Disposed {
            return Err(Error::InvalidParameters("Сессия наложения закрыта".to_string()));
        }
        Ok(())
    }

    /// Снимает предыдущее наложение: останавливает цикл, сбрасывает реплики
    /// и очищает экран, если на нем была реплика
    ///
    /// Во время перетаскивания цикла нет, но приостановленная реплика
    /// остается на экране, поэтому она тоже считается показанной.
    fn clear_display(&self) {
        let mut inner = self.lock();
        let running = inner.display.take().and_then(|display| display.cancel());
        let suspended = inner.suspended_at.take();
        if running.is_some() || suspended.is_some() {
            self.target.render(&CueFrame::blank());
        }

        inner.track = None;
        if inner.state == SessionState::Active {
            inner.state = SessionState::Created;
        }
    }

    fn install(&self, content: &str) -> Result<ApplyOutcome> {
        let track = CueParser::parse(content);

        let mut inner = self.lock();
        if inner.state == SessionState::Disposed {
            return Err(Error::InvalidParameters("Сессия закрыта во время применения".to_string()));
        }

        if track.is_empty() {
            log_warning("В субтитрах не найдено ни одной реплики");
            inner.track = None;
            return Ok(ApplyOutcome::NoCues);
        }

        let cue_count = track.len();
        inner.track = Some(Arc::new(track));
        inner.state = SessionState::Active;
        // Во время перетаскивания цикл запустится после отпускания
        if !inner.drag.is_dragging() {
            self.start_display(&mut inner, None);
        }

        log_info(&format!("Субтитры применены: {} реплик", cue_count));
        Ok(ApplyOutcome::Applied { cue_count })
    }

    fn start_display(&self, inner: &mut SessionInner, current: Option<usize>) {
        let Some(track) = inner.track.clone() else {
            return;
        };

        let scheduler = CueScheduler::new(track, self.offset.clone())
            .with_transition(inner.settings.transition())
            .with_current(current);
        inner.display = Some(DisplayLoop::start(
            scheduler,
            Arc::clone(&self.time_source),
            Arc::clone(&self.target),
            self.tick_interval,
        ));
    }

    /// Начало перетаскивания: цикл приостанавливается, реплика остается на экране
    pub fn pointer_down(&self, pointer: Point, element: Rect, surface: Rect) -> bool {
        let mut inner = self.lock();
        if inner.state == SessionState::Disposed || !inner.drag.pointer_down(pointer, element, surface) {
            return false;
        }

        if let Some(display) = inner.display.take() {
            inner.suspended_at = display.cancel();
        }
        true
    }

    pub fn pointer_move(&self, pointer: Point, surface: Rect) -> Option<Placement> {
        self.lock().drag.pointer_move(pointer, surface)
    }

    /// Конец перетаскивания: цикл продолжается с последней показанной реплики
    pub fn pointer_up(&self) -> bool {
        self.finish_drag(false)
    }

    pub fn pointer_leave(&self) -> bool {
        self.finish_drag(true)
    }

    fn finish_drag(&self, left_window: bool) -> bool {
        let mut inner = self.lock();
        let finished = if left_window {
            inner.drag.pointer_leave()
        } else {
            inner.drag.pointer_up()
        };
        if !finished {
            return false;
        }

        if inner.state == SessionState::Active && inner.display.is_none() {
            let resume_from = inner.suspended_at.take();
            self.start_display(&mut inner, resume_from);
        }
        true
    }

    pub fn cursor(&self) -> Cursor {
        self.lock().drag.cursor()
    }

    pub fn placement(&self) -> Option<Placement> {
        self.lock().drag.placement()
    }

    /// Закрывает сессию и останавливает цикл; повторный вызов ничего не делает
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Disposed {
            return;
        }

        if let Some(display) = inner.display.take() {
            display.cancel();
        }
        inner.state = SessionState::Disposed;
        inner.track = None;
        inner.suspended_at = None;
        inner.drag.pointer_up();
        log_debug("Сессия наложения закрыта");
    }
}
