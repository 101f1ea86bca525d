use crate::cue::CueTrack;
use crate::logging::{log_debug, log_trace};
use crate::scheduler::{CueFrame, RenderTarget, SyncOffset, TimeSource, Transition};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Планировщик реплик: сопоставляет время воспроизведения с активной репликой
///
/// Новый кадр выдается только при смене активной реплики, поэтому повторные
/// тики внутри одной реплики ничего не перерисовывают.
#[derive(Debug, Clone)]
pub struct CueScheduler {
    track: Arc<CueTrack>,
    offset: SyncOffset,
    transition: Option<Transition>,
    current: Option<usize>,
}

impl CueScheduler {
    /// Создает планировщик для набора реплик
    pub fn new(track: Arc<CueTrack>, offset: SyncOffset) -> Self {
        Self {
            track,
            offset,
            transition: None,
            current: None,
        }
    }

    /// Устанавливает анимацию появления новых реплик
    pub fn with_transition(mut self, transition: Option<Transition>) -> Self {
        self.transition = transition;
        self
    }

    /// Продолжает с уже отображаемой реплики, не перерисовывая её
    pub fn with_current(mut self, current: Option<usize>) -> Self {
        self.current = current.filter(|&index| index < self.track.len());
        self
    }

    /// Индекс реплики, которая сейчас отображается
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn track(&self) -> &Arc<CueTrack> {
        &self.track
    }

    /// Время, по которому ищется реплика: позиция воспроизведения минус смещение
    pub fn effective_time(&self, source_time: f64) -> f64 {
        source_time - self.offset.get()
    }

    /// Выполняет один тик; возвращает кадр, если активная реплика сменилась
    pub fn tick(&mut self, source_time: f64) -> Option<CueFrame> {
        let time = self.effective_time(source_time);
        let active = self.track.active_index(time);

        if active == self.current {
            return None;
        }

        log_trace(&format!("Смена реплики {:?} -> {:?} в {:.3}с", self.current, active, time));
        self.current = active;

        Some(match active {
            Some(index) => CueFrame {
                cue_index: Some(index),
                text: self.track[index].text.clone(),
                transition: self.transition,
            },
            None => CueFrame::blank(),
        })
    }
}

/// Состояние цикла, разделяемое с задачей
#[derive(Debug, Default)]
struct LoopState {
    cancelled: bool,
    current: Option<usize>,
}

/// Отменяемый цикл отображения реплик
///
/// Тикает с фиксированным интервалом (по умолчанию один кадр). После возврата
/// из `cancel` цель отрисовки больше не вызывается.
pub struct DisplayLoop {
    state: Arc<Mutex<LoopState>>,
    handle: JoinHandle<()>,
}

fn lock(state: &Mutex<LoopState>) -> MutexGuard<'_, LoopState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DisplayLoop {
    /// Запускает цикл; должен вызываться внутри рантайма tokio
    pub fn start<T, R>(
        mut scheduler: CueScheduler,
        time_source: Arc<T>,
        target: Arc<R>,
        interval: Duration,
    ) -> Self
    where
        T: TimeSource + ?Sized + 'static,
        R: RenderTarget + ?Sized + 'static,
    {
        let state = Arc::new(Mutex::new(LoopState {
            cancelled: false,
            current: scheduler.current(),
        }));
        let task_state = Arc::clone(&state);

        log_debug(&format!(
            "Запуск цикла отображения: {} реплик, интервал {:?}",
            scheduler.track().len(),
            interval
        ));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let frame = scheduler.tick(time_source.current_time());

                {
                    let mut state = lock(&task_state);
                    if state.cancelled {
                        break;
                    }
                    if let Some(frame) = frame {
                        state.current = frame.cue_index;
                        target.render(&frame);
                    }
                }
            }
        });

        Self { state, handle }
    }

    /// Останавливает цикл и возвращает индекс последней отображенной реплики
    pub fn cancel(&self) -> Option<usize> {
        let current = {
            let mut state = lock(&self.state);
            state.cancelled = true;
            state.current
        };
        self.handle.abort();
        current
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.state).cancelled
    }

    /// Индекс реплики, которая сейчас на экране
    pub fn current(&self) -> Option<usize> {
        lock(&self.state).current
    }
}

impl Drop for DisplayLoop {
    fn drop(&mut self) {
        if !self.is_cancelled() {
            self.cancel();
        }
    }
}
