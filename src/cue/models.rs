use std::time::Duration;

/// Фрагмент текста, отображаемый в заданном интервале воспроизведения
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// Время начала в секундах
    pub start_time: f64,
    /// Время окончания в секундах
    pub end_time: f64,
    /// Текст реплики
    pub text: String,
}

impl Cue {
    /// Создает новую реплику
    pub fn new(start_time: f64, end_time: f64, text: String) -> Self {
        Self {
            start_time,
            end_time,
            text,
        }
    }

    /// Возвращает длительность реплики в секундах
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Возвращает длительность реплики как Duration
    pub fn duration_as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration().max(0.0))
    }

    /// Проверяет, активна ли реплика в момент `time` (интервал полуоткрытый)
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// Набор реплик в порядке их появления во входном файле
///
/// Порядок не обязан совпадать с хронологическим, реплики могут перекрываться.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueTrack {
    /// Реплики
    pub cues: Vec<Cue>,
}

impl CueTrack {
    /// Создает новый пустой набор
    pub fn new() -> Self {
        Self { cues: Vec::new() }
    }

    /// Добавляет реплику в конец набора
    pub fn add(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Возвращает итератор по репликам
    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    /// Возвращает индекс первой (во входном порядке) реплики, активной в момент `time`
    pub fn active_index(&self, time: f64) -> Option<usize> {
        self.cues.iter().position(|cue| cue.is_active_at(time))
    }

    /// Возвращает первую реплику, активную в момент `time`
    pub fn active_at(&self, time: f64) -> Option<&Cue> {
        self.active_index(time).map(|index| &self.cues[index])
    }

    /// Возвращает интервал от самого раннего начала до самого позднего окончания
    pub fn total_duration(&self) -> f64 {
        if self.cues.is_empty() {
            return 0.0;
        }

        let min_start = self.cues.iter()
            .map(|c| c.start_time)
            .fold(f64::INFINITY, f64::min);

        let max_end = self.cues.iter()
            .map(|c| c.end_time)
            .fold(0.0, f64::max);

        max_end - min_start
    }
}

impl std::ops::Index<usize> for CueTrack {
    type Output = Cue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cues[index]
    }
}

impl From<Vec<Cue>> for CueTrack {
    fn from(cues: Vec<Cue>) -> Self {
        Self { cues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active_at_half_open() {
        let cue = Cue::new(1.0, 2.0, "Hi".to_string());

        assert!(!cue.is_active_at(0.999));
        assert!(cue.is_active_at(1.0));
        assert!(cue.is_active_at(1.5));
        assert!(!cue.is_active_at(2.0));
    }

    #[test]
    fn test_active_index_first_match_wins() {
        let track = CueTrack::from(vec![
            Cue::new(5.0, 8.0, "поздняя".to_string()),
            Cue::new(1.0, 6.0, "длинная".to_string()),
            Cue::new(5.5, 7.0, "перекрытие".to_string()),
        ]);

        assert_eq!(track.active_index(0.5), None);
        assert_eq!(track.active_index(2.0), Some(1));
        // В 5.7 активны все три, выигрывает первая по входному порядку
        assert_eq!(track.active_index(5.7), Some(0));
        assert_eq!(track.active_at(7.5).map(|c| c.text.as_str()), Some("поздняя"));
    }

    #[test]
    fn test_total_duration() {
        let track = CueTrack::from(vec![
            Cue::new(6.0, 10.0, "b".to_string()),
            Cue::new(1.0, 5.0, "a".to_string()),
        ]);

        assert_eq!(track.total_duration(), 9.0);
        assert_eq!(CueTrack::new().total_duration(), 0.0);
    }
}
