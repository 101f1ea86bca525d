use crate::cue::models::{Cue, CueTrack};
use crate::error::{Error, Result};
use crate::logging::{log_debug, log_info, log_warning};
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use std::path::Path;

/// Маркер, с которого начинается файл WebVTT
const WEBVTT_MARKER: &str = "WEBVTT";

static SRT_TIMESTAMP: OnceCell<Regex> = OnceCell::new();
static VTT_TIMESTAMP: OnceCell<Regex> = OnceCell::new();

/// Компилирует выражение один раз на процесс
fn compiled(cell: &'static OnceCell<Regex>, pattern: &str) -> Result<Regex> {
    cell.get_or_try_init(|| Regex::new(pattern))
        .cloned()
        .map_err(|e| Error::Parsing(format!("Failed to compile regex: {}", e)))
}

/// Формат файла субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// SubRip (`HH:MM:SS,mmm`)
    Srt,
    /// WebVTT (`HH:MM:SS.mmm`)
    WebVtt,
}

impl SubtitleFormat {
    /// Определяет формат по содержимому: всё, что не начинается с `WEBVTT`, считается SRT
    pub fn detect(content: &str) -> Self {
        let content = content.trim_start_matches('\u{FEFF}').trim_start();
        if content.starts_with(WEBVTT_MARKER) {
            Self::WebVtt
        } else {
            Self::Srt
        }
    }

    /// Возвращает расширение файла для формата
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::WebVtt => "vtt",
        }
    }
}

/// Источник реплик: превращает текст субтитров в набор реплик
pub trait CueSource {
    /// Формат, который понимает источник
    fn format(&self) -> SubtitleFormat;

    /// Извлекает реплики из текста
    fn extract(&self, content: &str) -> Result<CueTrack>;
}

/// Грамматика блоков с временными метками, общая для SRT и WebVTT
struct BlockGrammar {
    timestamp: Regex,
    /// Может ли текст реплики содержать пустые строки
    text_spans_blank_lines: bool,
    /// Считать ли любую непустую строку идентификатором (WebVTT) или только число (SRT)
    any_identifier: bool,
}

impl BlockGrammar {
    fn is_identifier(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.contains("-->") {
            return false;
        }
        self.any_identifier || line.chars().all(|c| c.is_ascii_digit())
    }

    fn is_timestamp(&self, line: &str) -> bool {
        self.timestamp.is_match(line.trim())
    }

    /// Если с `index` начинается блок, возвращает индекс строки с временными метками
    fn block_start(&self, lines: &[&str], index: usize) -> Option<usize> {
        let line = lines.get(index)?;
        if self.is_timestamp(line) {
            return Some(index);
        }
        if self.is_identifier(line) && lines.get(index + 1).map_or(false, |next| self.is_timestamp(next)) {
            return Some(index + 1);
        }
        None
    }

    /// Возвращает индекс строки, на которой заканчивается текст блока (не включительно)
    fn text_end(&self, lines: &[&str], from: usize) -> usize {
        let mut index = from;
        while index < lines.len() {
            if !lines[index].trim().is_empty() {
                index += 1;
                continue;
            }
            if !self.text_spans_blank_lines {
                return index;
            }

            let mut next = index;
            while next < lines.len() && lines[next].trim().is_empty() {
                next += 1;
            }
            // Пустая строка и следующий номер блока завершают текст, даже если блок битый
            if next >= lines.len() || self.is_identifier(lines[next]) || self.block_start(lines, next).is_some() {
                return index;
            }
            index = next;
        }
        index
    }

    /// Разбирает блоки и собирает реплики; `decode` превращает захваты в (начало, конец)
    fn scan<F>(&self, content: &str, skip_header: bool, decode: F) -> CueTrack
    where
        F: Fn(&Captures) -> Result<(f64, f64)>,
    {
        let normalized = content.trim_start_matches('\u{FEFF}').replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = normalized.lines().collect();
        let mut track = CueTrack::new();

        let mut index = 0;
        if skip_header {
            while index < lines.len() && !lines[index].trim().is_empty() {
                index += 1;
            }
        }

        while index < lines.len() {
            let Some(timestamp_index) = self.block_start(&lines, index) else {
                index += 1;
                continue;
            };

            let text_start = timestamp_index + 1;
            let text_end = self.text_end(&lines, text_start);
            index = text_end.max(text_start);

            let times = self
                .timestamp
                .captures(lines[timestamp_index].trim())
                .ok_or_else(|| Error::Parsing(format!("Строка без временных меток: {}", lines[timestamp_index])))
                .and_then(|captures| decode(&captures));

            let (start_time, end_time) = match times {
                Ok(times) => times,
                Err(e) => {
                    log_debug(&format!("Пропущен блок с некорректными метками: {}", e));
                    continue;
                }
            };

            if start_time >= end_time {
                log_debug(&format!(
                    "Пропущена реплика с пустым интервалом: {:.3} --> {:.3}",
                    start_time, end_time
                ));
                continue;
            }

            let text = lines[text_start..text_end.max(text_start)].join("\n").trim().to_string();
            if text.is_empty() {
                continue;
            }

            track.add(Cue::new(start_time, end_time, text));
        }

        track
    }
}

/// Переводит поля временной метки в секунды
fn parse_timestamp(hours: Option<&str>, minutes: &str, seconds: &str, milliseconds: &str) -> Result<f64> {
    let hours: u32 = match hours {
        Some(hours) => hours.parse()
            .map_err(|_| Error::Parsing(format!("Invalid hours: {}", hours)))?,
        None => 0,
    };

    let minutes: u32 = minutes.parse()
        .map_err(|_| Error::Parsing(format!("Invalid minutes: {}", minutes)))?;

    let seconds: u32 = seconds.parse()
        .map_err(|_| Error::Parsing(format!("Invalid seconds: {}", seconds)))?;

    let milliseconds: u32 = milliseconds.parse()
        .map_err(|_| Error::Parsing(format!("Invalid milliseconds: {}", milliseconds)))?;

    let total_seconds = (hours as f64) * 3600.0 +
                        (minutes as f64) * 60.0 +
                        (seconds as f64) +
                        (milliseconds as f64) / 1000.0;

    Ok(total_seconds)
}

/// Источник реплик для SubRip
pub struct SrtSource {
    grammar: BlockGrammar,
}

impl SrtSource {
    pub fn new() -> Result<Self> {
        let timestamp = compiled(
            &SRT_TIMESTAMP,
            r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})",
        )?;

        Ok(Self {
            grammar: BlockGrammar {
                timestamp,
                text_spans_blank_lines: true,
                any_identifier: false,
            },
        })
    }
}

impl CueSource for SrtSource {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
    }

    fn extract(&self, content: &str) -> Result<CueTrack> {
        Ok(self.grammar.scan(content, false, |c| {
            let start = parse_timestamp(Some(&c[1]), &c[2], &c[3], &c[4])?;
            let end = parse_timestamp(Some(&c[5]), &c[6], &c[7], &c[8])?;
            Ok((start, end))
        }))
    }
}

/// Источник реплик для WebVTT
///
/// Поддерживает только блоки реплик: `NOTE`, `STYLE` и `REGION` пропускаются,
/// настройки после временных меток игнорируются.
pub struct VttSource {
    grammar: BlockGrammar,
}

impl VttSource {
    pub fn new() -> Result<Self> {
        let timestamp = compiled(
            &VTT_TIMESTAMP,
            r"^(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})\s+-->\s+(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})",
        )?;

        Ok(Self {
            grammar: BlockGrammar {
                timestamp,
                text_spans_blank_lines: false,
                any_identifier: true,
            },
        })
    }
}

impl CueSource for VttSource {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::WebVtt
    }

    fn extract(&self, content: &str) -> Result<CueTrack> {
        if SubtitleFormat::detect(content) != SubtitleFormat::WebVtt {
            return Err(Error::Parsing("Invalid WebVTT file: missing WEBVTT header".to_string()));
        }

        Ok(self.grammar.scan(content.trim_start(), true, |c| {
            let start = parse_timestamp(c.get(1).map(|m| m.as_str()), &c[2], &c[3], &c[4])?;
            let end = parse_timestamp(c.get(5).map(|m| m.as_str()), &c[6], &c[7], &c[8])?;
            Ok((start, end))
        }))
    }
}

/// Парсер субтитров
pub struct CueParser;

impl CueParser {
    /// Возвращает источник реплик для формата
    pub fn source_for(format: SubtitleFormat) -> Result<Box<dyn CueSource>> {
        Ok(match format {
            SubtitleFormat::Srt => Box::new(SrtSource::new()?),
            SubtitleFormat::WebVtt => Box::new(VttSource::new()?),
        })
    }

    /// Разбирает текст субтитров, определяя формат автоматически
    pub fn try_parse(content: &str) -> Result<CueTrack> {
        let format = SubtitleFormat::detect(content);
        let source = Self::source_for(format)?;
        let track = source.extract(content)?;

        log_info(&format!(
            "Разобрано {} реплик ({:?}), общая длительность {:.1}с",
            track.len(),
            format,
            track.total_duration()
        ));

        Ok(track)
    }

    /// Разбирает текст субтитров; при любой ошибке возвращает пустой набор
    pub fn parse(content: &str) -> CueTrack {
        match Self::try_parse(content) {
            Ok(track) => track,
            Err(e) => {
                log_warning(&format!("Не удалось разобрать субтитры: {}", e));
                CueTrack::new()
            }
        }
    }

    /// Читает файл субтитров и разбирает его
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<CueTrack> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(Self::parse(&content))
    }
}
