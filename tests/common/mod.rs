#![allow(dead_code)]

use log::LevelFilter;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use subtitle_overlay::logging::setup_test_logging;
use subtitle_overlay::{
    CueFrame, DownloadLink, Error, ErrorType, RenderTarget, Result, SearchPage, SearchParams, SubtitleProvider,
    SubtitleResult, TimeSource, UserInfoRecord,
};

pub const TWO_CUES_SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHi\n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n";

pub fn init_test_logger() {
    setup_test_logging(LevelFilter::Debug);
}

/// Часы видео, которые тест двигает вручную
#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(seconds: f64) -> Self {
        Self(AtomicU64::new(seconds.to_bits()))
    }

    pub fn set(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

/// Записывает тексты всех отрисованных кадров
#[derive(Default)]
pub struct RecordingTarget(Mutex<Vec<String>>);

impl RecordingTarget {
    pub fn texts(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl RenderTarget for RecordingTarget {
    fn render(&self, frame: &CueFrame) {
        self.0.lock().unwrap().push(frame.text.clone());
    }
}

/// Провайдер, отдающий заранее заданный файл
pub struct MockProvider {
    pub content: String,
    pub link_calls: AtomicUsize,
    pub user_info_calls: AtomicUsize,
    pub fail_link: bool,
    pub fail_fetch: bool,
    /// Сервер отвечает на `/infos/user` отказом авторизации
    pub reject_token: bool,
    /// Сервер недоступен
    pub offline: bool,
    /// Идентификаторы субтитров в результатах поиска
    pub search_ids: Vec<String>,
}

impl MockProvider {
    pub fn serving(content: &str) -> Self {
        Self {
            content: content.to_string(),
            link_calls: AtomicUsize::new(0),
            user_info_calls: AtomicUsize::new(0),
            fail_link: false,
            fail_fetch: false,
            reject_token: false,
            offline: false,
            search_ids: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    pub fn user_info_calls(&self) -> usize {
        self.user_info_calls.load(Ordering::SeqCst)
    }
}

impl SubtitleProvider for MockProvider {
    fn search(&self, _params: &SearchParams, page: u32) -> impl Future<Output = Result<SearchPage>> + Send {
        let data: Vec<SubtitleResult> = self
            .search_ids
            .iter()
            .map(|id| SubtitleResult {
                id: id.clone(),
                attributes: Default::default(),
                cached: false,
            })
            .collect();
        let page = SearchPage {
            total_count: data.len() as u64,
            data,
            page,
            total_pages: 1,
            per_page: 50,
        };
        async move { Ok(page) }
    }

    fn fetch_user_info(&self) -> impl Future<Output = Result<UserInfoRecord>> + Send {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.offline {
            Err(Error::new(ErrorType::Io, "connection refused"))
        } else if self.reject_token {
            Err(Error::new(ErrorType::Authentication, "401 Unauthorized"))
        } else {
            Ok(UserInfoRecord {
                level: Some("Sub leecher".to_string()),
                allowed_downloads: Some(20),
                remaining_downloads: Some(20),
                ..Default::default()
            })
        };
        async move { result }
    }

    fn request_download(&self, file_id: u64) -> impl Future<Output = Result<DownloadLink>> + Send {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_link {
            Err(Error::new(ErrorType::DownloadLink, "Download limit reached"))
        } else {
            Ok(DownloadLink {
                file_id,
                link: format!("https://dl.example/{}", file_id),
                file_name: Some("film.en.srt".to_string()),
                requests: Some(1),
                remaining: Some(19),
                reset_time: Some("23 hours".to_string()),
                reset_time_utc: Some("2026-10-20T00:00:00Z".to_string()),
            })
        };
        async move { result }
    }

    fn fetch_file(&self, _link: &str) -> impl Future<Output = Result<String>> + Send {
        let result = if self.fail_fetch {
            Err(Error::new(ErrorType::FileFetch, "403"))
        } else {
            Ok(self.content.clone())
        };
        async move { result }
    }
}
