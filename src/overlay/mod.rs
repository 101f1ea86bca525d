//! Наложение субтитров поверх видео: сессия, перетаскивание и стиль

mod drag;
mod session;
mod style;

pub use drag::{Cursor, DragController, DragState, Placement, Point, Rect, TextAlign, EDGE_MAX_WIDTH_RATIO, SNAP_THRESHOLD};
pub use session::{ApplyOutcome, PlayerOverlaySession, SessionState, DEFAULT_SETTLE_DELAY, DEFAULT_TICK_INTERVAL};
pub use style::{hex_to_rgb, OverlayStyle};
