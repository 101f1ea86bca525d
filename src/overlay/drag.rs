use crate::logging::log_trace;

/// Расстояние до центра, при котором реплика прилипает к центру, px
pub const SNAP_THRESHOLD: f64 = 20.0;

/// Доля ширины видео, до которой сужается текст у левого или правого края
pub const EDGE_MAX_WIDTH_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Прямоугольник в координатах окна
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grabbing,
}

/// Положение блока субтитров относительно видео
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub text_align: TextAlign,
    /// Ограничение ширины текста, px; `None` снимает ограничение
    pub max_width: Option<f64>,
}

/// Начальные координаты перетаскивания
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragAnchor {
    pointer: Point,
    element: Point,
    width: f64,
    height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

/// Перетаскивание блока субтитров в пределах видео
///
/// Контроллер только считает положение. Приостановка и возобновление цикла
/// отображения выполняются сессией по результатам `pointer_down` и `pointer_up`.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    anchor: Option<DragAnchor>,
    placement: Option<Placement>,
    cursor: Cursor,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        if self.anchor.is_some() {
            DragState::Dragging
        } else {
            DragState::Idle
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Последнее вычисленное положение, если блок уже перемещали
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Начинает перетаскивание; возвращает `false`, если оно уже идет
    pub fn pointer_down(&mut self, pointer: Point, element: Rect, surface: Rect) -> bool {
        if self.anchor.is_some() {
            return false;
        }

        self.anchor = Some(DragAnchor {
            pointer,
            element: Point::new(element.left - surface.left, element.top - surface.top),
            width: element.width,
            height: element.height,
        });
        self.cursor = Cursor::Grabbing;
        true
    }

    /// Пересчитывает положение блока; `None` вне перетаскивания
    pub fn pointer_move(&mut self, pointer: Point, surface: Rect) -> Option<Placement> {
        let anchor = self.anchor?;
        let previous = self.placement.unwrap_or_default();

        let mut left = anchor.element.x + (pointer.x - anchor.pointer.x);
        let mut top = anchor.element.y + (pointer.y - anchor.pointer.y);
        let mut text_align = previous.text_align;
        let mut max_width = previous.max_width;

        let centre = surface.width / 2.0 - anchor.width / 2.0;
        let snapped = (left - centre).abs() < SNAP_THRESHOLD;
        if snapped {
            left = centre;
            text_align = TextAlign::Center;
        }

        if left < 0.0 {
            left = 0.0;
            text_align = TextAlign::Left;
            max_width = Some(surface.width * EDGE_MAX_WIDTH_RATIO);
        } else if left + anchor.width > surface.width {
            left = surface.width - anchor.width;
            text_align = TextAlign::Right;
            max_width = Some(surface.width * EDGE_MAX_WIDTH_RATIO);
        } else if !snapped {
            text_align = TextAlign::Center;
            max_width = None;
        }

        if top < 0.0 {
            top = 0.0;
        }
        if top + anchor.height > surface.height {
            top = surface.height - anchor.height;
        }

        let placement = Placement {
            left,
            top,
            text_align,
            max_width,
        };
        log_trace(&format!("Перемещение субтитров: {:.1}, {:.1}", left, top));
        self.placement = Some(placement);
        Some(placement)
    }

    /// Завершает перетаскивание; возвращает `true`, если оно шло
    pub fn pointer_up(&mut self) -> bool {
        if self.anchor.take().is_none() {
            return false;
        }
        self.cursor = Cursor::Default;
        true
    }

    /// Указатель покинул окно: то же, что отпускание
    pub fn pointer_leave(&mut self) -> bool {
        self.pointer_up()
    }
}
