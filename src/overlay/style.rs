use crate::error::{Error, Result};
use crate::logging::log_warning;
use crate::store::OverlaySettings;

/// Стиль отрисовки реплик, вычисленный из пользовательских настроек
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Размер шрифта в пикселях, не меньше 1
    pub font_size: u32,
    pub font_color: String,
    /// CSS-цвет фона `rgba(r, g, b, a)`, `None` если фон выключен
    pub background: Option<String>,
    /// Тень-обводка в четыре стороны, `None` если обводка выключена
    pub text_shadow: Option<String>,
}

impl OverlayStyle {
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        let background = settings.bg_enabled.then(|| {
            let (r, g, b) = hex_to_rgb(&settings.bg_color).unwrap_or_else(|e| {
                log_warning(&format!("Некорректный цвет фона: {}", e));
                (0, 0, 0)
            });
            format!("rgba({}, {}, {}, {})", r, g, b, settings.bg_opacity.clamp(0.0, 1.0))
        });

        let text_shadow = settings.outline_enabled.then(|| {
            let color = &settings.outline_color;
            format!(
                "-1px -1px 0 {c}, 1px -1px 0 {c}, -1px 1px 0 {c}, 1px 1px 0 {c}",
                c = color
            )
        });

        Self {
            font_size: settings.font_size.max(1),
            font_color: settings.font_color.clone(),
            background,
            text_shadow,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_settings(&OverlaySettings::default())
    }
}

/// Разбирает цвет `#RRGGBB` (решетка необязательна)
pub fn hex_to_rgb(hex: &str) -> Result<(u8, u8, u8)> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() < 6 || !digits.is_ascii() {
        return Err(Error::InvalidParameters(format!("Ожидался цвет #RRGGBB: {}", hex)));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| Error::InvalidParameters(format!("Ожидался цвет #RRGGBB: {}", hex)))
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF8000").unwrap(), (255, 128, 0));
        assert_eq!(hex_to_rgb("00ff00").unwrap(), (0, 255, 0));
        assert!(hex_to_rgb("#FFF").is_err());
        assert!(hex_to_rgb("#GG0000").is_err());
    }

    #[test]
    fn test_default_style() {
        let style = OverlayStyle::default();

        assert_eq!(style.font_size, 16);
        assert_eq!(style.background.as_deref(), Some("rgba(0, 0, 0, 0.5)"));
        assert_eq!(style.text_shadow, None);
    }

    #[test]
    fn test_outline_and_disabled_background() {
        let settings = OverlaySettings {
            font_size: 0,
            bg_enabled: false,
            outline_enabled: true,
            outline_color: "#112233".to_string(),
            ..Default::default()
        };
        let style = OverlayStyle::from_settings(&settings);

        assert_eq!(style.font_size, 1);
        assert_eq!(style.background, None);
        let shadow = style.text_shadow.unwrap();
        assert_eq!(shadow.matches("#112233").count(), 4);
        assert!(shadow.starts_with("-1px -1px 0 #112233"));
    }
}
