use iced::{Color, Theme};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    pub fn theme(self) -> Theme {
        match self {
            ThemeMode::Dark => Theme::TokyoNight,
            ThemeMode::Light => Theme::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeMode::Dark => Palette {
                text: rgb(0xc0, 0xca, 0xf5),
                muted: rgb(0x73, 0x7a, 0xa2),
                surface: rgb(0x1f, 0x23, 0x35),
                sidebar: rgb(0x16, 0x16, 0x1e),
                border: rgb(0x2f, 0x33, 0x4d),
                accent: rgb(0x7a, 0xa2, 0xf7),
                user_bubble: rgb(0x3d, 0x59, 0xa1),
                user_text: rgb(0xff, 0xff, 0xff),
                code_bg: rgb(0x24, 0x28, 0x3b),
                info_bg: Color::from_rgba8(0x1e, 0x3a, 0x8a, 0.3),
                info_border: rgb(0x3b, 0x82, 0xf6),
                warning_bg: Color::from_rgba8(0x78, 0x35, 0x0f, 0.3),
                warning_border: rgb(0xf5, 0x9e, 0x0b),
            },
            ThemeMode::Light => Palette {
                text: rgb(0x11, 0x18, 0x27),
                muted: rgb(0x6b, 0x72, 0x80),
                surface: rgb(0xff, 0xff, 0xff),
                sidebar: rgb(0xf4, 0xf4, 0xf5),
                border: rgb(0xe4, 0xe4, 0xe7),
                accent: rgb(0x25, 0x63, 0xeb),
                user_bubble: rgb(0x18, 0x18, 0x1b),
                user_text: rgb(0xfa, 0xfa, 0xfa),
                code_bg: rgb(0xf1, 0xf5, 0xf9),
                info_bg: rgb(0xef, 0xf6, 0xff),
                info_border: rgb(0x3b, 0x82, 0xf6),
                warning_bg: rgb(0xff, 0xfb, 0xeb),
                warning_border: rgb(0xf5, 0x9e, 0x0b),
            },
        }
    }
}

/// Colours the views draw with. Derived from [`ThemeMode`] once per frame and
/// handed down the view tree.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub surface: Color,
    pub sidebar: Color,
    pub border: Color,
    pub accent: Color,
    pub user_bubble: Color,
    pub user_text: Color,
    pub code_bg: Color,
    pub info_bg: Color,
    pub info_border: Color,
    pub warning_bg: Color,
    pub warning_border: Color,
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color {
        r: r as f32 / 255.0,
        g: g as f32 / 255.0,
        b: b as f32 / 255.0,
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_between_modes() {
        assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.toggled().toggled(), ThemeMode::Light);
    }
}
