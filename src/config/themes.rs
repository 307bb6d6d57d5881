use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;
use crate::model::Category;

/// Colors the UI draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub highlight: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub danger: Color,
    pub work: Color,
    pub personal: Color,
    pub ideas: Color,
}

impl Palette {
    pub fn category(&self, category: Category) -> Color {
        match category {
            Category::Work => self.work,
            Category::Personal => self.personal,
            Category::Ideas => self.ideas,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn palette(&self, theme: &ThemeName) -> Palette {
        self.palettes
            .get(theme)
            .or_else(|| self.palettes.get(&ThemeName::Dark))
            .copied()
            .unwrap_or(DARK)
    }
}

const DARK: Palette = Palette {
    accent: Color::Cyan,
    highlight: Color::Yellow,
    muted: Color::Gray,
    selection_bg: Color::Blue,
    selection_fg: Color::Black,
    danger: Color::Red,
    work: Color::LightBlue,
    personal: Color::LightGreen,
    ideas: Color::LightMagenta,
};

const LIGHT: Palette = Palette {
    accent: Color::Blue,
    highlight: Color::Magenta,
    muted: Color::DarkGray,
    selection_bg: Color::LightBlue,
    selection_fg: Color::Black,
    danger: Color::Red,
    work: Color::Blue,
    personal: Color::Green,
    ideas: Color::Magenta,
};

const HIGH_CONTRAST: Palette = Palette {
    accent: Color::White,
    highlight: Color::Yellow,
    muted: Color::White,
    selection_bg: Color::White,
    selection_fg: Color::Black,
    danger: Color::LightRed,
    work: Color::LightCyan,
    personal: Color::LightGreen,
    ideas: Color::LightYellow,
};

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (ThemeName::Light, LIGHT),
            (ThemeName::HighContrast, HIGH_CONTRAST),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}
