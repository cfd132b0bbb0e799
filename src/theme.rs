use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

/// Colors for the highlighted JSON in the details pane.
#[derive(Clone, Copy)]
pub struct JsonStyle {
    pub key: Color,
    pub string: Color,
    pub number: Color,
    pub boolean: Color,
}

/// Complete theme configuration for ratatui
#[derive(Clone)]
pub struct ThemeConfig {
    pub list_normal: Style,
    pub list_selected: Style,
    pub border: Style,
    pub border_selected: Style,
    pub title: Style,
    pub text: Style,
    /// Secondary text: providers, hints, the loading marker.
    pub muted: Style,
    /// Error banners and the status bar error indicator.
    pub error: Style,
    pub json_style: JsonStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dracula,
    SolarizedDark,
    Gruvbox,
}

impl Theme {
    pub const NAMES: [&'static str; 3] = ["dracula", "solarized", "gruvbox"];

    pub fn config(self) -> ThemeConfig {
        match self {
            Theme::Dracula => dracula_theme(),
            Theme::SolarizedDark => solarized_dark(),
            Theme::Gruvbox => gruvbox_theme(),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dracula" => Ok(Theme::Dracula),
            "solarized" | "solarized-dark" => Ok(Theme::SolarizedDark),
            "gruvbox" => Ok(Theme::Gruvbox),
            other => Err(format!(
                "Unknown theme '{other}' (expected one of: {})",
                Theme::NAMES.join(", ")
            )),
        }
    }
}

/// Returns a ThemeConfig based on the Solarized Dark color palette.
pub fn solarized_dark() -> ThemeConfig {
    let base02 = Color::Rgb(7, 54, 66);
    let base01 = Color::Rgb(88, 110, 117);
    let base0 = Color::Rgb(131, 148, 150);
    let base3 = Color::Rgb(253, 246, 227);
    let red = Color::Rgb(220, 50, 47);
    let magenta = Color::Rgb(211, 54, 130);
    let blue = Color::Rgb(38, 139, 210);
    let cyan = Color::Rgb(42, 161, 152);
    let green = Color::Rgb(133, 153, 0);

    ThemeConfig {
        list_normal: Style::default().fg(base0).bg(base02),
        list_selected: Style::default()
            .fg(base3)
            .bg(blue)
            .add_modifier(Modifier::BOLD),
        border: Style::default().fg(base01),
        border_selected: Style::default().fg(blue),
        title: Style::default().fg(blue).add_modifier(Modifier::BOLD),
        text: Style::default().fg(base0).bg(base02),
        muted: Style::default().fg(base01),
        error: Style::default().fg(red).add_modifier(Modifier::BOLD),
        json_style: JsonStyle {
            key: cyan,
            string: green,
            number: magenta,
            boolean: red,
        },
    }
}

/// Returns a ThemeConfig based on the Dracula color palette.
pub fn dracula_theme() -> ThemeConfig {
    let bg = Color::Rgb(40, 42, 54);
    let selection = Color::Rgb(68, 71, 90);
    let fg = Color::Rgb(248, 248, 242);
    let comment = Color::Rgb(98, 114, 164);
    let purple = Color::Rgb(189, 147, 249);
    let yellow = Color::Rgb(241, 250, 140);
    let orange = Color::Rgb(255, 184, 108);
    let pink = Color::Rgb(255, 121, 198);
    let cyan = Color::Rgb(139, 233, 253);
    let red = Color::Rgb(255, 85, 85);

    ThemeConfig {
        list_normal: Style::default().fg(fg).bg(bg),
        list_selected: Style::default()
            .fg(fg)
            .bg(selection)
            .add_modifier(Modifier::BOLD),
        border: Style::default().fg(comment),
        border_selected: Style::default().fg(purple),
        title: Style::default().fg(purple).add_modifier(Modifier::BOLD),
        text: Style::default().fg(fg).bg(bg),
        muted: Style::default().fg(comment),
        error: Style::default().fg(red).add_modifier(Modifier::BOLD),
        json_style: JsonStyle {
            key: cyan,
            string: yellow,
            number: orange,
            boolean: pink,
        },
    }
}

/// Returns a ThemeConfig based on the Gruvbox Dark color palette.
pub fn gruvbox_theme() -> ThemeConfig {
    let bg0 = Color::Rgb(40, 40, 40);
    let fg1 = Color::Rgb(235, 219, 178);
    let gray = Color::Rgb(146, 131, 116);
    let blue = Color::Rgb(69, 133, 136);
    let green = Color::Rgb(152, 151, 26);
    let orange = Color::Rgb(214, 93, 14);
    let purple = Color::Rgb(177, 98, 134);
    let red = Color::Rgb(204, 36, 29);

    ThemeConfig {
        list_normal: Style::default().fg(fg1).bg(bg0),
        list_selected: Style::default()
            .fg(bg0)
            .bg(fg1)
            .add_modifier(Modifier::BOLD),
        border: Style::default().fg(gray),
        border_selected: Style::default().fg(orange),
        title: Style::default().fg(orange).add_modifier(Modifier::BOLD),
        text: Style::default().fg(fg1).bg(bg0),
        muted: Style::default().fg(gray),
        error: Style::default().fg(red).add_modifier(Modifier::BOLD),
        json_style: JsonStyle {
            key: blue,
            string: green,
            number: purple,
            boolean: orange,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_parse() {
        for name in Theme::NAMES {
            assert!(Theme::from_str(name).is_ok(), "{name}");
        }
        assert_eq!(Theme::from_str(" Dracula "), Ok(Theme::Dracula));
        let err = Theme::from_str("neon").unwrap_err();
        assert!(err.contains("neon"));
    }
}
