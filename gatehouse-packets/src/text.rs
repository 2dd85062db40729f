//! The wire-level JSON text component and the legacy `&`-prefixed format codes.
//!
//! Components follow the Java Edition "JSON text component" shape; fields absent in a component
//! are omitted from its JSON. The legacy codes (`0`-`9`/`a`-`f` for colors, `k`/`l`/`m`/`n`/`o`
//! for styles, `r` to reset) parse into styled child components and serialize back.

use serde::{Deserialize, Serialize};

pub const TEXT_TYPE: &str = "text";
pub const TRANSLATE_TYPE: &str = "translate";
pub const KEYBIND_TYPE: &str = "keybind";
pub const SCORE_TYPE: &str = "score";
pub const SELECTOR_TYPE: &str = "selector";
pub const NBT_TYPE: &str = "nbt";

pub const DEFAULT_FONT: &str = "minecraft:default";
pub const UNIFORM_FONT: &str = "minecraft:uniform";
pub const ALT_FONT: &str = "minecraft:alt";
pub const ILLAGERALT_FONT: &str = "minecraft:illageralt";

pub const OPEN_URL_ACTION: &str = "open_url";
pub const RUN_COMMAND_ACTION: &str = "run_command";
pub const SUGGEST_COMMAND_ACTION: &str = "suggest_command";
pub const CHANGE_PAGE_ACTION: &str = "change_page";
pub const COPY_TO_CLIPBOARD_ACTION: &str = "copy_to_clipboard";

pub const SHOW_TEXT_ACTION: &str = "show_text";
pub const SHOW_ITEM_ACTION: &str = "show_item";
pub const SHOW_ENTITY_ACTION: &str = "show_entity";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickEvent {
    pub action: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverEvent {
    pub action: String,
    pub contents: HoverContents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverContents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextComponent {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "extra", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TextComponent>,
    pub text: String,

    // styling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub underlined: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub obfuscated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insertion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_event: Option<ClickEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_event: Option<HoverEvent>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl TextComponent {
    /// A plain component with no styling.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Parses legacy format codes into a component tree, one child per styled segment.
pub fn parse(text: &str, format_char: char) -> TextComponent {
    let mut root = TextComponent::default();
    let mut current = TextComponent::default();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == format_char && i + 1 < chars.len() && is_format_code(chars[i + 1]) {
            if !current.text.is_empty() {
                root.children.push(std::mem::take(&mut current));
            }
            apply_format_code(chars[i + 1], &mut current);
            i += 1;
        } else {
            current.text.push(chars[i]);
        }
        i += 1;
    }

    root.children.push(current);
    root
}

/// Serializes a component and its direct children back into legacy format codes.
pub fn serialize(component: &TextComponent, format_char: char) -> String {
    let mut result = String::new();
    for part in std::iter::once(component).chain(component.children.iter()) {
        serialize_styles(part, format_char, &mut result);
        result.push_str(&part.text);
    }
    result
}

fn is_format_code(code: char) -> bool {
    code.is_ascii_digit() || ('a'..='f').contains(&code) || ('k'..='o').contains(&code) || code == 'r'
}

fn apply_format_code(code: char, component: &mut TextComponent) {
    if let Some(color) = code_to_color(code) {
        component.color = Some(color.to_owned());
    }
    match code {
        'k' => component.obfuscated = true,
        'l' => component.bold = true,
        'm' => component.strikethrough = true,
        'n' => component.underlined = true,
        'o' => component.italic = true,
        _ => {}
    }
}

fn serialize_styles(component: &TextComponent, format_char: char, out: &mut String) {
    if let Some(code) = component.color.as_deref().and_then(color_to_code) {
        out.push(format_char);
        out.push(code);
    }
    for (enabled, code) in [
        (component.obfuscated, 'k'),
        (component.bold, 'l'),
        (component.strikethrough, 'm'),
        (component.underlined, 'n'),
        (component.italic, 'o'),
    ] {
        if enabled {
            out.push(format_char);
            out.push(code);
        }
    }
}

fn code_to_color(code: char) -> Option<&'static str> {
    Some(match code {
        '0' => "black",
        '1' => "dark_blue",
        '2' => "dark_green",
        '3' => "dark_aqua",
        '4' => "dark_red",
        '5' => "dark_purple",
        '6' => "gold",
        '7' => "gray",
        '8' => "dark_gray",
        '9' => "blue",
        'a' => "green",
        'b' => "aqua",
        'c' => "red",
        'd' => "light_purple",
        'e' => "yellow",
        'f' => "white",
        _ => return None,
    })
}

fn color_to_code(color: &str) -> Option<char> {
    Some(match color {
        "black" => '0',
        "dark_blue" => '1',
        "dark_green" => '2',
        "dark_aqua" => '3',
        "dark_red" => '4',
        "dark_purple" => '5',
        "gold" => '6',
        "gray" => '7',
        "dark_gray" => '8',
        "blue" => '9',
        "green" => 'a',
        "aqua" => 'b',
        "red" => 'c',
        "light_purple" => 'd',
        "yellow" => 'e',
        "white" => 'f',
        _ => return None,
    })
}
