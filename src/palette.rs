use crate::models::TaskType;
use std::fmt::Write;

/// Added to every channel to get the pale fill for the unfinished part of a bar.
pub const PALE_SHIFT: i16 = 50;
pub const DEFAULT_CLASS: &str = "type-default";

/// Shifts each RGB channel of `color` by `amount`, clamped to `0..=255`.
/// A leading `#` is kept if present. Unparsable input comes back unchanged.
pub fn lighten(color: &str, amount: i16) -> String {
    let (prefix, hex) = match color.strip_prefix('#') {
        Some(hex) => ("#", hex),
        None => ("", color),
    };
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return color.to_string();
    }
    let Ok(value) = u32::from_str_radix(hex, 16) else {
        return color.to_string();
    };

    let shift = |channel: u32| (channel as i32 + i32::from(amount)).clamp(0, 255) as u32;
    let r = shift((value >> 16) & 0xff);
    let g = shift((value >> 8) & 0xff);
    let b = shift(value & 0xff);
    format!("{prefix}{:06x}", (r << 16) | (g << 8) | b)
}

/// CSS class for a type name: `"type-"` plus the lowercased name with each
/// whitespace run turned into `-`.
pub fn type_class(name: &str) -> String {
    let mut class = String::from("type-");
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                class.push('-');
            }
            in_space = true;
        } else {
            class.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    class
}

pub fn task_class(task_type: &str) -> String {
    if task_type.is_empty() {
        DEFAULT_CLASS.to_string()
    } else {
        type_class(task_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeStyle {
    pub class: String,
    pub bold: String,
    pub pale: String,
}

impl TypeStyle {
    pub fn for_type(task_type: &TaskType) -> Self {
        Self {
            class: type_class(&task_type.name),
            bold: task_type.color.clone(),
            pale: lighten(&task_type.color, PALE_SHIFT),
        }
    }
}

/// CSS rule pairs for every type: pale bar fill with a bold border, and a bold
/// progress fill.
pub fn type_styles(types: &[TaskType]) -> String {
    let mut css = String::new();
    for style in types.iter().map(TypeStyle::for_type) {
        let _ = write!(
            css,
            ".{class} .bar {{ fill: {pale} !important; stroke: {bold} !important; stroke-width: 1px !important; }}\n\
             .{class} .bar-progress {{ fill: {bold} !important; }}\n",
            class = style.class,
            pale = style.pale,
            bold = style.bold,
        );
    }
    css
}
