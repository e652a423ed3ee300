//! Output items and the surface traits the host UI implements.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::error::{Result, TypistError};

/// A UI object owned by the host (a widget or a bitmap).
///
/// The console never looks inside the payload; it only forwards the
/// handle to the surface. The label is the handle's string form, used when
/// output is redirected to a file.
#[derive(Clone)]
pub struct Opaque {
    label: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a host value under a display label.
    pub fn new(label: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        Self {
            label: label.into(),
            payload: Arc::new(payload),
        }
    }

    /// The label shown where the object cannot be rendered.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the payload as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Whether two handles share the same payload.
    pub fn same_payload(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opaque").field("label", &self.label).finish()
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// One unit of console output. Immutable once enqueued.
#[derive(Debug, Clone)]
pub enum OutputItem {
    Text(String),
    /// A structured UI component.
    Component(Opaque),
    /// A bitmap.
    Image(Opaque),
}

impl OutputItem {
    /// A text item.
    pub fn text(text: impl Into<String>) -> Self {
        OutputItem::Text(text.into())
    }

    /// A single line break.
    pub fn newline() -> Self {
        OutputItem::Text("\n".to_string())
    }

    /// Whether this item is text, newlines included.
    pub fn is_text(&self) -> bool {
        matches!(self, OutputItem::Text(_))
    }
}

impl fmt::Display for OutputItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputItem::Text(text) => f.write_str(text),
            OutputItem::Component(handle) | OutputItem::Image(handle) => handle.fmt(f),
        }
    }
}

impl From<&str> for OutputItem {
    fn from(text: &str) -> Self {
        OutputItem::Text(text.to_string())
    }
}

impl From<String> for OutputItem {
    fn from(text: String) -> Self {
        OutputItem::Text(text)
    }
}

impl From<&String> for OutputItem {
    fn from(text: &String) -> Self {
        OutputItem::Text(text.clone())
    }
}

/// The scrollback the console renders into.
///
/// Every insert must leave the caret at the end of the content before it
/// returns. Implementations are called from the animation worker thread.
pub trait OutputSurface: Send + Sync {
    /// Append text at the end of the content.
    fn insert_text(&self, text: &str) -> Result<()>;

    /// Append a component at the end of the content.
    fn insert_component(&self, component: &Opaque) -> Result<()>;

    /// Append an image at the end of the content.
    fn insert_image(&self, image: &Opaque) -> Result<()>;

    /// The last line of text currently shown.
    fn last_rendered_line(&self) -> String;

    /// Remove the most recently appended element (text run, newline,
    /// component or image). Returns `false` if there was nothing to remove.
    fn remove_last_element(&self) -> Result<bool>;

    /// Whether the surface holds no content.
    fn is_empty(&self) -> bool;
}

/// Plays the short typing sound effect during the typing animation.
pub trait TypingSound: Send + Sync {
    fn play(&self);
}

// ---------------------------------------------------------------------------
// Printed label styling
// ---------------------------------------------------------------------------

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse a `#rrggbb` color string.
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let s = s.strip_prefix('#')?;
    if s.len() != 6 || !s.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

/// Font and color applied to labels printed into the console.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_name: String,
    pub font_size: u16,
    pub foreground: Rgb,
}

impl LabelStyle {
    /// Parse the label colours from `config`.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        let foreground = parse_hex_color(&config.foreground).ok_or_else(|| {
            TypistError::Config(format!("invalid foreground color: {}", config.foreground))
        })?;
        Ok(Self {
            font_name: config.font_name.clone(),
            font_size: config.font_size,
            foreground,
        })
    }
}

/// A label printed into the console that follows the user's font and
/// color preferences.
pub trait StyledLabel: Send + Sync {
    fn apply_style(&self, style: &LabelStyle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_item_display_is_verbatim() {
        assert_eq!(OutputItem::from("done").to_string(), "done");
        assert_eq!(OutputItem::newline().to_string(), "\n");
    }

    #[test]
    fn component_display_uses_label() {
        let item = OutputItem::Component(Opaque::new("[button: ok]", 7_u32));
        assert_eq!(item.to_string(), "[button: ok]");
        assert!(!item.is_text());
    }

    #[test]
    fn opaque_downcast() {
        let handle = Opaque::new("img", vec![1_u8, 2, 3]);
        assert_eq!(handle.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert!(handle.downcast_ref::<String>().is_none());
        let copy = handle.clone();
        assert!(copy.same_payload(&handle));
        assert!(!Opaque::new("img", vec![1_u8]).same_payload(&handle));
    }

    #[test]
    fn parse_hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn label_style_from_config() {
        let config = ConsoleConfig {
            foreground: "#102030".into(),
            ..ConsoleConfig::default()
        };
        let style = LabelStyle::from_config(&config).unwrap();
        assert_eq!(style.foreground, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(style.font_size, 30);

        let bad = ConsoleConfig {
            foreground: "red".into(),
            ..ConsoleConfig::default()
        };
        assert!(LabelStyle::from_config(&bad).is_err());
    }
}
