//! Utilities and modules related to rendering projected diffs.
//!
//! Renderers implement a single trait, [Renderer], and receive the [DisplayData] for one frame.
//! What they do with it is up to them: the side-by-side renderer draws the two columns to a
//! terminal, the JSON renderer dumps them for other tools to consume.
//!
//! This module also defines utilities that may be useful for `Renderer` implementations.

mod json;
mod side_by_side;

use self::json::Json;
use self::side_by_side::SideBySide;
use crate::project::Columns;
use crate::state::{Frame, Status};
use anyhow::anyhow;
use console::{Color, Term};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::io::Write;
use strum::{self, Display, EnumIter, EnumString};

/// The width of a formatted address in the gutter.
pub const ADDRESS_WIDTH: usize = 8;

/// Format an address the way the gutter displays it: zero-padded, 8 hex digits.
pub fn format_address(address: u64) -> String {
    format!("{:0width$x}", address, width = ADDRESS_WIDTH)
}

/// The parameters a [Renderer] instance receives to render a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayData<'a> {
    /// Where the updates are coming from, for display purposes.
    pub source: &'a str,
    /// The most recent valid diff, if there is one.
    pub columns: Option<&'a Columns>,
    /// The build status to display alongside the diff.
    pub status: Status<'a>,
}

impl<'a> DisplayData<'a> {
    pub fn new(source: &'a str, frame: &Frame<'a>) -> Self {
        DisplayData {
            source,
            columns: frame.columns,
            status: frame.status,
        }
    }
}

#[enum_dispatch]
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Renderers {
    SideBySide,
    Json,
}

impl Default for Renderers {
    fn default() -> Self {
        Renderers::SideBySide(SideBySide::default())
    }
}

/// An interface that renders given diff data.
#[enum_dispatch(Renderers)]
pub trait Renderer {
    /// Render a frame.
    ///
    /// We use anyhow for errors so errors are free form for implementors, as they are not
    /// recoverable.
    ///
    /// `writer` can be any generic writer, it isn't necessarily a terminal. `term_info` is an
    /// optional reference to a term object that can be used to query the terminal's size if the
    /// current process is writing to a TTY.
    fn render(
        &self,
        writer: &mut dyn Write,
        data: &DisplayData,
        term_info: Option<&Term>,
    ) -> anyhow::Result<()>;
}

/// A copy of the [Color](console::Color) enum so we can serialize using serde, and get around the
/// orphan rule.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(remote = "Color", rename_all = "snake_case")]
#[derive(Default)]
enum ColorDef {
    Color256(u8),
    #[default]
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    TrueColor(u8, u8, u8),
}

impl From<ColorDef> for Color {
    fn from(c: ColorDef) -> Self {
        match c {
            ColorDef::Black => Color::Black,
            ColorDef::White => Color::White,
            ColorDef::Red => Color::Red,
            ColorDef::Green => Color::Green,
            ColorDef::Yellow => Color::Yellow,
            ColorDef::Blue => Color::Blue,
            ColorDef::Magenta => Color::Magenta,
            ColorDef::Cyan => Color::Cyan,
            ColorDef::Color256(c) => Color::Color256(c),
            ColorDef::TrueColor(r, g, b) => Color::TrueColor(r, g, b),
        }
    }
}

/// Workaround so we can use the `ColorDef` remote serialization mechanism with optional types
mod opt_color_def {
    use super::{Color, ColorDef};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(value: &Option<Color>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Helper<'a>(#[serde(with = "ColorDef")] &'a Color);

        value.as_ref().map(Helper).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper(#[serde(with = "ColorDef")] Color);

        let helper = Option::deserialize(deserializer)?;
        Ok(helper.map(|Helper(external)| external))
    }
}

/// A helper function for the serde serializer
///
/// Due to the shenanigans we're using to serialize the optional color, we need to supply this
/// method so serde can infer a default value for an option when its key is missing.
fn default_option<T>() -> Option<T> {
    None
}

/// Configurations for the different renderers.
///
/// The user can define settings for each renderer and pick which one is used when none is
/// specified at the command line.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone)]
#[serde(rename_all = "snake_case", default)]
pub struct RenderConfig {
    /// The default renderer to use.
    ///
    /// This is used if no renderer is specified at the command line.
    default: String,

    side_by_side: SideBySide,
    json: Json,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let default_renderer = Renderers::default();
        RenderConfig {
            default: default_renderer.to_string(),
            side_by_side: SideBySide::default(),
            json: Json::default(),
        }
    }
}

impl RenderConfig {
    /// Get the renderer specified by the given tag.
    ///
    /// If the tag is not specified this will fall back to the default renderer.
    pub fn get_renderer(self, tag: Option<String>) -> anyhow::Result<Renderers> {
        let tag = tag.unwrap_or_else(|| self.default.clone());

        match tag.as_str() {
            "side_by_side" => Ok(Renderers::SideBySide(self.side_by_side)),
            "json" => Ok(Renderers::Json(self.json)),
            _ => Err(anyhow!("'{}' is not a valid renderer", &tag)),
        }
    }
}
