use super::{DisplayData, format_address};
use crate::classify::Category;
use crate::compose::{Segment, compose};
use crate::diff::LineKind;
use crate::project::ColumnLine;
use crate::render::Renderer;
use crate::state::Status;
use console::Term;
use logging_timer::time;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A renderer that outputs json data about the diff.
///
/// This can be useful if you want to use `jq` or do some programatic analysis on the results.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Json {
    /// Whether to pretty print the output JSON.
    pub pretty_print: bool,
}

/// The serialized form of a frame.
#[derive(Debug, Serialize)]
struct JsonFrame<'a> {
    source: &'a str,
    status: Status<'a>,
    rows: Vec<JsonRow<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    left: JsonLine<'a>,
    right: JsonLine<'a>,
}

/// One side of a row. Every field but the category is null for a blank placeholder so that
/// consumers always see the same keys.
#[derive(Debug, Serialize)]
struct JsonLine<'a> {
    category: Category,
    address: Option<String>,
    size: Option<u64>,
    kind: Option<LineKind>,
    label: Option<&'a str>,
    segments: Vec<Segment<'a>>,
}

impl<'a> From<&'a ColumnLine> for JsonLine<'a> {
    fn from(entry: &'a ColumnLine) -> Self {
        match entry {
            ColumnLine::Blank => JsonLine {
                category: Category::Blank,
                address: None,
                size: None,
                kind: None,
                label: None,
                segments: Vec::new(),
            },
            ColumnLine::Line(line) => {
                let runs = line
                    .changes
                    .as_ref()
                    .map(|changes| changes.text_runs.as_slice())
                    .unwrap_or_default();
                JsonLine {
                    category: line.category,
                    address: Some(format_address(line.address)),
                    size: Some(line.size),
                    kind: Some(line.kind),
                    label: line.label.as_deref(),
                    segments: compose(&line.text, runs),
                }
            }
        }
    }
}

impl<'a> JsonFrame<'a> {
    fn new(data: &DisplayData<'a>) -> Self {
        let rows = data
            .columns
            .map(|columns| {
                columns
                    .rows()
                    .map(|(left, right)| JsonRow {
                        left: left.into(),
                        right: right.into(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        JsonFrame {
            source: data.source,
            status: data.status,
            rows,
        }
    }
}

impl Renderer for Json {
    fn render(
        &self,
        writer: &mut dyn Write,
        data: &DisplayData,
        _term_info: Option<&Term>,
    ) -> anyhow::Result<()> {
        let json_str = self.generate_json_str(data)?;
        writeln!(writer, "{}", &json_str)?;
        Ok(())
    }
}

impl Json {
    /// Create a JSON string from the display data.
    ///
    /// This method handles display options that are set in the config.
    #[time("trace")]
    fn generate_json_str(&self, data: &DisplayData) -> Result<String, serde_json::Error> {
        let frame = JsonFrame::new(data);
        if self.pretty_print {
            return serde_json::to_string_pretty(&frame);
        }
        serde_json::to_string(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Changes, DiffOperation, Opcode, SubOpcode, TextRun};
    use crate::project::project;
    use crate::test_utils::StringWriter;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn render(renderer: &Json, data: &DisplayData) -> String {
        let mut writer = StringWriter::new();
        renderer.render(&mut writer, data, None).unwrap();
        writer.consume()
    }

    #[test]
    fn test_pretty_print() {
        let ops = [
            DiffOperation::new(Opcode::Equal, LineKind::Code, 0x100, 2, "nop").with_label("start"),
            DiffOperation::new(Opcode::Delete, LineKind::Code, 0x102, 2, "bx lr"),
        ];
        let columns = project(&ops).unwrap();
        let data = DisplayData {
            source: "stdin",
            columns: Some(&columns),
            status: Status::Matched,
        };
        let output = render(&Json { pretty_print: true }, &data);
        assert_snapshot!(output.trim_end(), @r#"
        {
          "source": "stdin",
          "status": {
            "state": "matched"
          },
          "rows": [
            {
              "left": {
                "category": "plain",
                "address": "00000100",
                "size": 2,
                "kind": "code",
                "label": "start",
                "segments": [
                  {
                    "category": "unchanged",
                    "text": "nop"
                  }
                ]
              },
              "right": {
                "category": "plain",
                "address": "00000100",
                "size": 2,
                "kind": "code",
                "label": "start",
                "segments": [
                  {
                    "category": "unchanged",
                    "text": "nop"
                  }
                ]
              }
            },
            {
              "left": {
                "category": "deleted",
                "address": "00000102",
                "size": 2,
                "kind": "code",
                "label": null,
                "segments": [
                  {
                    "category": "unchanged",
                    "text": "bx lr"
                  }
                ]
              },
              "right": {
                "category": "blank",
                "address": null,
                "size": null,
                "kind": null,
                "label": null,
                "segments": []
              }
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_segments_follow_side() {
        let ops = [DiffOperation::new(Opcode::Equal, LineKind::Code, 0, 2, "movs r0, #1")
            .with_changes(Changes {
                address_changed: false,
                text_runs: vec![
                    TextRun::new(SubOpcode::Delete, 0, 4),
                    TextRun::new(SubOpcode::Insert, 9, 11),
                ],
            })];
        let columns = project(&ops).unwrap();
        let data = DisplayData {
            source: "stdin",
            columns: Some(&columns),
            status: Status::Idle,
        };
        let output = render(&Json::default(), &data);
        assert!(output.ends_with('\n'));
        assert!(!output.trim_end().contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value["rows"][0]["left"]["segments"],
            serde_json::json!([
                {"category": "deleted", "text": "movs"},
                {"category": "unchanged", "text": " r0, #1"},
            ])
        );
        assert_eq!(
            value["rows"][0]["right"]["segments"],
            serde_json::json!([
                {"category": "unchanged", "text": "movs r0, "},
                {"category": "inserted", "text": "#1"},
            ])
        );
    }

    #[test]
    fn test_no_columns() {
        let data = DisplayData {
            source: "updates.jsonl",
            columns: None,
            status: Status::BuildError("undefined reference to `main'"),
        };
        let value: serde_json::Value =
            serde_json::from_str(&render(&Json::default(), &data)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "source": "updates.jsonl",
                "status": {"state": "build_error", "message": "undefined reference to `main'"},
                "rows": [],
            })
        );
    }
}
