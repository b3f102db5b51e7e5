// Composition of the graph and bar chart panels into a single SVG figure.

use regex::Regex;
use std::fmt::Write as _;

use crate::error::{Panel, SyncError};
use crate::surface::Size;

pub const EXPORT_FILE_NAME: &str = "gene-cluster-enrichment.svg";

const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    pub const fn new(min_x: f32, min_y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let values: Vec<f32> = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            &[min_x, min_y, width, height] => Some(Self::new(min_x, min_y, width, height)),
            _ => None,
        }
    }
}

/// One independently rendered vector panel.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPanel {
    pub view_box: ViewBox,
    /// Fixed `width`/`height` of the root element, if any.
    pub pixel_size: Option<Size>,
    /// Markup inside the root element.
    pub body: String,
}

fn root_attributes(svg: &str) -> Result<(Vec<(String, String)>, usize), SyncError> {
    let root = Regex::new(r"<svg\b([^>]*)>").map_err(|e| SyncError::MalformedSvg(e.to_string()))?;
    let attribute = Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*"([^"]*)""#)
        .map_err(|e| SyncError::MalformedSvg(e.to_string()))?;

    let captures = root
        .captures(svg)
        .ok_or_else(|| SyncError::MalformedSvg(String::from("no <svg> root element")))?;
    let (Some(whole), Some(attrs)) = (captures.get(0), captures.get(1)) else {
        return Err(SyncError::MalformedSvg(String::from("no <svg> root element")));
    };
    let attributes = attribute
        .captures_iter(attrs.as_str())
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();
    Ok((attributes, whole.end()))
}

fn pixel_length(text: &str) -> Option<f32> {
    text.trim().trim_end_matches("px").parse().ok()
}

impl VectorPanel {
    pub fn new(view_box: ViewBox, body: impl Into<String>) -> Self {
        Self {
            view_box,
            pixel_size: None,
            body: body.into(),
        }
    }

    /// Read a standalone SVG document. A root without `viewBox` falls
    /// back to its pixel size.
    pub fn parse(svg: &str) -> Result<Self, SyncError> {
        let (attributes, body_start) = root_attributes(svg)?;
        let lookup = |name: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        let pixel_size = match (
            lookup("width").and_then(pixel_length),
            lookup("height").and_then(pixel_length),
        ) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            _ => None,
        };
        let view_box = match lookup("viewBox") {
            Some(text) => ViewBox::parse(text)
                .ok_or_else(|| SyncError::MalformedSvg(format!("bad viewBox {text:?}")))?,
            None => {
                let size = pixel_size.ok_or_else(|| {
                    SyncError::MalformedSvg(String::from("root has neither viewBox nor size"))
                })?;
                ViewBox::new(0.0, 0.0, size.width, size.height)
            }
        };

        let body_end = svg
            .rfind("</svg>")
            .filter(|end| *end >= body_start)
            .ok_or_else(|| SyncError::MalformedSvg(String::from("unterminated <svg> root")))?;

        Ok(Self {
            view_box,
            pixel_size,
            body: svg[body_start..body_end].trim().to_string(),
        })
    }

    /// Drop the fixed pixel size so the panel scales with its viewBox.
    pub fn normalize(mut self) -> Self {
        self.pixel_size = None;
        self
    }

    /// Whether there is anything to place in a figure.
    pub fn is_renderable(&self) -> bool {
        self.view_box.width > 0.0 && self.view_box.height > 0.0 && !self.body.trim().is_empty()
    }

    pub fn to_svg(&self) -> String {
        let vb = self.view_box;
        let size = match self.pixel_size {
            Some(size) => format!(r#" width="{}" height="{}""#, size.width, size.height),
            None => String::new(),
        };
        format!(
            r#"<svg xmlns="{SVG_NS}" viewBox="{} {} {} {}"{size}>{}</svg>"#,
            vb.min_x, vb.min_y, vb.width, vb.height, self.body
        )
    }
}

/// Spacing of the composed figure, in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportLayout {
    /// Horizontal space between the panels.
    pub gap: f32,
    /// Extra height, split evenly above and below the panels.
    pub margin: f32,
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self {
            gap: 40.0,
            margin: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedFigure {
    pub width: f32,
    pub height: f32,
    pub svg: String,
}

fn ready(panel: Option<&VectorPanel>, which: Panel) -> Result<VectorPanel, SyncError> {
    match panel {
        Some(panel) if panel.is_renderable() => Ok(panel.clone().normalize()),
        _ => Err(SyncError::ExportNotReady(which)),
    }
}

/// Place the graph panel left of the bar chart panel in one document.
///
/// Either panel missing or empty aborts the export and nothing is
/// produced.
pub fn compose(
    graph: Option<&VectorPanel>,
    barplot: Option<&VectorPanel>,
    layout: &ExportLayout,
) -> Result<ComposedFigure, SyncError> {
    let a = ready(graph, Panel::Graph)?;
    let b = ready(barplot, Panel::Barplot)?;
    let (va, vb) = (a.view_box, b.view_box);

    let width = va.width + layout.gap + vb.width;
    let height = va.height.max(vb.height) + layout.margin;
    let top = layout.margin / 2.0;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="{SVG_NS}" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = write!(
        svg,
        r#"<g class="panel-graph" transform="translate({} {})">{}</g>"#,
        0.0 - va.min_x,
        top - va.min_y,
        a.body
    );
    let _ = write!(
        svg,
        r#"<g class="panel-barplot" transform="translate({} {})">{}</g>"#,
        va.width + layout.gap - vb.min_x,
        top - vb.min_y,
        b.body
    );
    svg.push_str("</svg>");

    tracing::info!(width, height, "figure composed");
    Ok(ComposedFigure { width, height, svg })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="640px" height="480" viewBox="-20 -10 300 200">
  <circle cx="0" cy="0" r="5"/>
</svg>"#;

    #[test]
    fn test_parse_reads_root_geometry() {
        let panel = VectorPanel::parse(GRAPH).unwrap();
        assert_eq!(panel.view_box, ViewBox::new(-20.0, -10.0, 300.0, 200.0));
        assert_eq!(panel.pixel_size, Some(Size::new(640.0, 480.0)));
        assert_eq!(panel.body, r#"<circle cx="0" cy="0" r="5"/>"#);
        assert_eq!(panel.normalize().pixel_size, None);
    }

    #[test]
    fn test_parse_falls_back_to_pixel_size() {
        let panel = VectorPanel::parse(r#"<svg width="10" height="20"><g/></svg>"#).unwrap();
        assert_eq!(panel.view_box, ViewBox::new(0.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn test_parse_rejects_malformed_documents() {
        assert!(matches!(VectorPanel::parse("<g/>"), Err(SyncError::MalformedSvg(_))));
        assert!(matches!(
            VectorPanel::parse(r#"<svg viewBox="0 0 1"><g/></svg>"#),
            Err(SyncError::MalformedSvg(_))
        ));
        assert!(matches!(
            VectorPanel::parse(r#"<svg viewBox="0 0 1 1"><g/>"#),
            Err(SyncError::MalformedSvg(_))
        ));
    }

    #[test]
    fn test_compose_dimensions_and_offsets() {
        let graph = VectorPanel::parse(GRAPH).unwrap();
        let barplot = VectorPanel::new(ViewBox::new(5.0, 0.0, 100.0, 250.0), "<rect/>");

        let figure = compose(Some(&graph), Some(&barplot), &ExportLayout::default()).unwrap();

        assert_eq!(figure.width, 300.0 + 40.0 + 100.0);
        assert_eq!(figure.height, 250.0 + 20.0);
        assert!(figure.svg.contains(r#"transform="translate(20 20)""#));
        assert!(figure.svg.contains(r#"transform="translate(335 10)""#));
        assert!(!figure.svg.contains("640"));
    }

    #[test]
    fn test_missing_or_empty_panel_is_not_ready() {
        let graph = VectorPanel::parse(GRAPH).unwrap();
        let empty = VectorPanel::new(ViewBox::new(0.0, 0.0, 100.0, 100.0), "  ");

        let missing = compose(Some(&graph), None, &ExportLayout::default());
        assert!(matches!(missing, Err(SyncError::ExportNotReady(Panel::Barplot))));
        let blank = compose(Some(&graph), Some(&empty), &ExportLayout::default());
        assert!(matches!(blank, Err(SyncError::ExportNotReady(Panel::Barplot))));
        let no_graph = compose(None, Some(&graph), &ExportLayout::default());
        assert!(matches!(no_graph, Err(SyncError::ExportNotReady(Panel::Graph))));
    }

    #[test]
    fn test_panel_round_trips_through_svg_text() {
        let panel = VectorPanel::new(ViewBox::new(0.0, 0.0, 50.0, 60.5), "<g/>");
        assert_eq!(VectorPanel::parse(&panel.to_svg()).unwrap(), panel);
    }
}
