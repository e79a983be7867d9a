use std::fmt::Write as FmtWrite;

/// Horizontal anchor of a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Geometry of a scene element.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rx: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        anchor: Anchor,
        font_size: f64,
        /// Rotation in degrees around (x, y).
        rotate: Option<f64>,
        /// Relative offsets, kept as raw attribute strings so em units work.
        dx: Option<String>,
        dy: Option<String>,
    },
}

/// One renderable element. Panels mutate elements in place on hover and
/// toggle events; the id is the stable handle (`glyph_2_0`, `swatch_12`).
/// Only the most recent transition duration is kept per element, so a new
/// transition supersedes any in-flight one.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: Option<String>,
    pub class: Option<String>,
    pub shape: Shape,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_opacity: Option<f64>,
    pub fill_opacity: Option<f64>,
    pub opacity: Option<f64>,
    pub font_weight: Option<String>,
    pub crisp: bool,
    pub transition_ms: Option<u32>,
    pub data: Vec<(String, String)>,
}

impl Element {
    fn from_shape(shape: Shape) -> Self {
        Element {
            id: None,
            class: None,
            shape,
            fill: None,
            stroke: None,
            stroke_width: None,
            stroke_opacity: None,
            fill_opacity: None,
            opacity: None,
            font_weight: None,
            crisp: false,
            transition_ms: None,
            data: Vec::new(),
        }
    }

    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Element::from_shape(Shape::Circle { cx, cy, r })
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Element::from_shape(Shape::Rect {
            x,
            y,
            width,
            height,
            rx: 0.0,
        })
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Element::from_shape(Shape::Line { x1, y1, x2, y2 })
    }

    pub fn text(x: f64, y: f64, content: impl Into<String>) -> Self {
        Element::from_shape(Shape::Text {
            x,
            y,
            content: content.into(),
            anchor: Anchor::Start,
            font_size: 12.0,
            rotate: None,
            dx: None,
            dy: None,
        })
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn stroke(mut self, stroke: impl Into<String>) -> Self {
        self.stroke = Some(stroke.into());
        self
    }

    pub fn stroke_width(mut self, w: f64) -> Self {
        self.stroke_width = Some(w);
        self
    }

    pub fn stroke_opacity(mut self, o: f64) -> Self {
        self.stroke_opacity = Some(o);
        self
    }

    pub fn fill_opacity(mut self, o: f64) -> Self {
        self.fill_opacity = Some(o);
        self
    }

    pub fn opacity(mut self, o: f64) -> Self {
        self.opacity = Some(o);
        self
    }

    pub fn bold(mut self) -> Self {
        self.font_weight = Some("bold".to_string());
        self
    }

    pub fn crisp_edges(mut self) -> Self {
        self.crisp = true;
        self
    }

    pub fn transition(mut self, ms: u32) -> Self {
        self.transition_ms = Some(ms);
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        if let Shape::Text { anchor: a, .. } = &mut self.shape {
            *a = anchor;
        }
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        if let Shape::Text { font_size, .. } = &mut self.shape {
            *font_size = size;
        }
        self
    }

    pub fn rotate(mut self, degrees: f64) -> Self {
        if let Shape::Text { rotate, .. } = &mut self.shape {
            *rotate = Some(degrees);
        }
        self
    }

    pub fn dx(mut self, v: impl Into<String>) -> Self {
        if let Shape::Text { dx, .. } = &mut self.shape {
            *dx = Some(v.into());
        }
        self
    }

    pub fn dy(mut self, v: impl Into<String>) -> Self {
        if let Shape::Text { dy, .. } = &mut self.shape {
            *dy = Some(v.into());
        }
        self
    }

    pub fn rounded(mut self, r: f64) -> Self {
        if let Shape::Rect { rx, .. } = &mut self.shape {
            *rx = r;
        }
        self
    }

    pub fn data_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// Replaces a data attribute in place, inserting it if absent.
    pub fn set_data_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.data.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.data.push((key.to_string(), value)),
        }
    }

    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// In-place radius update; ignored for non-circles.
    pub fn set_radius(&mut self, value: f64) {
        if let Shape::Circle { r, .. } = &mut self.shape {
            *r = value;
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match self.shape {
            Shape::Circle { r, .. } => Some(r),
            _ => None,
        }
    }

    /// In-place font size update; ignored for non-text.
    pub fn set_font_size(&mut self, value: f64) {
        if let Shape::Text { font_size, .. } = &mut self.shape {
            *font_size = value;
        }
    }

    pub fn text_font_size(&self) -> Option<f64> {
        match self.shape {
            Shape::Text { font_size, .. } => Some(font_size),
            _ => None,
        }
    }

    pub fn set_text(&mut self, value: impl Into<String>) {
        if let Shape::Text { content, .. } = &mut self.shape {
            *content = value.into();
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { content, .. } => Some(content.as_str()),
            _ => None,
        }
    }
}

/// A panel's scene: an element list plus the panel surface size. Serialized
/// to SVG on demand; the element order is the paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub font_family: String,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn new(width: f64, height: f64, font_family: impl Into<String>) -> Self {
        Scene {
            width,
            height,
            font_family: font_family.into(),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn find(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id.as_deref() == Some(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements
            .iter_mut()
            .find(|e| e.id.as_deref() == Some(id))
    }

    pub fn with_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.class.as_deref() == Some(class))
    }

    pub fn with_class_mut<'a>(
        &'a mut self,
        class: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.elements
            .iter_mut()
            .filter(move |e| e.class.as_deref() == Some(class))
    }

    pub fn remove_class(&mut self, class: &str) {
        self.elements.retain(|e| e.class.as_deref() != Some(class));
    }

    /// Serializes the scene to a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut out = String::with_capacity(4096 + self.elements.len() * 160);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-family="{}">"#,
            fmt_num(self.width),
            fmt_num(self.height),
            fmt_num(self.width),
            fmt_num(self.height),
            escape_attr(&self.font_family)
        );
        for element in &self.elements {
            write_element(&mut out, element);
        }
        out.push_str("</svg>\n");
        out
    }
}

fn write_element(out: &mut String, element: &Element) {
    let common = common_attrs(element);
    let style = style_attr(element);
    match &element.shape {
        Shape::Circle { cx, cy, r } => {
            let _ = writeln!(
                out,
                r#"<circle{} cx="{}" cy="{}" r="{}"{} />"#,
                common,
                fmt_num(*cx),
                fmt_num(*cy),
                fmt_num(*r),
                style
            );
        }
        Shape::Rect {
            x,
            y,
            width,
            height,
            rx,
        } => {
            let rounded = if *rx > 0.0 {
                format!(r#" rx="{}" ry="{}""#, fmt_num(*rx), fmt_num(*rx))
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                r#"<rect{} x="{}" y="{}" width="{}" height="{}"{}{} />"#,
                common,
                fmt_num(*x),
                fmt_num(*y),
                fmt_num(*width),
                fmt_num(*height),
                rounded,
                style
            );
        }
        Shape::Line { x1, y1, x2, y2 } => {
            let _ = writeln!(
                out,
                r#"<line{} x1="{}" y1="{}" x2="{}" y2="{}"{} />"#,
                common,
                fmt_num(*x1),
                fmt_num(*y1),
                fmt_num(*x2),
                fmt_num(*y2),
                style
            );
        }
        Shape::Text {
            x,
            y,
            content,
            anchor,
            font_size: _,
            rotate,
            dx,
            dy,
        } => {
            let mut extra = String::new();
            if let Some(deg) = rotate {
                let _ = write!(
                    extra,
                    r#" transform="rotate({} {} {})""#,
                    fmt_num(*deg),
                    fmt_num(*x),
                    fmt_num(*y)
                );
            }
            if let Some(dx) = dx {
                let _ = write!(extra, r#" dx="{}""#, escape_attr(dx));
            }
            if let Some(dy) = dy {
                let _ = write!(extra, r#" dy="{}""#, escape_attr(dy));
            }
            let _ = writeln!(
                out,
                r#"<text{} x="{}" y="{}" text-anchor="{}"{}{}>{}</text>"#,
                common,
                fmt_num(*x),
                fmt_num(*y),
                anchor.as_str(),
                extra,
                style,
                escape_text(content)
            );
        }
    }
}

fn common_attrs(element: &Element) -> String {
    let mut out = String::new();
    if let Some(id) = &element.id {
        let _ = write!(out, r#" id="{}""#, escape_attr(id));
    }
    if let Some(class) = &element.class {
        let _ = write!(out, r#" class="{}""#, escape_attr(class));
    }
    for (key, value) in &element.data {
        let _ = write!(out, r#" data-{}="{}""#, key, escape_attr(value));
    }
    out
}

fn style_attr(element: &Element) -> String {
    let mut style = String::new();
    if let Some(fill) = &element.fill {
        let _ = write!(style, "fill: {}; ", fill);
    } else if matches!(element.shape, Shape::Line { .. }) {
        style.push_str("fill: none; ");
    }
    if let Some(stroke) = &element.stroke {
        let _ = write!(style, "stroke: {}; ", stroke);
    }
    if let Some(w) = element.stroke_width {
        let _ = write!(style, "stroke-width: {}px; ", fmt_num(w));
    }
    if let Some(o) = element.stroke_opacity {
        let _ = write!(style, "stroke-opacity: {}; ", fmt_num(o));
    }
    if let Some(o) = element.fill_opacity {
        let _ = write!(style, "fill-opacity: {}; ", fmt_num(o));
    }
    if let Some(o) = element.opacity {
        let _ = write!(style, "opacity: {}; ", fmt_num(o));
    }
    if let Shape::Text { font_size, .. } = element.shape {
        let _ = write!(style, "font-size: {}px; ", fmt_num(font_size));
    }
    if let Some(weight) = &element.font_weight {
        let _ = write!(style, "font-weight: {}; ", weight);
    }
    if element.crisp {
        style.push_str("shape-rendering: crispEdges; ");
    }
    if let Some(ms) = element.transition_ms {
        let _ = write!(style, "transition: all {}ms; ", ms);
    }
    if style.is_empty() {
        String::new()
    } else {
        format!(r#" style="{}""#, style.trim_end())
    }
}

/// Compact numeric formatting: up to three decimals, trailing zeros trimmed.
pub fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.3}", v);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Escapes text node content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes attribute values.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_lookup_by_id_and_class() {
        let mut scene = Scene::new(100.0, 100.0, "sans-serif");
        scene.push(Element::circle(10.0, 10.0, 4.0).id("glyph_1_0").class("corr"));
        scene.push(Element::circle(20.0, 20.0, 4.0).id("glyph_2_0").class("corr"));
        assert!(scene.find("glyph_1_0").is_some());
        assert!(scene.find("glyph_9_9").is_none());
        assert_eq!(scene.with_class("corr").count(), 2);

        scene.find_mut("glyph_1_0").unwrap().set_radius(9.0);
        assert_eq!(scene.find("glyph_1_0").unwrap().radius(), Some(9.0));
    }

    #[test]
    fn test_class_filters_accept_borrowed_names() {
        let mut scene = Scene::new(100.0, 100.0, "sans-serif");
        scene.push(Element::rect(0.0, 0.0, 40.0, 16.0).class("info-box"));
        scene.push(Element::text(2.0, 12.0, "r = 0.8").class("info-box"));
        scene.push(Element::line(0.0, 0.0, 5.0, 5.0).class("grid"));

        let class = String::from("info-box");
        for element in scene.with_class_mut(&class) {
            element.opacity = Some(0.0);
        }
        assert_eq!(scene.with_class(&class).count(), 2);
        assert!(scene.with_class(&class).all(|e| e.opacity == Some(0.0)));
        assert!(scene.with_class("grid").all(|e| e.opacity.is_none()));
    }

    #[test]
    fn test_remove_class_drops_all_matching() {
        let mut scene = Scene::new(10.0, 10.0, "sans-serif");
        scene.push(Element::circle(1.0, 1.0, 1.0).class("pp"));
        scene.push(Element::circle(2.0, 2.0, 1.0).class("pp"));
        scene.push(Element::line(0.0, 0.0, 5.0, 5.0).class("grid"));
        scene.remove_class("pp");
        assert_eq!(scene.elements.len(), 1);
    }

    #[test]
    fn test_svg_output_contains_attributes() {
        let mut scene = Scene::new(50.0, 40.0, "Arial");
        scene.push(
            Element::circle(5.0, 6.0, 2.5)
                .id("c1")
                .fill("#0B3568")
                .fill_opacity(0.9)
                .transition(100)
                .data_attr("bucket", "3"),
        );
        let svg = scene.to_svg();
        assert!(svg.contains(r#"viewBox="0 0 50 40""#));
        assert!(svg.contains(r#"id="c1""#));
        assert!(svg.contains(r#"cx="5" cy="6" r="2.5""#));
        assert!(svg.contains("fill: #0B3568;"));
        assert!(svg.contains("transition: all 100ms;"));
        assert!(svg.contains(r#"data-bucket="3""#));
    }

    #[test]
    fn test_text_escaping_and_rotation() {
        let mut scene = Scene::new(50.0, 40.0, "Arial");
        scene.push(
            Element::text(10.0, 20.0, "seed weight <5mg> & more")
                .anchor(Anchor::Middle)
                .rotate(-45.0)
                .dy("1.4em"),
        );
        let svg = scene.to_svg();
        assert!(svg.contains("seed weight &lt;5mg&gt; &amp; more"));
        assert!(svg.contains(r#"transform="rotate(-45 10 20)""#));
        assert!(svg.contains(r#"dy="1.4em""#));
        assert!(!svg.contains("<5mg>"));
    }

    #[test]
    fn test_fmt_num_trims_trailing_zeros() {
        assert_eq!(fmt_num(152.0), "152");
        assert_eq!(fmt_num(26.5), "26.5");
        assert_eq!(fmt_num(0.125), "0.125");
        assert_eq!(fmt_num(-0.0001), "0");
    }
}
