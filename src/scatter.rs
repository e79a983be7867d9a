use crate::data::ScatterSeries;
use crate::scale::LinearScale;
use crate::svg::{Anchor, Element, Scene};
use crate::view::PlotConfig;

const POINT_STROKE: &str = "rgb(121,85,72)";
const POINT_FILL: &str = "rgb(161,136,127)";
const INFO_FILL: &str = "rgb(121,85,72)";

/// Scatter panel under the heatmap. Rebuilt axes and a full point replace
/// on every update; the instructional info box appears once and is hidden
/// permanently on the first hover.
#[derive(Debug, Clone)]
pub struct ScatterPanel {
    scene: Scene,
    x_scale: LinearScale,
    y_scale: LinearScale,
    info_hidden: bool,
}

impl ScatterPanel {
    pub fn new() -> Self {
        ScatterPanel {
            scene: Scene::new(0.0, 0.0, ""),
            x_scale: LinearScale::new((0.0, 1.0), (0.0, 1.0)),
            y_scale: LinearScale::new((1.0, 0.0), (0.0, 1.0)),
            info_hidden: false,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn svg(&self) -> String {
        self.scene.to_svg()
    }

    /// Builds the initial coordinate system: unit axes, grid, empty axis
    /// labels and the info box.
    pub fn render(&mut self, config: &PlotConfig) {
        let sw = config.scatter_width();
        let sh = config.scatter_height();
        let iw = config.scatter_inner_width();
        let ih = config.scatter_inner_height();
        let m = &config.margins_scatter;

        self.scene = Scene::new(sw, sh, config.font_family.clone());
        self.x_scale = LinearScale::new((0.0, 1.0), (0.0, iw));
        self.y_scale = LinearScale::new((1.0, 0.0), (0.0, ih));
        self.info_hidden = false;

        self.push_axes(config, 0);

        // Axis labels start empty; updates fill them in.
        self.scene.push(
            Element::text(sw / 2.0, sh - m.bottom, "")
                .id("scatter_x_label")
                .anchor(Anchor::Middle)
                .dy("3.2em")
                .font_size(12.0),
        );
        self.scene.push(
            Element::text(m.left, sh / 2.0, "")
                .id("scatter_y_label")
                .anchor(Anchor::Middle)
                .rotate(-90.0)
                .dy("-3.2em")
                .dx("-.5em")
                .font_size(12.0),
        );

        self.scene.push(
            Element::rect(sw / 2.0 - 100.0, sh / 2.0 - 50.0, 200.0, 100.0)
                .id("info_box_rect")
                .class("info-box")
                .rounded(10.0)
                .fill(INFO_FILL)
                .opacity(0.7)
                .transition(config.enter_duration_ms),
        );
        let lines = [
            ("info_line_0", "-1.8em", "To update scatter plot"),
            ("info_line_1", "-0.5em", "hover over any point"),
            ("info_line_2", "0.8em", "in the correlation plot"),
            ("info_line_3", "2.1em", "in the left panel!"),
        ];
        for (id, dy, text) in lines {
            self.scene.push(
                Element::text(sw / 2.0, sh / 2.0, text)
                    .id(id)
                    .class("info-box")
                    .anchor(Anchor::Middle)
                    .dy(dy)
                    .opacity(1.0)
                    .transition(config.enter_duration_ms),
            );
        }
    }

    /// Fades the info box out. Later updates never bring it back.
    pub fn hide_info_box(&mut self, config: &PlotConfig) {
        if self.info_hidden {
            return;
        }
        let duration = config.hide_duration_ms;
        for element in self.scene.with_class_mut("info-box") {
            element.opacity = Some(0.0);
            element.transition_ms = Some(duration);
        }
        self.info_hidden = true;
    }

    /// Redraws the panel for an (x, y) phenotype pair: joins the two series
    /// on sample id preserving the x-series order, rescales both axes with
    /// padding around the joined extent and replaces the whole point set.
    pub fn update(&mut self, config: &PlotConfig, x: &ScatterSeries, y: &ScatterSeries) {
        let iw = config.scatter_inner_width();
        let ih = config.scatter_inner_height();
        let m = &config.margins_scatter;
        let label_ms = config.hover_duration_ms;
        let rescale_ms = config.rescale_duration_ms;

        if let Some(el) = self.scene.find_mut("scatter_x_label") {
            el.set_text(x.label.clone());
            el.transition_ms = Some(label_ms);
        }
        if let Some(el) = self.scene.find_mut("scatter_y_label") {
            el.set_text(y.label.clone());
            el.transition_ms = Some(label_ms);
        }

        // Inner join on sample id, first match wins, x order preserved.
        let mut points = Vec::new();
        for (k, sample) in x.sample_ids.iter().enumerate() {
            if let Some(pos) = y.sample_ids.iter().position(|s| s == sample) {
                points.push((x.values[k], y.values[pos]));
            }
        }

        let pad_ratio = config.scatter_pad_ratio;
        let (x_dom, y_dom) = match joined_extents(&points) {
            Some(((x_min, x_max), (y_min, y_max))) => {
                let x_pad = x_min.abs() * pad_ratio;
                let y_pad = y_min.abs() * pad_ratio;
                ((x_min - x_pad, x_max + x_pad), (y_max + y_pad, y_min - y_pad))
            }
            // Empty join: clear the points, fall back to the unit axes.
            None => ((0.0, 1.0), (1.0, 0.0)),
        };
        self.x_scale = LinearScale::new(x_dom, (0.0, iw));
        self.y_scale = LinearScale::new(y_dom, (0.0, ih));

        self.scene.remove_class("xs-axis");
        self.scene.remove_class("ys-axis");
        self.scene.remove_class("scatter-grid");
        self.push_axes(config, rescale_ms);

        self.scene.remove_class("pp");
        let mut k = 0;
        for (px, py) in points {
            if !px.is_finite() || !py.is_finite() {
                continue;
            }
            self.scene.push(
                Element::circle(
                    m.left + self.x_scale.scale(px),
                    m.top + self.y_scale.scale(py),
                    5.0,
                )
                .id(format!("pt_{}", k))
                .class("pp")
                .stroke(POINT_STROKE)
                .fill(POINT_FILL)
                .opacity(0.4)
                .crisp_edges()
                .transition(rescale_ms),
            );
            k += 1;
        }
    }

    fn push_axes(&mut self, config: &PlotConfig, transition_ms: u32) {
        let sh = config.scatter_height();
        let iw = config.scatter_inner_width();
        let ih = config.scatter_inner_height();
        let m = &config.margins_scatter;
        let x_base = sh - m.bottom;

        let mut x_axis = axis_line(m.left, x_base, m.left + iw, x_base, "xs-axis");
        let mut y_axis = axis_line(m.left, m.top, m.left, m.top + ih, "ys-axis");
        if transition_ms > 0 {
            x_axis = x_axis.transition(transition_ms);
            y_axis = y_axis.transition(transition_ms);
        }
        self.scene.push(x_axis);
        self.scene.push(y_axis);

        let x_decimals = self.x_scale.tick_decimals(10);
        for tick in self.x_scale.ticks(10) {
            let tx = m.left + self.x_scale.scale(tick);
            let mut mark = axis_line(tx, x_base, tx, x_base + 6.0, "xs-axis");
            let mut label = Element::text(tx, x_base + 9.0, format!("{:.*}", x_decimals, tick))
                .class("xs-axis")
                .anchor(Anchor::Middle)
                .dy(".71em")
                .font_size(12.0);
            let grid = axis_line(tx, x_base, tx, x_base - ih, "scatter-grid");
            if transition_ms > 0 {
                mark = mark.transition(transition_ms);
                label = label.transition(transition_ms);
            }
            self.scene.push(mark);
            self.scene.push(label);
            self.scene.push(grid);
        }

        let y_decimals = self.y_scale.tick_decimals(10);
        for tick in self.y_scale.ticks(10) {
            let ty = m.top + self.y_scale.scale(tick);
            let mut mark = axis_line(m.left - 6.0, ty, m.left, ty, "ys-axis");
            let mut label = Element::text(m.left - 9.0, ty, format!("{:.*}", y_decimals, tick))
                .class("ys-axis")
                .anchor(Anchor::End)
                .dy(".32em")
                .font_size(12.0);
            let grid = axis_line(m.left, ty, m.left + iw, ty, "scatter-grid");
            if transition_ms > 0 {
                mark = mark.transition(transition_ms);
                label = label.transition(transition_ms);
            }
            self.scene.push(mark);
            self.scene.push(label);
            self.scene.push(grid);
        }
    }
}

impl Default for ScatterPanel {
    fn default() -> Self {
        ScatterPanel::new()
    }
}

fn axis_line(x1: f64, y1: f64, x2: f64, y2: f64, class: &str) -> Element {
    Element::line(x1, y1, x2, y2)
        .class(class)
        .stroke("black")
        .stroke_opacity(0.2)
        .crisp_edges()
}

fn joined_extents(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    let mut x_ext: Option<(f64, f64)> = None;
    let mut y_ext: Option<(f64, f64)> = None;
    for &(px, py) in points {
        if px.is_finite() {
            x_ext = Some(match x_ext {
                Some((lo, hi)) => (lo.min(px), hi.max(px)),
                None => (px, px),
            });
        }
        if py.is_finite() {
            y_ext = Some(match y_ext {
                Some((lo, hi)) => (lo.min(py), hi.max(py)),
                None => (py, py),
            });
        }
    }
    match (x_ext, y_ext) {
        (Some(x), Some(y)) => Some((x, y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PlotConfig;

    fn series(id: &str, label: &str, samples: &[&str], values: &[f64]) -> ScatterSeries {
        ScatterSeries {
            phenotype_id: id.to_string(),
            label: label.to_string(),
            sample_ids: samples.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_initial_panel_has_info_box_and_unit_axes() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        assert!(panel.scene().find("info_box_rect").is_some());
        assert_eq!(panel.scene().with_class("info-box").count(), 5);
        assert_eq!(
            panel
                .scene()
                .find("info_line_0")
                .unwrap()
                .text_content(),
            Some("To update scatter plot")
        );
        // Unit domain produces 11 ticks per axis.
        assert_eq!(panel.x_scale.ticks(10).len(), 11);
        assert_eq!(panel.scene().with_class("pp").count(), 0);
    }

    #[test]
    fn test_join_preserves_x_order_and_drops_unmatched() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        // Sample universe from the matching contract: S1/S2/S3 vs S2/S3/S4
        // joins to exactly (x2,y2) and (x3,y3), in x order.
        let x = series("p1", "plant height", &["S1", "S2", "S3"], &[1.0, 2.0, 3.0]);
        let y = series("p2", "seed weight", &["S2", "S3", "S4"], &[20.0, 30.0, 40.0]);
        panel.update(&config, &x, &y);

        let points: Vec<&Element> = panel.scene().with_class("pp").collect();
        assert_eq!(points.len(), 2);
        let p0 = panel.scene().find("pt_0").unwrap();
        let p1 = panel.scene().find("pt_1").unwrap();
        // x=2 joins y=20, x=3 joins y=30; x order means pt_0 is the x=2 point.
        match (&p0.shape, &p1.shape) {
            (
                crate::svg::Shape::Circle { cx: cx0, .. },
                crate::svg::Shape::Circle { cx: cx1, .. },
            ) => {
                assert!(cx0 < cx1);
            }
            _ => panic!("points must be circles"),
        }
        // Extent of the joined values only, padded by |min| * 0.1.
        assert_eq!(panel.x_scale.domain(), (1.8, 3.2));
        assert_eq!(panel.y_scale.domain(), (32.0, 18.0));
        assert_eq!(
            panel.scene().find("scatter_x_label").unwrap().text_content(),
            Some("plant height")
        );
    }

    #[test]
    fn test_rescale_pads_with_abs_min_ratio() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        let x = series("p1", "a", &["S1", "S2"], &[10.0, 20.0]);
        let y = series("p2", "b", &["S1", "S2"], &[-5.0, 5.0]);
        panel.update(&config, &x, &y);

        // pad = |min| * 0.1 on both ends.
        assert_eq!(panel.x_scale.domain(), (9.0, 21.0));
        // y domain is stored inverted, max+pad first.
        assert_eq!(panel.y_scale.domain(), (5.5, -5.5));
    }

    #[test]
    fn test_empty_join_clears_points_and_resets_axes() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        let x = series("p1", "a", &["S1", "S2"], &[1.0, 2.0]);
        let y = series("p2", "b", &["S1", "S2"], &[10.0, 20.0]);
        panel.update(&config, &x, &y);
        assert_eq!(panel.scene().with_class("pp").count(), 2);

        let y_disjoint = series("p3", "c", &["S8", "S9"], &[1.0, 2.0]);
        panel.update(&config, &x, &y_disjoint);
        assert_eq!(panel.scene().with_class("pp").count(), 0);
        assert_eq!(panel.x_scale.domain(), (0.0, 1.0));
        assert_eq!(panel.y_scale.domain(), (1.0, 0.0));
    }

    #[test]
    fn test_nonfinite_points_are_skipped_but_ignored_for_extent() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        let x = series("p1", "a", &["S1", "S2", "S3"], &[1.0, f64::NAN, 3.0]);
        let y = series("p2", "b", &["S1", "S2", "S3"], &[10.0, 20.0, 30.0]);
        panel.update(&config, &x, &y);

        assert_eq!(panel.scene().with_class("pp").count(), 2);
        // Extent from the finite joined values only.
        assert_eq!(panel.x_scale.domain(), (0.9, 3.1));
    }

    #[test]
    fn test_info_box_hides_once_and_stays_hidden() {
        let config = PlotConfig::default();
        let mut panel = ScatterPanel::new();
        panel.render(&config);

        panel.hide_info_box(&config);
        let rect = panel.scene().find("info_box_rect").unwrap();
        assert_eq!(rect.opacity, Some(0.0));
        assert_eq!(rect.transition_ms, Some(config.hide_duration_ms));

        let x = series("p1", "a", &["S1"], &[1.0]);
        let y = series("p2", "b", &["S1"], &[2.0]);
        panel.update(&config, &x, &y);
        assert_eq!(
            panel.scene().find("info_box_rect").unwrap().opacity,
            Some(0.0)
        );
    }
}
