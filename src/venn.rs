use std::f64::consts::PI;

use crate::data::OverlapRecord;
use crate::scale::ColorScale;
use crate::svg::{Anchor, Element, Scene};
use crate::view::PlotConfig;

const FALLBACK_FILL: &str = "steelblue";
const SET_FILL_OPACITY: f64 = 0.25;
const LAYOUT_PADDING: f64 = 15.0;

/// Overlap panel below the scatter plot. Every update rebuilds the scene
/// from scratch; a lookup miss clears it to an empty surface.
#[derive(Debug, Clone)]
pub struct VennPanel {
    scene: Scene,
}

impl VennPanel {
    pub fn new() -> Self {
        VennPanel {
            scene: Scene::new(0.0, 0.0, ""),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn svg(&self) -> String {
        self.scene.to_svg()
    }

    /// Initial empty surface.
    pub fn render(&mut self, config: &PlotConfig) {
        self.scene = self.empty_scene(config);
    }

    /// Removes everything; used when no overlap record exists for a pair.
    pub fn clear(&mut self, config: &PlotConfig) {
        self.scene = self.empty_scene(config);
    }

    fn empty_scene(&self, config: &PlotConfig) -> Scene {
        Scene::new(
            config.scatter_width(),
            config.venn_height(),
            config.font_family.clone(),
        )
    }

    /// Redraws the panel for one oriented overlap record. Identical sets
    /// collapse to a single merged circle, zero intersections fall back to
    /// a fixed-radius disjoint pair, anything else gets the proportional
    /// two-circle layout.
    pub fn update(&mut self, config: &PlotConfig, record: &OverlapRecord, colors: &ColorScale) {
        self.scene = self.empty_scene(config);
        let w = config.scatter_width();
        let h = config.venn_height();
        let (tint_a, tint_b) = colors.extremes();
        let tint_a = tint_a.to_string();
        let tint_b = tint_b.to_string();

        if record.c == record.a && record.c == record.b {
            self.draw_merged(config, record, w, h);
        } else if record.c == 0 {
            self.draw_disjoint(config, record, w, h);
        } else {
            self.draw_proportional(record, &tint_a, &tint_b, w, h);
        }

        self.draw_legend(record, &tint_a, &tint_b, w);
    }

    fn draw_merged(&mut self, config: &PlotConfig, record: &OverlapRecord, w: f64, h: f64) {
        let r = config.height / 6.0 - 10.0;
        self.scene.push(
            Element::circle(w / 2.0, h / 2.0, r)
                .id("venn_a")
                .fill(FALLBACK_FILL)
                .fill_opacity(SET_FILL_OPACITY)
                .transition(config.hover_duration_ms),
        );
        self.scene.push(
            Element::text(w / 2.0, h / 2.0, record.label_a.clone())
                .id("venn_label_a")
                .anchor(Anchor::Middle)
                .dy("-1em")
                .font_size(12.0),
        );
        self.scene.push(
            Element::text(w / 2.0, h / 2.0, record.label_b.clone())
                .id("venn_label_b")
                .anchor(Anchor::Middle)
                .dy("1em")
                .font_size(12.0),
        );
    }

    fn draw_disjoint(&mut self, config: &PlotConfig, record: &OverlapRecord, w: f64, h: f64) {
        let r = config.height / 6.0 - 10.0;
        let centers = [(w / 2.0 - 100.0, "venn_a"), (w / 2.0 + 100.0, "venn_b")];
        let labels = [
            (w / 2.0 - 100.0, "venn_label_a", record.label_a.clone()),
            (w / 2.0 + 100.0, "venn_label_b", record.label_b.clone()),
        ];
        for (cx, id) in centers {
            self.scene.push(
                Element::circle(cx, h / 2.0, r)
                    .id(id)
                    .fill(FALLBACK_FILL)
                    .fill_opacity(SET_FILL_OPACITY)
                    .transition(config.hover_duration_ms),
            );
        }
        for (cx, id, text) in labels {
            self.scene.push(
                Element::text(cx, h / 2.0, text)
                    .id(id)
                    .anchor(Anchor::Middle)
                    .font_size(12.0),
            );
        }
    }

    fn draw_proportional(
        &mut self,
        record: &OverlapRecord,
        tint_a: &str,
        tint_b: &str,
        w: f64,
        h: f64,
    ) {
        let layout = proportional_layout(record.a, record.b, record.c, w, h, LAYOUT_PADDING);
        self.scene.push(
            Element::circle(layout.cx_a, layout.cy, layout.r_a)
                .id("venn_a")
                .fill(tint_a)
                .fill_opacity(SET_FILL_OPACITY),
        );
        self.scene.push(
            Element::circle(layout.cx_b, layout.cy, layout.r_b)
                .id("venn_b")
                .fill(tint_b)
                .fill_opacity(SET_FILL_OPACITY),
        );
        self.scene.push(
            Element::text(layout.cx_a, layout.cy, record.label_a.clone())
                .id("venn_label_a")
                .anchor(Anchor::Middle)
                .fill("#000")
                .font_size(8.0),
        );
        self.scene.push(
            Element::text(layout.cx_b, layout.cy, record.label_b.clone())
                .id("venn_label_b")
                .anchor(Anchor::Middle)
                .fill("#000")
                .font_size(8.0),
        );
    }

    fn draw_legend(&mut self, record: &OverlapRecord, tint_a: &str, tint_b: &str, w: f64) {
        let entries = [
            (format!("{}: {}", record.label_a, record.a), Some(tint_a)),
            (format!("{}: {}", record.label_b, record.b), Some(tint_b)),
            (format!("Intersection: {}", record.c), None),
        ];
        for (k, (text, tint)) in entries.into_iter().enumerate() {
            let mut entry = Element::text(w, 15.0 + k as f64 * 20.0, text)
                .id(format!("legend_{}", k))
                .class("legend")
                .anchor(Anchor::End)
                .dx("-10px")
                .font_size(11.0)
                .bold();
            if let Some(tint) = tint {
                entry = entry.fill(tint);
            }
            self.scene.push(entry);
        }
    }
}

impl Default for VennPanel {
    fn default() -> Self {
        VennPanel::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EulerLayout {
    cx_a: f64,
    cx_b: f64,
    cy: f64,
    r_a: f64,
    r_b: f64,
}

/// Area of the lens formed by two circles of radius `r1` and `r2` whose
/// centers are `d` apart.
fn lens_area(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    let r_min = r1.min(r2);
    if d <= (r1 - r2).abs() {
        return PI * r_min * r_min;
    }
    let acos_clamped = |x: f64| x.clamp(-1.0, 1.0).acos();
    let part1 = r1 * r1 * acos_clamped((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1));
    let part2 = r2 * r2 * acos_clamped((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2));
    let under = (-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2);
    part1 + part2 - 0.5 * under.max(0.0).sqrt()
}

/// Center distance at which the lens area equals `target`. The lens area
/// falls monotonically with distance, so a plain bisection converges; a
/// target at or above the smaller circle's area clamps to containment.
fn solve_distance(r1: f64, r2: f64, target: f64) -> f64 {
    let r_min = r1.min(r2);
    // `r_min` came through a sqrt, so `PI * r_min * r_min` can land a few
    // ulps above the exact set area; the containment test carries that slack.
    let max_lens = PI * r_min * r_min;
    if target >= max_lens * (1.0 - 4.0 * f64::EPSILON) {
        return (r1 - r2).abs();
    }
    let mut lo = (r1 - r2).abs();
    let mut hi = r1 + r2;
    for _ in 0..50 {
        let mid = (lo + hi) / 2.0;
        if lens_area(r1, r2, mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Proportional two-circle layout: circle areas equal the set sizes, the
/// lens area equals the intersection, and the solution is uniformly scaled
/// and centered into the panel.
fn proportional_layout(a: u64, b: u64, c: u64, w: f64, h: f64, padding: f64) -> EulerLayout {
    let r1 = (a as f64 / PI).sqrt();
    let r2 = (b as f64 / PI).sqrt();
    // Containment is exact on the integer sizes.
    let d = if c >= a.min(b) {
        (r1 - r2).abs()
    } else {
        solve_distance(r1, r2, c as f64)
    };

    // Circle A at the origin, B at (d, 0); fit the bounding box.
    let x_lo = -r1;
    let x_hi = d + r2;
    let r_max = r1.max(r2);
    let bbox_w = x_hi - x_lo;
    let bbox_h = 2.0 * r_max;
    let scale = ((w - 2.0 * padding) / bbox_w).min((h - 2.0 * padding) / bbox_h);
    let bcx = (x_lo + x_hi) / 2.0;

    EulerLayout {
        cx_a: (0.0 - bcx) * scale + w / 2.0,
        cx_b: (d - bcx) * scale + w / 2.0,
        cy: h / 2.0,
        r_a: r1 * scale,
        r_b: r2 * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PlotConfig;

    fn record(a: u64, b: u64, c: u64) -> OverlapRecord {
        OverlapRecord {
            label_a_id: "p1".to_string(),
            label_b_id: "p2".to_string(),
            label_a: "plant height".to_string(),
            label_b: "seed weight".to_string(),
            a,
            b,
            c,
        }
    }

    fn circle_geom(scene: &Scene, id: &str) -> (f64, f64, f64) {
        match scene.find(id).unwrap().shape {
            crate::svg::Shape::Circle { cx, cy, r } => (cx, cy, r),
            _ => panic!("{id} is not a circle"),
        }
    }

    #[test]
    fn test_identical_sets_take_the_merged_path() {
        let config = PlotConfig::default();
        let mut panel = VennPanel::new();
        panel.update(&config, &record(10, 10, 10), &ColorScale::diverging());

        let (cx, cy, r) = circle_geom(panel.scene(), "venn_a");
        assert!(panel.scene().find("venn_b").is_none());
        assert_eq!(cx, config.scatter_width() / 2.0);
        assert_eq!(cy, config.venn_height() / 2.0);
        assert_eq!(r, config.height / 6.0 - 10.0);

        let above = panel.scene().find("venn_label_a").unwrap();
        let below = panel.scene().find("venn_label_b").unwrap();
        assert_eq!(above.text_content(), Some("plant height"));
        assert_eq!(below.text_content(), Some("seed weight"));
    }

    #[test]
    fn test_zero_intersection_takes_the_disjoint_path() {
        let config = PlotConfig::default();
        let mut panel = VennPanel::new();
        panel.update(&config, &record(10, 5, 0), &ColorScale::diverging());

        let (ax, _, ar) = circle_geom(panel.scene(), "venn_a");
        let (bx, _, br) = circle_geom(panel.scene(), "venn_b");
        // Fixed radius, not proportional.
        assert_eq!(ar, br);
        assert_eq!(ar, config.height / 6.0 - 10.0);
        assert_eq!(bx - ax, 200.0);
        assert_eq!(
            panel.scene().find("venn_a").unwrap().fill.as_deref(),
            Some("steelblue")
        );
    }

    #[test]
    fn test_partial_intersection_takes_the_proportional_path() {
        let config = PlotConfig::default();
        let colors = ColorScale::diverging();
        let mut panel = VennPanel::new();
        panel.update(&config, &record(10, 5, 3), &colors);

        let (ax, _, ar) = circle_geom(panel.scene(), "venn_a");
        let (bx, _, br) = circle_geom(panel.scene(), "venn_b");
        // Areas follow the sizes and the circles actually overlap.
        assert!(ar > br);
        assert!((ar * ar / (br * br) - 2.0).abs() < 1e-9);
        let d = (bx - ax).abs();
        assert!(d < ar + br);
        assert!(d > (ar - br).abs());

        let (neg, pos) = colors.extremes();
        assert_eq!(panel.scene().find("venn_a").unwrap().fill.as_deref(), Some(neg));
        assert_eq!(panel.scene().find("venn_b").unwrap().fill.as_deref(), Some(pos));
        assert_eq!(
            panel.scene().find("venn_label_a").unwrap().text_font_size(),
            Some(8.0)
        );
    }

    #[test]
    fn test_solver_hits_the_target_lens_area() {
        let r1 = (10.0_f64 / PI).sqrt();
        let r2 = (5.0_f64 / PI).sqrt();
        let d = solve_distance(r1, r2, 3.0);
        assert!((lens_area(r1, r2, d) - 3.0).abs() < 1e-6);

        // Full containment clamps to the radius difference.
        let d = solve_distance(r1, r2, 5.0);
        assert!((d - (r1 - r2).abs()).abs() < 1e-12);
    }

    #[test]
    fn test_full_containment_nests_the_circles() {
        // C equal to the smaller set size puts B entirely inside A.
        let layout = proportional_layout(10, 5, 5, 500.0, 203.0, LAYOUT_PADDING);
        let d = (layout.cx_b - layout.cx_a).abs();
        assert!((d - (layout.r_a - layout.r_b).abs()).abs() < 1e-9);

        let config = PlotConfig::default();
        let mut panel = VennPanel::new();
        panel.update(&config, &record(10, 5, 5), &ColorScale::diverging());
        let (ax, _, ar) = circle_geom(panel.scene(), "venn_a");
        let (bx, _, br) = circle_geom(panel.scene(), "venn_b");
        assert!((bx - ax).abs() + br <= ar + 1e-9);
    }

    #[test]
    fn test_layout_fits_in_the_panel() {
        let w = 500.0;
        let h = 203.0;
        let layout = proportional_layout(4000, 1000, 200, w, h, LAYOUT_PADDING);
        let eps = 1e-9;
        assert!(layout.cx_a - layout.r_a >= LAYOUT_PADDING - eps);
        assert!(layout.cx_b + layout.r_b <= w - LAYOUT_PADDING + eps);
        assert!(layout.cy - layout.r_a.max(layout.r_b) >= LAYOUT_PADDING - eps);
        assert!(layout.cy + layout.r_a.max(layout.r_b) <= h - LAYOUT_PADDING + eps);
    }

    #[test]
    fn test_legend_is_always_present() {
        let config = PlotConfig::default();
        let colors = ColorScale::diverging();
        let mut panel = VennPanel::new();

        for rec in [record(10, 10, 10), record(10, 5, 0), record(10, 5, 3)] {
            panel.update(&config, &rec, &colors);
            assert_eq!(panel.scene().with_class("legend").count(), 3);
        }

        panel.update(&config, &record(10, 5, 3), &colors);
        let first = panel.scene().find("legend_0").unwrap();
        assert_eq!(first.text_content(), Some("plant height: 10"));
        assert_eq!(first.fill.as_deref(), Some(colors.extremes().0));
        assert_eq!(first.font_weight.as_deref(), Some("bold"));
        let third = panel.scene().find("legend_2").unwrap();
        assert_eq!(third.text_content(), Some("Intersection: 3"));
        assert!(third.fill.is_none());
    }

    #[test]
    fn test_clear_empties_the_panel() {
        let config = PlotConfig::default();
        let mut panel = VennPanel::new();
        panel.update(&config, &record(10, 5, 3), &ColorScale::diverging());
        assert!(!panel.scene().elements.is_empty());

        panel.clear(&config);
        assert!(panel.scene().elements.is_empty());
        assert_eq!(panel.scene().width, config.scatter_width());
    }
}
