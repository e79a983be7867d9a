use crate::data::{AxisEntry, PairDatum, RenderAs};
use crate::scale::{BandScale, ColorScale, LinearScale, SizeScale, BUCKETS};
use crate::svg::{fmt_num, Anchor, Element, Scene};
use crate::view::{CorrMethod, PlotConfig};

/// Display labels longer than this are cut and suffixed with an ellipsis.
pub const LABEL_TRUNCATE_AT: usize = 22;

pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > LABEL_TRUNCATE_AT {
        let cut: String = label.chars().take(LABEL_TRUNCATE_AT).collect();
        format!("{}...", cut)
    } else {
        label.to_string()
    }
}

/// Value behind a pair's label text and label color for the active method.
pub fn label_value(pair: &PairDatum, method: CorrMethod) -> f64 {
    match method {
        CorrMethod::Pearson => pair.pearson,
        CorrMethod::Spearman => pair.spearman,
    }
}

/// Value behind a pair's circle radius and circle fill. Under spearman the
/// stored value is multiplied by the configured prescale first, so circles
/// and labels can disagree when the prescale is not 1.
pub fn circle_value(pair: &PairDatum, method: CorrMethod, prescale: f64) -> f64 {
    match method {
        CorrMethod::Pearson => pair.pearson,
        CorrMethod::Spearman => pair.spearman * prescale,
    }
}

pub fn glyph_id(i: usize, j: usize) -> String {
    format!("glyph_{}_{}", i, j)
}

/// Correlation grid plus its colorbar. Glyph elements carry data attributes
/// so the exported interactive page can wire hover behavior without
/// recomputing any encoding.
#[derive(Debug, Clone)]
pub struct HeatmapPanel {
    scene: Scene,
    band_x: BandScale,
    band_y: BandScale,
    colors: ColorScale,
    sizes: SizeScale,
}

impl HeatmapPanel {
    pub fn new() -> Self {
        HeatmapPanel {
            scene: Scene::new(0.0, 0.0, ""),
            band_x: BandScale::new(1, 1.0),
            band_y: BandScale::new(1, 1.0),
            colors: ColorScale::diverging(),
            sizes: SizeScale::from_band(1.0),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn svg(&self) -> String {
        self.scene.to_svg()
    }

    pub fn colors(&self) -> &ColorScale {
        &self.colors
    }

    pub fn sizes(&self) -> &SizeScale {
        &self.sizes
    }

    pub fn render(
        &mut self,
        config: &PlotConfig,
        axes: &[AxisEntry],
        pairs: &[PairDatum],
        method: CorrMethod,
    ) {
        let gw = config.grid_width();
        let gh = config.grid_height();
        let m = &config.margins;

        self.scene = Scene::new(config.width, config.height, config.font_family.clone());
        self.band_x = BandScale::new(axes.len(), gw);
        self.band_y = BandScale::new(axes.len(), gh);
        self.sizes = SizeScale::from_band(self.band_x.band_width());
        self.colors = match &config.palette {
            Some(palette) => ColorScale::with_colors(palette.clone()),
            None => ColorScale::diverging(),
        };

        self.scene.push(
            Element::rect(m.left, m.top, gw, gh)
                .id("frame")
                .fill("none")
                .crisp_edges(),
        );

        self.push_grid_axes(config, axes);
        self.push_glyphs(config, pairs, method);
        self.push_colorbar(config, method);
    }

    fn push_grid_axes(&mut self, config: &PlotConfig, axes: &[AxisEntry]) {
        let gw = config.grid_width();
        let gh = config.grid_height();
        let m = &config.margins;

        self.scene
            .push(grid_stroke(m.left, m.top, m.left + gw, m.top, "x-axis"));
        self.scene
            .push(grid_stroke(m.left, m.top, m.left, m.top + gh, "y-axis"));

        for (k, axis) in axes.iter().enumerate() {
            let cx = m.left + self.band_x.center(k);
            let cy = m.top + self.band_y.center(k);

            self.scene
                .push(grid_stroke(cx, m.top, cx, m.top - 6.0, "x-axis"));
            self.scene.push(
                Element::text(cx, m.top - 9.0, truncate_label(&axis.label))
                    .id(format!("xtick_{}", axis.phenotype_id))
                    .class("x-axis")
                    .anchor(Anchor::Start)
                    .dx("-0.5em")
                    .dy("-0.5em")
                    .rotate(-45.0)
                    .font_size(12.0),
            );

            self.scene
                .push(grid_stroke(m.left - 6.0, cy, m.left, cy, "y-axis"));
            self.scene.push(
                Element::text(m.left - 9.0, cy, truncate_label(&axis.label))
                    .id(format!("ytick_{}", axis.phenotype_id))
                    .class("y-axis")
                    .anchor(Anchor::End)
                    .dx("0.8em")
                    .dy("-1.6em")
                    .rotate(-45.0)
                    .font_size(12.0),
            );

            // Cell separators sit one half band past each tick center.
            let bx = m.left + self.band_x.position(k) + self.band_x.band_width();
            let by = m.top + self.band_y.position(k) + self.band_y.band_width();
            self.scene
                .push(grid_stroke(bx, m.top, bx, m.top + gh, "grid-line"));
            self.scene
                .push(grid_stroke(m.left, by, m.left + gw, by, "grid-line"));
        }
    }

    fn push_glyphs(&mut self, config: &PlotConfig, pairs: &[PairDatum], method: CorrMethod) {
        let m = &config.margins;
        for pair in pairs {
            let cx = m.left + self.band_x.center(pair.j);
            let cy = m.top + self.band_y.center(pair.i);
            let lv = label_value(pair, method);
            let bucket = self.colors.bucket(lv);
            let key = format!("{}|{}", pair.x_id, pair.y_id);
            let mirror = glyph_id(pair.j, pair.i);

            match pair.render_as {
                RenderAs::Circle => {
                    let cv = circle_value(pair, method, config.spearman_circle_prescale);
                    let r = self.sizes.radius(cv);
                    self.scene.push(
                        Element::circle(cx, cy, r)
                            .id(glyph_id(pair.i, pair.j))
                            .class("corr")
                            .fill(self.colors.color(cv))
                            .fill_opacity(1.0)
                            .opacity(1.0)
                            .transition(config.enter_duration_ms)
                            .data_attr("key", key)
                            .data_attr("mirror", mirror)
                            .data_attr("bucket", bucket.to_string())
                            .data_attr("base-r", fmt_num(r))
                            .data_attr("highlight-r", fmt_num(self.sizes.highlight())),
                    );
                }
                RenderAs::Label => {
                    self.scene.push(
                        Element::text(cx, cy, format!("{:.2}", lv))
                            .id(glyph_id(pair.i, pair.j))
                            .class("tcorr")
                            .anchor(Anchor::Middle)
                            .font_size(12.0)
                            .fill(self.colors.color(lv))
                            .fill_opacity(1.0)
                            .opacity(1.0)
                            .transition(config.enter_duration_ms)
                            .data_attr("key", key)
                            .data_attr("mirror", mirror)
                            .data_attr("bucket", bucket.to_string()),
                    );
                }
            }
        }
    }

    fn push_colorbar(&mut self, config: &PlotConfig, method: CorrMethod) {
        let gw = config.grid_width();
        let gh = config.grid_height();
        let m = &config.margins;
        let bar_x = m.left + gw + config.colorbar_padding / 2.0;
        let swatch_h = gh / BUCKETS as f64;

        self.scene.push(
            Element::rect(bar_x, m.top, config.colorbar_width, gh)
                .id("colorbar_border")
                .fill("none")
                .stroke("#000")
                .stroke_width(2.0)
                .crisp_edges(),
        );

        // Stacked bottom to top: bucket 0 (-1) sits at the bottom.
        for bucket in 0..self.colors.bucket_count() {
            let y = m.top + gh - (bucket as f64 + 1.0) * swatch_h;
            self.scene.push(
                Element::rect(bar_x, y, config.colorbar_width, swatch_h)
                    .id(format!("swatch_{}", bucket))
                    .class("colorbar")
                    .fill(self.colors.color_at(bucket))
                    .fill_opacity(1.0)
                    .transition(config.enter_duration_ms)
                    .data_attr("bucket", bucket.to_string()),
            );
        }

        let axis_x = bar_x + config.colorbar_width;
        let axis_scale = LinearScale::new((1.0, -1.0), (0.0, gh));
        self.scene
            .push(grid_stroke(axis_x, m.top, axis_x, m.top + gh, "color-axis"));
        let decimals = axis_scale.tick_decimals(10);
        for tick in axis_scale.ticks(10) {
            let ty = m.top + axis_scale.scale(tick);
            self.scene
                .push(grid_stroke(axis_x, ty, axis_x + 6.0, ty, "color-axis"));
            self.scene.push(
                Element::text(axis_x + 9.0, ty, format!("{:.*}", decimals, tick))
                    .class("color-axis")
                    .anchor(Anchor::Start)
                    .dy(".32em")
                    .font_size(12.0),
            );
        }

        let caption_x = bar_x + config.colorbar_width + 2.0 * config.colorbar_padding;
        self.scene.push(
            Element::text(caption_x, m.top + gh / 2.0, method.caption())
                .id("colorbar_caption")
                .anchor(Anchor::Middle)
                .rotate(-90.0)
                .dy("1.4em")
                .font_size(12.0),
        );
    }

    /// Emphasizes the hovered pair's circle and its mirror label and dims
    /// the colorbar swatch of the active bucket.
    pub fn hover_pair(&mut self, config: &PlotConfig, pair: &PairDatum, method: CorrMethod) {
        let duration = config.hover_duration_ms;
        let highlight = self.sizes.highlight();
        for id in [glyph_id(pair.i, pair.j), glyph_id(pair.j, pair.i)] {
            if let Some(el) = self.scene.find_mut(&id) {
                if el.class.as_deref() == Some("corr") {
                    el.set_radius(highlight);
                } else {
                    el.set_font_size(18.0);
                }
                el.fill_opacity = Some(0.9);
                el.transition_ms = Some(duration);
            }
        }
        let bucket = self.colors.bucket(label_value(pair, method));
        if let Some(swatch) = self.scene.find_mut(&format!("swatch_{}", bucket)) {
            swatch.fill_opacity = Some(0.2);
            swatch.transition_ms = Some(duration);
        }
    }

    /// Restores the hovered pair and its swatch to the active encoding.
    pub fn unhover_pair(&mut self, config: &PlotConfig, pair: &PairDatum, method: CorrMethod) {
        let duration = config.hover_duration_ms;
        let radius = self
            .sizes
            .radius(circle_value(pair, method, config.spearman_circle_prescale));
        for id in [glyph_id(pair.i, pair.j), glyph_id(pair.j, pair.i)] {
            if let Some(el) = self.scene.find_mut(&id) {
                if el.class.as_deref() == Some("corr") {
                    el.set_radius(radius);
                } else {
                    el.set_font_size(12.0);
                }
                el.fill_opacity = Some(1.0);
                el.transition_ms = Some(duration);
            }
        }
        let bucket = self.colors.bucket(label_value(pair, method));
        if let Some(swatch) = self.scene.find_mut(&format!("swatch_{}", bucket)) {
            swatch.fill_opacity = Some(1.0);
            swatch.transition_ms = Some(duration);
        }
    }

    /// Reverse interaction: hovering a swatch emphasizes every glyph whose
    /// active value falls in that bucket. No fan-out to the other panels.
    pub fn hover_swatch(
        &mut self,
        config: &PlotConfig,
        bucket: usize,
        pairs: &[PairDatum],
        method: CorrMethod,
    ) {
        let duration = config.hover_duration_ms;
        if let Some(swatch) = self.scene.find_mut(&format!("swatch_{}", bucket)) {
            swatch.fill_opacity = Some(0.2);
            swatch.transition_ms = Some(duration);
        } else {
            return;
        }
        let highlight = self.sizes.highlight();
        for pair in pairs {
            if self.colors.bucket(label_value(pair, method)) != bucket {
                continue;
            }
            if let Some(el) = self.scene.find_mut(&glyph_id(pair.i, pair.j)) {
                if el.class.as_deref() == Some("corr") {
                    el.set_radius(highlight);
                } else {
                    el.set_font_size(18.0);
                }
                el.fill_opacity = Some(0.9);
                el.transition_ms = Some(duration);
            }
        }
    }

    pub fn leave_swatch(
        &mut self,
        config: &PlotConfig,
        bucket: usize,
        pairs: &[PairDatum],
        method: CorrMethod,
    ) {
        let duration = config.hover_duration_ms;
        if let Some(swatch) = self.scene.find_mut(&format!("swatch_{}", bucket)) {
            swatch.fill_opacity = Some(1.0);
            swatch.transition_ms = Some(duration);
        } else {
            return;
        }
        for pair in pairs {
            if self.colors.bucket(label_value(pair, method)) != bucket {
                continue;
            }
            let radius = self
                .sizes
                .radius(circle_value(pair, method, config.spearman_circle_prescale));
            if let Some(el) = self.scene.find_mut(&glyph_id(pair.i, pair.j)) {
                if el.class.as_deref() == Some("corr") {
                    el.set_radius(radius);
                } else {
                    el.set_font_size(12.0);
                }
                el.fill_opacity = Some(1.0);
                el.transition_ms = Some(duration);
            }
        }
    }

    /// Re-encodes every glyph from the other matrix and swaps the colorbar
    /// caption. Radii, fills, label texts and the hover metadata all move
    /// together with the rescale duration.
    pub fn change_method(&mut self, config: &PlotConfig, pairs: &[PairDatum], method: CorrMethod) {
        let duration = config.rescale_duration_ms;
        for pair in pairs {
            let lv = label_value(pair, method);
            let bucket = self.colors.bucket(lv);
            let id = glyph_id(pair.i, pair.j);
            match pair.render_as {
                RenderAs::Circle => {
                    let cv = circle_value(pair, method, config.spearman_circle_prescale);
                    let radius = self.sizes.radius(cv);
                    let fill = self.colors.color(cv).to_string();
                    if let Some(el) = self.scene.find_mut(&id) {
                        el.set_radius(radius);
                        el.fill = Some(fill);
                        el.transition_ms = Some(duration);
                        el.set_data_attr("bucket", bucket.to_string());
                        el.set_data_attr("base-r", fmt_num(radius));
                    }
                }
                RenderAs::Label => {
                    let fill = self.colors.color(lv).to_string();
                    if let Some(el) = self.scene.find_mut(&id) {
                        el.set_text(format!("{:.2}", lv));
                        el.fill = Some(fill);
                        el.transition_ms = Some(duration);
                        el.set_data_attr("bucket", bucket.to_string());
                    }
                }
            }
        }
        if let Some(caption) = self.scene.find_mut("colorbar_caption") {
            caption.set_text(method.caption());
            caption.transition_ms = Some(duration);
        }
    }
}

impl Default for HeatmapPanel {
    fn default() -> Self {
        HeatmapPanel::new()
    }
}

fn grid_stroke(x1: f64, y1: f64, x2: f64, y2: f64, class: &str) -> Element {
    Element::line(x1, y1, x2, y2)
        .class(class)
        .stroke("black")
        .stroke_opacity(0.2)
        .crisp_edges()
}
