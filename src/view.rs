use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{DataBundle, PairDatum};
use crate::error::PlotError;
use crate::heatmap::HeatmapPanel;
use crate::scatter::ScatterPanel;
use crate::venn::VennPanel;

/// Panel margins in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Margins {
            top,
            bottom,
            left,
            right,
        }
    }
}

/// Which precomputed matrix drives the glyph encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrMethod {
    Pearson,
    Spearman,
}

impl CorrMethod {
    /// Colorbar caption for the method.
    pub fn caption(&self) -> &'static str {
        match self {
            CorrMethod::Pearson => "Pearson Correlation",
            CorrMethod::Spearman => "Spearman Correlation",
        }
    }
}

impl std::str::FromStr for CorrMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pearson" => Ok(CorrMethod::Pearson),
            "spearman" => Ok(CorrMethod::Spearman),
            _ => Err(format!("Unknown correlation method: {}", s)),
        }
    }
}

impl fmt::Display for CorrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrMethod::Pearson => write!(f, "pearson"),
            CorrMethod::Spearman => write!(f, "spearman"),
        }
    }
}

/// Presentation constants for the three panels. Immutable once a view is
/// built. `Default` carries the reference layout; individual values can be
/// overridden through the builder methods, a TOML file or `PHENOCORR_`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    pub margins_scatter: Margins,
    pub colorbar_width: f64,
    pub colorbar_padding: f64,
    pub font_family: String,
    pub enter_duration_ms: u32,
    pub hover_duration_ms: u32,
    pub hide_duration_ms: u32,
    pub rescale_duration_ms: u32,
    /// Axis padding as a fraction of the joined minimum's magnitude.
    pub scatter_pad_ratio: f64,
    /// Multiplier applied to spearman values before the circle radius and
    /// circle fill lookups. The upstream behavior is 2.0, which makes the
    /// circles disagree with their mirror labels; set 1.0 for consistent
    /// encodings.
    pub spearman_circle_prescale: f64,
    /// Optional 20-color palette override, negative to positive.
    pub palette: Option<Vec<String>>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            width: 500.0,
            height: 610.0,
            margins: Margins::new(100.0, 25.0, 120.0, 80.0),
            margins_scatter: Margins::new(10.0, 50.0, 50.0, 20.0),
            colorbar_width: 25.0,
            colorbar_padding: 10.0,
            font_family: "Myriad Pro, Arial, Garuda, Garuda, Helvetica, Tahoma, sans-serif"
                .to_string(),
            enter_duration_ms: 1500,
            hover_duration_ms: 100,
            hide_duration_ms: 200,
            rescale_duration_ms: 500,
            scatter_pad_ratio: 0.1,
            spearman_circle_prescale: 2.0,
            palette: None,
        }
    }
}

impl PlotConfig {
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_margins_scatter(mut self, margins: Margins) -> Self {
        self.margins_scatter = margins;
        self
    }

    pub fn with_colorbar_width(mut self, width: f64) -> Self {
        self.colorbar_width = width;
        self
    }

    pub fn with_colorbar_padding(mut self, padding: f64) -> Self {
        self.colorbar_padding = padding;
        self
    }

    pub fn with_font_family(mut self, font_family: impl Into<String>) -> Self {
        self.font_family = font_family.into();
        self
    }

    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_scatter_pad_ratio(mut self, ratio: f64) -> Self {
        self.scatter_pad_ratio = ratio;
        self
    }

    pub fn with_spearman_circle_prescale(mut self, prescale: f64) -> Self {
        self.spearman_circle_prescale = prescale;
        self
    }

    /// Heatmap grid width inside the margins.
    pub fn grid_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    pub fn grid_height(&self) -> f64 {
        self.height - self.margins.top - self.margins.bottom
    }

    pub fn scatter_width(&self) -> f64 {
        self.width
    }

    pub fn scatter_height(&self) -> f64 {
        self.height * 3.0 / 6.0
    }

    pub fn scatter_inner_width(&self) -> f64 {
        self.scatter_width() - self.margins_scatter.left - self.margins_scatter.right
    }

    pub fn scatter_inner_height(&self) -> f64 {
        self.scatter_height() - self.margins_scatter.top - self.margins_scatter.bottom
    }

    pub fn venn_height(&self) -> f64 {
        self.height / 3.0
    }

    /// Loads the configuration, lowest priority first: built-in defaults,
    /// then the optional TOML file, then `PHENOCORR_` environment variables
    /// (nested keys separated by `__`).
    pub fn load(path: Option<&Path>) -> Result<Self, PlotError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("PHENOCORR").separator("__"));
        let config: PlotConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PlotError> {
        let config: PlotConfig = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

/// The linked-view controller. Owns the validated bundle, the derived pair
/// set and the three panel scenes; every interaction is a synchronous
/// method call that runs to completion, so the last hover always wins.
/// Heatmap hovers fan out to the scatter and overlap panels; nothing flows
/// back.
pub struct CorrView {
    config: PlotConfig,
    bundle: DataBundle,
    pairs: Vec<PairDatum>,
    method: CorrMethod,
    heatmap: HeatmapPanel,
    scatter: ScatterPanel,
    venn: VennPanel,
    hovered: Option<usize>,
    rendered: bool,
}

impl CorrView {
    /// Validates the bundle and derives the pair set. The panels stay
    /// empty until `render`.
    pub fn new(config: PlotConfig, bundle: DataBundle) -> Result<Self, PlotError> {
        bundle.validate()?;
        let pairs = bundle.derive_pairs();
        Ok(CorrView {
            config,
            bundle,
            pairs,
            method: CorrMethod::Pearson,
            heatmap: HeatmapPanel::new(),
            scatter: ScatterPanel::new(),
            venn: VennPanel::new(),
            hovered: None,
            rendered: false,
        })
    }

    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    pub fn bundle(&self) -> &DataBundle {
        &self.bundle
    }

    pub fn pairs(&self) -> &[PairDatum] {
        &self.pairs
    }

    pub fn method(&self) -> CorrMethod {
        self.method
    }

    /// Creates the three panel surfaces. Calling it again is a no-op, so
    /// existing scene state survives repeated renders.
    pub fn render(&mut self) {
        if self.rendered {
            return;
        }
        self.heatmap
            .render(&self.config, &self.bundle.axes, &self.pairs, self.method);
        self.scatter.render(&self.config);
        self.venn.render(&self.config);
        self.rendered = true;
    }

    /// Hover on the glyph for the ordered pair (x, y). Emphasizes the
    /// heatmap cell and its mirror, hides the scatter info box and fans the
    /// pair out to the scatter and overlap panels. Unknown phenotype ids
    /// are an error; a pair excluded for NaN is silently ignored.
    pub fn hover_pair(&mut self, x_id: &str, y_id: &str) -> Result<(), PlotError> {
        self.render();
        if self.bundle.axis_for(x_id).is_none() {
            return Err(PlotError::UnknownPhenotype(x_id.to_string()));
        }
        if self.bundle.axis_for(y_id).is_none() {
            return Err(PlotError::UnknownPhenotype(y_id.to_string()));
        }
        let idx = match self
            .pairs
            .iter()
            .position(|p| p.x_id == x_id && p.y_id == y_id)
        {
            Some(idx) => idx,
            None => return Ok(()),
        };

        if let Some(prev) = self.hovered {
            if prev != idx {
                self.heatmap
                    .unhover_pair(&self.config, &self.pairs[prev], self.method);
            }
        }
        self.heatmap
            .hover_pair(&self.config, &self.pairs[idx], self.method);
        self.scatter.hide_info_box(&self.config);

        match (self.bundle.series_for(x_id), self.bundle.series_for(y_id)) {
            (Some(x), Some(y)) => self.scatter.update(&self.config, x, y),
            // A missing series leaves the scatter panel untouched.
            _ => {}
        }

        match self.bundle.overlap_for(x_id, y_id) {
            Some(record) => self
                .venn
                .update(&self.config, &record, self.heatmap.colors()),
            None => self.venn.clear(&self.config),
        }

        self.hovered = Some(idx);
        Ok(())
    }

    /// Hover addressed by grid position instead of ids. Positions without
    /// a drawn glyph are ignored.
    pub fn hover_cell(&mut self, i: usize, j: usize) -> Result<(), PlotError> {
        let ids = self
            .pairs
            .iter()
            .find(|p| (p.i, p.j) == (i, j))
            .map(|p| (p.x_id.clone(), p.y_id.clone()));
        match ids {
            Some((x_id, y_id)) => self.hover_pair(&x_id, &y_id),
            None => Ok(()),
        }
    }

    /// Reverses the transient hover styling. The scatter and overlap
    /// panels keep their last content.
    pub fn mouse_out(&mut self) {
        if let Some(idx) = self.hovered.take() {
            self.heatmap
                .unhover_pair(&self.config, &self.pairs[idx], self.method);
        }
    }

    pub fn hover_swatch(&mut self, bucket: usize) {
        self.render();
        self.heatmap
            .hover_swatch(&self.config, bucket, &self.pairs, self.method);
    }

    pub fn leave_swatch(&mut self, bucket: usize) {
        self.render();
        self.heatmap
            .leave_swatch(&self.config, bucket, &self.pairs, self.method);
    }

    /// Switches the active matrix and re-encodes every glyph.
    pub fn change_corr_method(&mut self, method: CorrMethod) {
        self.render();
        self.method = method;
        self.heatmap.change_method(&self.config, &self.pairs, method);
    }

    pub fn heatmap_svg(&self) -> String {
        self.heatmap.svg()
    }

    pub fn scatter_svg(&self) -> String {
        self.scatter.svg()
    }

    pub fn venn_svg(&self) -> String {
        self.venn.svg()
    }

    pub fn heatmap_panel(&self) -> &HeatmapPanel {
        &self.heatmap
    }

    pub fn scatter_panel(&self) -> &ScatterPanel {
        &self.scatter
    }

    pub fn venn_panel(&self) -> &VennPanel {
        &self.venn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AxisEntry, OverlapRecord, ScatterSeries};
    use crate::heatmap::glyph_id;
    use crate::scale::BUCKETS;

    fn axis(id: &str, label: &str, index: usize) -> AxisEntry {
        AxisEntry {
            phenotype_id: id.to_string(),
            label: label.to_string(),
            index,
        }
    }

    fn series(id: &str, label: &str, samples: &[&str], values: &[f64]) -> ScatterSeries {
        ScatterSeries {
            phenotype_id: id.to_string(),
            label: label.to_string(),
            sample_ids: samples.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    fn full_bundle() -> DataBundle {
        DataBundle::new()
            .axes_data(vec![
                axis("p1", "plant height", 0),
                axis("p2", "seed weight", 1),
                axis("p3", "flowering time", 2),
            ])
            .data_matrix(vec![
                vec![1.0, 0.8, -0.3],
                vec![0.8, 1.0, 0.5],
                vec![-0.3, 0.5, 1.0],
            ])
            .spear_matrix(vec![
                vec![1.0, 0.4, -0.2],
                vec![0.4, 1.0, 0.3],
                vec![-0.2, 0.3, 1.0],
            ])
            .data_scatter(vec![
                series("p1", "plant height", &["S1", "S2", "S3"], &[10.0, 12.0, 14.0]),
                series("p2", "seed weight", &["S1", "S2", "S3"], &[3.0, 4.0, 5.0]),
            ])
            .data_venn(vec![OverlapRecord {
                label_a_id: "p1".to_string(),
                label_b_id: "p2".to_string(),
                label_a: "plant height".to_string(),
                label_b: "seed weight".to_string(),
                a: 40,
                b: 30,
                c: 12,
            }])
    }

    fn view() -> CorrView {
        let mut v = CorrView::new(PlotConfig::default(), full_bundle()).unwrap();
        v.render();
        v
    }

    #[test]
    fn test_method_parsing_is_strict() {
        assert_eq!("Pearson".parse::<CorrMethod>(), Ok(CorrMethod::Pearson));
        assert_eq!("SPEARMAN".parse::<CorrMethod>(), Ok(CorrMethod::Spearman));
        assert!("kendall".parse::<CorrMethod>().is_err());
    }

    #[test]
    fn test_config_defaults_match_reference_layout() {
        let config = PlotConfig::default();
        assert_eq!(config.width, 500.0);
        assert_eq!(config.height, 610.0);
        assert_eq!(config.grid_width(), 300.0);
        assert_eq!(config.grid_height(), 485.0);
        assert_eq!(config.scatter_height(), 305.0);
        assert_eq!(config.scatter_inner_width(), 430.0);
        assert_eq!(config.scatter_inner_height(), 245.0);
        assert_eq!(config.spearman_circle_prescale, 2.0);
    }

    #[test]
    fn test_config_from_toml_overrides_selected_keys() {
        let config = PlotConfig::from_toml_str(
            r#"
            width = 600.0
            spearman_circle_prescale = 1.0
            [margins]
            top = 80.0
            bottom = 20.0
            left = 100.0
            right = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.width, 600.0);
        assert_eq!(config.height, 610.0);
        assert_eq!(config.margins.top, 80.0);
        assert_eq!(config.spearman_circle_prescale, 1.0);
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut v = CorrView::new(PlotConfig::default(), full_bundle()).unwrap();
        v.render();
        let count = v.heatmap_panel().scene().elements.len();
        v.hover_pair("p1", "p2").unwrap();
        v.render();
        assert_eq!(v.heatmap_panel().scene().elements.len(), count);
        // The hover survives the repeated render call.
        assert!(v.venn_panel().scene().find("venn_a").is_some());
    }

    #[test]
    fn test_hover_fans_out_to_both_panels() {
        let mut v = view();
        v.hover_pair("p1", "p2").unwrap();

        // p1 is the column of the (1,0) circle in this bundle.
        let circle = v.heatmap_panel().scene().find("glyph_1_0").unwrap();
        assert_eq!(circle.fill_opacity, Some(0.9));
        assert_eq!(
            v.scatter_panel().scene().with_class("pp").count(),
            3
        );
        assert_eq!(
            v.scatter_panel()
                .scene()
                .find("scatter_x_label")
                .unwrap()
                .text_content(),
            Some("plant height")
        );
        assert!(v.venn_panel().scene().find("venn_a").is_some());
        assert_eq!(
            v.scatter_panel()
                .scene()
                .find("info_box_rect")
                .unwrap()
                .opacity,
            Some(0.0)
        );
    }

    #[test]
    fn test_mouse_out_restores_heatmap_but_keeps_panels() {
        let mut v = view();
        v.hover_pair("p1", "p2").unwrap();
        v.mouse_out();

        let circle = v.heatmap_panel().scene().find("glyph_1_0").unwrap();
        assert_eq!(circle.fill_opacity, Some(1.0));
        // Scatter points and venn content stay.
        assert_eq!(v.scatter_panel().scene().with_class("pp").count(), 3);
        assert!(v.venn_panel().scene().find("venn_a").is_some());
    }

    #[test]
    fn test_last_hover_wins() {
        let mut direct = view();
        direct.hover_pair("p3", "p2").unwrap();

        let mut chained = view();
        chained.hover_pair("p1", "p2").unwrap();
        chained.hover_pair("p3", "p2").unwrap();

        for pair in chained.pairs().to_vec() {
            let id = glyph_id(pair.i, pair.j);
            let a = chained.heatmap_panel().scene().find(&id).unwrap();
            let b = direct.heatmap_panel().scene().find(&id).unwrap();
            assert_eq!(a.radius(), b.radius(), "radius for {}", id);
            assert_eq!(a.fill_opacity, b.fill_opacity, "opacity for {}", id);
            assert_eq!(a.text_font_size(), b.text_font_size(), "font for {}", id);
        }
    }

    #[test]
    fn test_unknown_phenotype_is_an_error() {
        let mut v = view();
        assert!(matches!(
            v.hover_pair("p1", "p9").unwrap_err(),
            PlotError::UnknownPhenotype(id) if id == "p9"
        ));
    }

    #[test]
    fn test_missing_series_leaves_scatter_untouched() {
        let mut v = view();
        // p3 has no scatter series; the venn record is also absent.
        v.hover_pair("p3", "p2").unwrap();

        assert_eq!(v.scatter_panel().scene().with_class("pp").count(), 0);
        assert_eq!(
            v.scatter_panel()
                .scene()
                .find("scatter_x_label")
                .unwrap()
                .text_content(),
            Some("")
        );
        // Lookup miss clears the overlap panel.
        assert!(v.venn_panel().scene().elements.is_empty());
    }

    #[test]
    fn test_hover_cell_matches_hover_pair() {
        let mut by_cell = view();
        by_cell.hover_cell(1, 0).unwrap();
        let mut by_ids = view();
        by_ids.hover_pair("p1", "p2").unwrap();

        assert_eq!(
            by_cell.heatmap_panel().scene().find("glyph_1_0").unwrap(),
            by_ids.heatmap_panel().scene().find("glyph_1_0").unwrap()
        );
        // Out-of-grid positions are ignored.
        by_cell.hover_cell(7, 9).unwrap();
    }

    #[test]
    fn test_change_method_updates_caption_and_state() {
        let mut v = view();
        v.change_corr_method(CorrMethod::Spearman);
        assert_eq!(v.method(), CorrMethod::Spearman);
        assert_eq!(
            v.heatmap_panel()
                .scene()
                .find("colorbar_caption")
                .unwrap()
                .text_content(),
            Some("Spearman Correlation")
        );
    }

    #[test]
    fn test_swatch_hover_round_trip() {
        let mut v = view();
        let bucket = v.heatmap_panel().colors().bucket(0.8);
        assert!(bucket < BUCKETS);
        v.hover_swatch(bucket);
        assert_eq!(
            v.heatmap_panel()
                .scene()
                .find(&format!("swatch_{}", bucket))
                .unwrap()
                .fill_opacity,
            Some(0.2)
        );
        v.leave_swatch(bucket);
        assert_eq!(
            v.heatmap_panel()
                .scene()
                .find(&format!("swatch_{}", bucket))
                .unwrap()
                .fill_opacity,
            Some(1.0)
        );
    }

    #[test]
    fn test_validation_runs_at_construction() {
        let bundle = full_bundle().data_matrix(vec![vec![1.0, 0.5], vec![0.5]]);
        assert!(matches!(
            CorrView::new(PlotConfig::default(), bundle),
            Err(PlotError::MatrixShape { .. })
        ));
    }
}
