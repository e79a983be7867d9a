use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::data::{DataBundle, PairDatum};
use crate::error::PlotError;
use crate::heatmap::HeatmapPanel;
use crate::progress::RenderProgress;
use crate::scale::ColorScale;
use crate::scatter::ScatterPanel;
use crate::venn::VennPanel;
use crate::view::{CorrMethod, CorrView, PlotConfig};

/// Prerendered hover panels for one ordered pair. `scatter` is absent when
/// either series is missing; the page then keeps the current scatter panel.
#[derive(Debug, Serialize)]
struct PairPanels {
    scatter: Option<String>,
    venn: String,
}

#[derive(Debug, Serialize)]
struct HeatmapVariants {
    pearson: String,
    spearman: String,
}

#[derive(Debug, Serialize)]
struct PageData {
    heatmaps: HeatmapVariants,
    panels: BTreeMap<String, PairPanels>,
}

/// Builds the self-contained interactive page: both heatmap encodings plus
/// the post-hover scatter and overlap panels of every ordered pair,
/// prerendered in parallel and embedded as a JSON payload. The page script
/// only swaps prerendered markup and flips the hover metadata already baked
/// into the glyph attributes.
pub fn interactive_page(view: &CorrView) -> Result<String, PlotError> {
    let config = view.config();
    let bundle = view.bundle();
    let pairs = view.pairs();

    let mut pearson = HeatmapPanel::new();
    pearson.render(config, &bundle.axes, pairs, CorrMethod::Pearson);
    let mut spearman = HeatmapPanel::new();
    spearman.render(config, &bundle.axes, pairs, CorrMethod::Spearman);

    let panels = prerender_panels(config, bundle, pairs, pearson.colors())?;

    let mut initial_scatter = ScatterPanel::new();
    initial_scatter.render(config);
    let mut initial_venn = VennPanel::new();
    initial_venn.render(config);
    let initial_heatmap = match view.method() {
        CorrMethod::Pearson => pearson.svg(),
        CorrMethod::Spearman => spearman.svg(),
    };

    let data = PageData {
        heatmaps: HeatmapVariants {
            pearson: pearson.svg(),
            spearman: spearman.svg(),
        },
        panels,
    };
    // "</" must not appear inside the inline <script> payload.
    let payload = serde_json::to_string(&data)?.replace("</", "<\\/");

    Ok(PAGE_TEMPLATE
        .replace("__FONT_FAMILY__", &config.font_family)
        .replace("__HEATMAP_SVG__", &initial_heatmap)
        .replace("__SCATTER_SVG__", &initial_scatter.svg())
        .replace("__VENN_SVG__", &initial_venn.svg())
        .replace("__ACTIVE_METHOD__", &view.method().to_string())
        .replace("__PANEL_JSON__", &payload))
}

fn prerender_panels(
    config: &PlotConfig,
    bundle: &DataBundle,
    pairs: &[PairDatum],
    colors: &ColorScale,
) -> Result<BTreeMap<String, PairPanels>, PlotError> {
    let progress = RenderProgress::new(pairs.len());
    let panels = pairs
        .par_iter()
        .map(|pair| {
            let key = format!("{}|{}", pair.x_id, pair.y_id);
            let entry = prerender_pair(config, bundle, pair, colors);
            progress.tick()?;
            Ok((key, entry))
        })
        .collect::<Result<BTreeMap<_, _>, PlotError>>()?;
    progress.finish()?;
    Ok(panels)
}

/// Renders the scatter and overlap panels exactly as a live hover on this
/// pair would leave them.
fn prerender_pair(
    config: &PlotConfig,
    bundle: &DataBundle,
    pair: &PairDatum,
    colors: &ColorScale,
) -> PairPanels {
    let scatter = match (bundle.series_for(&pair.x_id), bundle.series_for(&pair.y_id)) {
        (Some(x), Some(y)) => {
            let mut panel = ScatterPanel::new();
            panel.render(config);
            panel.hide_info_box(config);
            panel.update(config, x, y);
            Some(panel.svg())
        }
        _ => None,
    };

    let mut venn = VennPanel::new();
    match bundle.overlap_for(&pair.x_id, &pair.y_id) {
        Some(record) => venn.update(config, &record, colors),
        None => venn.clear(config),
    }

    PairPanels {
        scatter,
        venn: venn.svg(),
    }
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Phenotype Correlations</title>
<style>
body {
  font-family: __FONT_FAMILY__;
  margin: 20px;
}
#layout {
  display: flex;
  gap: 20px;
}
#controls {
  margin-bottom: 10px;
}
#controls select {
  font-family: inherit;
}
svg {
  display: block;
}
.corr, .tcorr, .colorbar {
  cursor: pointer;
}
</style>
</head>
<body>
<div id="controls">
  <label for="method">Correlation method</label>
  <select id="method">
    <option value="pearson">Pearson</option>
    <option value="spearman">Spearman</option>
  </select>
</div>
<div id="layout">
  <div id="heatmap">
__HEATMAP_SVG__
  </div>
  <div id="side">
    <div id="scatter">
__SCATTER_SVG__
    </div>
    <div id="venn">
__VENN_SVG__
    </div>
  </div>
</div>
<script id="panel-data" type="application/json">__PANEL_JSON__</script>
<script>
var data = JSON.parse(document.getElementById('panel-data').textContent);
var heatmapBox = document.getElementById('heatmap');
var scatterBox = document.getElementById('scatter');
var vennBox = document.getElementById('venn');
var methodSelect = document.getElementById('method');
methodSelect.value = '__ACTIVE_METHOD__';

function setGlyph(el, on) {
  if (el.tagName === 'circle') {
    el.setAttribute('r', on ? el.dataset.highlightR : el.dataset.baseR);
  } else {
    el.style.fontSize = on ? '18px' : '12px';
  }
  el.style.fillOpacity = on ? 0.9 : 1;
}

function setSwatch(bucket, on) {
  var swatch = heatmapBox.querySelector('#swatch_' + bucket);
  if (swatch) {
    swatch.style.fillOpacity = on ? 0.2 : 1;
  }
}

function emphasizePair(glyph, on) {
  setGlyph(glyph, on);
  var mirror = heatmapBox.querySelector('#' + glyph.dataset.mirror);
  if (mirror) {
    setGlyph(mirror, on);
  }
  setSwatch(glyph.dataset.bucket, on);
}

function emphasizeBucket(swatch, on) {
  setSwatch(swatch.dataset.bucket, on);
  var glyphs = heatmapBox.querySelectorAll('.corr, .tcorr');
  for (var k = 0; k < glyphs.length; k++) {
    if (glyphs[k].dataset.bucket === swatch.dataset.bucket) {
      setGlyph(glyphs[k], on);
    }
  }
}

heatmapBox.addEventListener('mouseover', function (ev) {
  var glyph = ev.target.closest('.corr, .tcorr');
  if (glyph) {
    emphasizePair(glyph, true);
    var entry = data.panels[glyph.dataset.key];
    if (entry) {
      if (entry.scatter !== null) {
        scatterBox.innerHTML = entry.scatter;
      }
      vennBox.innerHTML = entry.venn;
    }
    return;
  }
  var swatch = ev.target.closest('.colorbar');
  if (swatch) {
    emphasizeBucket(swatch, true);
  }
});

heatmapBox.addEventListener('mouseout', function (ev) {
  var glyph = ev.target.closest('.corr, .tcorr');
  if (glyph) {
    emphasizePair(glyph, false);
    return;
  }
  var swatch = ev.target.closest('.colorbar');
  if (swatch) {
    emphasizeBucket(swatch, false);
  }
});

methodSelect.addEventListener('change', function () {
  heatmapBox.innerHTML = data.heatmaps[methodSelect.value];
});
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AxisEntry, OverlapRecord, ScatterSeries};

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

    fn bundle() -> DataBundle {
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
                series("p1", "plant height", &["S1", "S2"], &[10.0, 12.0]),
                series("p2", "seed weight", &["S1", "S2"], &[3.0, 4.0]),
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

    fn page() -> String {
        let mut view = CorrView::new(PlotConfig::default(), bundle()).unwrap();
        view.render();
        interactive_page(&view).unwrap()
    }

    fn payload_of(page: &str) -> serde_json::Value {
        let marker = r#"<script id="panel-data" type="application/json">"#;
        let start = page.find(marker).unwrap() + marker.len();
        let end = start + page[start..].find("</script>").unwrap();
        let payload = &page[start..end];
        assert!(
            !payload.contains("</"),
            "payload must escape closing tags"
        );
        serde_json::from_str(payload).unwrap()
    }

    #[test]
    fn test_page_embeds_both_heatmap_variants() {
        let page = page();
        assert!(page.contains("Pearson Correlation"));
        assert!(page.contains("Spearman Correlation"));
        assert!(page.contains("methodSelect.value = 'pearson';"));
    }

    #[test]
    fn test_payload_covers_every_ordered_pair() {
        let page = page();
        let payload = payload_of(&page);
        let panels = payload["panels"].as_object().unwrap();
        // Three axes, no NaN: six ordered pairs.
        assert_eq!(panels.len(), 6);
        assert!(panels.contains_key("p1|p2"));
        assert!(panels.contains_key("p2|p1"));
        assert!(payload["heatmaps"]["spearman"]
            .as_str()
            .unwrap()
            .contains("Spearman Correlation"));
    }

    #[test]
    fn test_prerendered_scatter_is_post_hover() {
        let page = page();
        let payload = payload_of(&page);
        let svg = payload["panels"]["p1|p2"]["scatter"].as_str().unwrap();
        assert!(svg.contains("plant height"));
        assert!(svg.contains(r#"id="pt_0""#));
        // The info box is faded out, not removed.
        assert!(svg.contains(r#"id="info_box_rect""#));
        assert!(svg.contains("opacity: 0;"));
    }

    #[test]
    fn test_missing_series_yields_null_scatter_and_cleared_venn() {
        let page = page();
        let payload = payload_of(&page);
        let entry = &payload["panels"]["p3|p2"];
        assert!(entry["scatter"].is_null());
        // No overlap record for this pair either.
        assert!(!entry["venn"].as_str().unwrap().contains("venn_a"));
    }

    #[test]
    fn test_initial_method_follows_the_view() {
        let mut view = CorrView::new(PlotConfig::default(), bundle()).unwrap();
        view.render();
        view.change_corr_method(CorrMethod::Spearman);
        let page = interactive_page(&view).unwrap();
        assert!(page.contains("methodSelect.value = 'spearman';"));
    }

    #[test]
    fn test_page_has_no_external_resources() {
        let page = page();
        assert!(!page.contains("<script src"));
        assert!(!page.contains("<link"));
    }
}
