//! Diagnostic reports for elicitation rounds.
//!
//! Reporting is a side channel: a [`DiagnosticsSink`] receives each round's
//! decision together with its intermediate quantities, after the decision has
//! been made. Sink failures are logged by the elicitor and never change a
//! decision.
//!
//! [`HtmlReportSink`] writes one self-contained HTML page per round with
//! embedded [Plotly.js](https://plotly.com/javascript/) charts:
//!
//! | Chart | Description |
//! |---|---|
//! | **Expected improvement** | Mean EI per reachable candidate over the per-sample EI curves, chosen candidate highlighted |
//! | **Utility at candidates** | Sample-averaged posterior mean with a two-sigma band |
//! | **Best so far** | Highest predicted training utility under each posterior sample |
//! | **Hyperparameter traces** | Every posterior draw of every GP hyperparameter |
//! | **Chain autocorrelation** | Autocorrelation by lag of each hyperparameter chain |
//! | **Duel history** | Previous vs current state of each duel, colored by response |
//!
//! An internet connection is needed on first load to fetch `Plotly.js` from a
//! CDN.

use core::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::acquisition::{AcquisitionResult, Diagnostics};
use crate::error::{Error, Result};

/// Receives per-round diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    /// Report one decided round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Diagnostics`] when the report cannot be produced.
    fn report(&self, result: &AcquisitionResult, diagnostics: &Diagnostics<'_>) -> Result<()>;
}

/// Discards all diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn report(&self, _result: &AcquisitionResult, _diagnostics: &Diagnostics<'_>) -> Result<()> {
        Ok(())
    }
}

/// Writes `{dir}/T{trial}/eui_{iteration}.html` for every round.
#[derive(Clone, Debug)]
pub struct HtmlReportSink {
    dir: PathBuf,
}

impl HtmlReportSink {
    /// Creates a sink writing below `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File the report of one round is written to.
    #[must_use]
    pub fn path_for(&self, trial: usize, iteration: usize) -> PathBuf {
        self.dir
            .join(format!("T{trial}"))
            .join(format!("eui_{iteration}.html"))
    }
}

impl DiagnosticsSink for HtmlReportSink {
    fn report(&self, result: &AcquisitionResult, diagnostics: &Diagnostics<'_>) -> Result<()> {
        let path = self.path_for(diagnostics.trial, diagnostics.iteration);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Diagnostics(e.to_string()))?;
        }
        std::fs::write(&path, render_html(result, diagnostics))
            .map_err(|e| Error::Diagnostics(e.to_string()))
    }
}

/// Render the report page of one round.
#[must_use]
pub fn render_html(result: &AcquisitionResult, diagnostics: &Diagnostics<'_>) -> String {
    let mut html = String::with_capacity(8192);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Elicitation Round {iteration}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
         background: #f5f6fa; color: #2c3e50; padding: 24px; }}
  h1 {{ text-align: center; margin-bottom: 8px; font-size: 1.8em; }}
  .subtitle {{ text-align: center; color: #7f8c8d; margin-bottom: 24px; }}
  .chart {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.08);
            margin-bottom: 24px; padding: 16px; }}
  .chart-title {{ font-size: 1.1em; font-weight: 600; margin-bottom: 8px; }}
</style>
</head>
<body>
<h1>Elicitation Round {iteration}</h1>
<p class="subtitle">Trial {trial} &middot; {n_duels} duels &middot; {n_samples} posterior samples &middot; next duel {next:?}</p>
"#,
        iteration = diagnostics.iteration,
        trial = diagnostics.trial,
        n_duels = diagnostics.history.len(),
        n_samples = diagnostics.samples.len(),
        next = result.next_duel.features(),
    );

    let candidates: Vec<f64> = diagnostics
        .reachable
        .raw()
        .iter()
        .map(|s| s.first().copied().unwrap_or(f64::NAN))
        .collect();

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Expected Improvement</div><div id=\"eui\"></div></div>\n");
    write_eui_chart(&mut html, &candidates, result, diagnostics);

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Utility at Candidates</div><div id=\"utility\"></div></div>\n");
    write_utility_chart(&mut html, &candidates, diagnostics);

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Best So Far</div><div id=\"best\"></div></div>\n");
    write_best_chart(&mut html, diagnostics);

    if !diagnostics.samples.names().is_empty() {
        html.push_str("<div class=\"chart\"><div class=\"chart-title\">Hyperparameter Traces</div><div id=\"traces\"></div></div>\n");
        write_trace_chart(&mut html, diagnostics);

        html.push_str("<div class=\"chart\"><div class=\"chart-title\">Chain Autocorrelation</div><div id=\"autocorr\"></div></div>\n");
        write_autocorr_chart(&mut html, diagnostics);
    }

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Duel History</div><div id=\"duels\"></div></div>\n");
    write_duel_chart(&mut html, diagnostics);

    html.push_str("</body>\n</html>\n");
    html
}

// ---------------------------------------------------------------------------
// Chart generators
// ---------------------------------------------------------------------------

fn write_eui_chart(
    html: &mut String,
    candidates: &[f64],
    result: &AcquisitionResult,
    diagnostics: &Diagnostics<'_>,
) {
    let chosen_x = candidates.get(result.chosen_index).copied().unwrap_or(f64::NAN);
    let xs = js_array(candidates);

    let mut per_sample = String::new();
    for row in diagnostics.scores.per_sample.row_iter() {
        let ys: Vec<f64> = row.iter().copied().collect();
        let _ = write!(
            per_sample,
            r#"{{ x: {xs}, y: {ys}, mode: "lines", type: "scatter", showlegend: false,
     hoverinfo: "skip", line: {{ color: "rgba(127,140,141,0.25)", width: 1 }} }},"#,
            ys = js_array(&ys),
        );
    }

    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("eui", [
  {per_sample}
  {{ x: {xs}, y: {ys}, mode: "lines+markers", name: "Mean EI", type: "scatter",
     marker: {{ color: "#3498db", size: 6 }} }},
  {{ x: [{cx}], y: [{cy}], mode: "markers", name: "Chosen", type: "scatter",
     marker: {{ color: "#e74c3c", size: 12, symbol: "star" }} }}
], {{ xaxis: {{ title: "Candidate state" }}, yaxis: {{ title: "Expected improvement" }},
     margin: {{ t: 10 }}, legend: {{ x: 1, xanchor: "right", y: 1 }} }},
   {{ responsive: true }});
</script>
"##,
        ys = js_array(&result.mean_exp_imp),
        cx = js_number(chosen_x),
        cy = js_number(result.max_exp_imp),
    );
}

#[allow(clippy::cast_precision_loss)]
fn write_utility_chart(html: &mut String, candidates: &[f64], diagnostics: &Diagnostics<'_>) {
    let mean = &diagnostics.predictions.candidate_mean;
    let var = &diagnostics.predictions.candidate_var;
    let rows = mean.nrows().max(1) as f64;

    let avg_mean: Vec<f64> = mean.column_iter().map(|c| c.sum() / rows).collect();
    let avg_sd: Vec<f64> = var.column_iter().map(|c| (c.sum() / rows).sqrt()).collect();
    let upper: Vec<f64> = avg_mean.iter().zip(&avg_sd).map(|(m, s)| m + 2.0 * s).collect();
    let lower: Vec<f64> = avg_mean.iter().zip(&avg_sd).map(|(m, s)| m - 2.0 * s).collect();

    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("utility", [
  {{ x: {xs}, y: {upper}, mode: "lines", line: {{ width: 0 }}, showlegend: false, type: "scatter" }},
  {{ x: {xs}, y: {lower}, mode: "lines", line: {{ width: 0 }}, fill: "tonexty",
     fillcolor: "rgba(52,152,219,0.2)", name: "±2σ", type: "scatter" }},
  {{ x: {xs}, y: {avg}, mode: "lines", name: "Mean utility", type: "scatter",
     line: {{ color: "#2c3e50", width: 2 }} }}
], {{ xaxis: {{ title: "Candidate state" }}, yaxis: {{ title: "Latent utility" }},
     margin: {{ t: 10 }} }},
   {{ responsive: true }});
</script>
"##,
        xs = js_array(candidates),
        upper = js_array(&upper),
        lower = js_array(&lower),
        avg = js_array(&avg_mean),
    );
}

fn write_best_chart(html: &mut String, diagnostics: &Diagnostics<'_>) {
    let draws: Vec<usize> = (0..diagnostics.scores.best_so_far.len()).collect();
    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("best", [{{
  x: {draws:?}, y: {ys}, type: "bar", marker: {{ color: "#9b59b6" }}
}}], {{ xaxis: {{ title: "Posterior sample" }}, yaxis: {{ title: "Best training utility" }},
       margin: {{ t: 10 }} }},
   {{ responsive: true }});
</script>
"##,
        ys = js_array(&diagnostics.scores.best_so_far),
    );
}

fn write_trace_chart(html: &mut String, diagnostics: &Diagnostics<'_>) {
    let mut traces = String::new();
    let draws: Vec<usize> = (0..diagnostics.samples.len()).collect();
    for name in diagnostics.samples.names() {
        let values = diagnostics.samples.trace(name).unwrap_or_default();
        let _ = write!(
            traces,
            r#"{{ x: {draws:?}, y: {ys}, mode: "lines", name: "{label}", line: {{ width: 1 }} }},"#,
            ys = js_array(&values),
            label = escape_js(name),
        );
    }

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("traces", [{traces}],
  {{ xaxis: {{ title: "Draw" }}, yaxis: {{ title: "Value" }},
     margin: {{ t: 10 }}, showlegend: true }},
  {{ responsive: true }});
</script>
"#,
    );
}

fn write_autocorr_chart(html: &mut String, diagnostics: &Diagnostics<'_>) {
    let max_lag = diagnostics.samples.len().saturating_sub(1).min(MAX_AUTOCORR_LAG);
    let lags: Vec<usize> = (0..=max_lag).collect();
    let mut traces = String::new();
    for name in diagnostics.samples.names() {
        let values = diagnostics.samples.trace(name).unwrap_or_default();
        let _ = write!(
            traces,
            r#"{{ x: {lags:?}, y: {ys}, mode: "lines+markers", name: "{label}", marker: {{ size: 4 }} }},"#,
            ys = js_array(&autocorrelation(&values, max_lag)),
            label = escape_js(name),
        );
    }

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("autocorr", [{traces}],
  {{ xaxis: {{ title: "Lag" }}, yaxis: {{ title: "Autocorrelation", range: [-1, 1] }},
     margin: {{ t: 10 }}, showlegend: true }},
  {{ responsive: true }});
</script>
"#,
    );
}

fn write_duel_chart(html: &mut String, diagnostics: &Diagnostics<'_>) {
    let duels = diagnostics.history.duels();
    let previous: Vec<f64> = duels
        .iter()
        .map(|d| d.previous().first().copied().unwrap_or(f64::NAN))
        .collect();
    let current: Vec<f64> = duels
        .iter()
        .map(|d| d.current().first().copied().unwrap_or(f64::NAN))
        .collect();
    let colors: Vec<String> = diagnostics
        .history
        .responses()
        .iter()
        .map(|&y| {
            if y > 0.5 {
                "\"#2ecc71\"".to_string()
            } else {
                "\"#e74c3c\"".to_string()
            }
        })
        .collect();

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("duels", [{{
  x: {xs}, y: {ys}, mode: "markers", type: "scatter",
  marker: {{ color: [{colors}], size: 9 }}
}}], {{ xaxis: {{ title: "Previous state" }}, yaxis: {{ title: "Current state" }},
       margin: {{ t: 10 }}, showlegend: false }},
   {{ responsive: true }});
</script>
"#,
        xs = js_array(&previous),
        ys = js_array(&current),
        colors = colors.join(","),
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Largest lag shown in the autocorrelation chart.
const MAX_AUTOCORR_LAG: usize = 50;

/// Sample autocorrelation of a chain for lags `0..=max_lag`.
///
/// Lags at or beyond the chain length are omitted. A constant chain has no
/// defined autocorrelation past lag 0 and yields `NaN` there.
///
/// ```
/// use elicit::report::autocorrelation;
///
/// let acf = autocorrelation(&[1.0, -1.0, 1.0, -1.0], 1);
/// assert_eq!(acf[0], 1.0);
/// assert!(acf[1] < 0.0);
/// ```
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let variance: f64 = centered.iter().map(|c| c * c).sum();

    (0..=max_lag.min(n - 1))
        .map(|lag| {
            if lag == 0 {
                return 1.0;
            }
            if variance <= 0.0 {
                return f64::NAN;
            }
            let cov: f64 = centered
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum();
            cov / variance
        })
        .collect()
}

/// Non-finite values have no JavaScript literal; Plotly skips `null`.
fn js_number(v: f64) -> String {
    if v.is_finite() {
        format!("{v:?}")
    } else {
        "null".to_string()
    }
}

fn js_array(vals: &[f64]) -> String {
    let items: Vec<String> = vals.iter().map(|&v| js_number(v)).collect();
    format!("[{}]", items.join(","))
}

fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
