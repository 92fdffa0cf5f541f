//! Box plots rendered as standalone SVG documents.
//!
//! Plots are embedded into the report as base64 `data:` URIs so the report has no external
//! assets.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use maud::{html, Markup};

/// Colours used for categories when a plot has no explicit palette.
pub const MUTED: &[&str] = &[
    "#4878d0", "#ee854a", "#6acc64", "#d65f5f", "#956cb4", "#8c613c", "#dc7ec0", "#797979",
    "#d5bb67", "#82c6e2",
];

pub const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];

pub const PLASMA: &[&str] = &[
    "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953", "#fb9f3a",
    "#fdca26", "#f0f921",
];

/// Visual settings shared by every plot in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotTheme {
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub background: String,
    pub grid_colour: String,
    pub text_colour: String,
    /// Outline colour of boxes, whiskers and outliers.
    pub line_colour: String,
    pub palette: &'static [&'static str],
}

impl PlotTheme {
    /// White background with a light horizontal grid and a muted palette.
    pub fn whitegrid() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_family: "DejaVu Sans, Arial, Helvetica, sans-serif".to_string(),
            background: "#ffffff".to_string(),
            grid_colour: "#e5e5e5".to_string(),
            text_colour: "#262626".to_string(),
            line_colour: "#3f3f3f".to_string(),
            palette: MUTED,
        }
    }
}

impl Default for PlotTheme {
    fn default() -> Self {
        Self::whitegrid()
    }
}

/// Five number summary of a set of values, plus the values outside the whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Compute the box for a set of values, `None` if there are no finite values.
    ///
    /// Quartiles are linearly interpolated. Whiskers reach the most extreme values within 1.5
    /// times the interquartile range of the box.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let inside = sorted
            .iter()
            .copied()
            .filter(|v| *v >= low_fence && *v <= high_fence);
        let lower_whisker = inside.clone().next().unwrap_or(q1).min(q1);
        let upper_whisker = inside.last().unwrap_or(q3).max(q3);

        Some(Self {
            count: sorted.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers: sorted
                .iter()
                .copied()
                .filter(|v| *v < low_fence || *v > high_fence)
                .collect(),
        })
    }

    fn min(&self) -> f64 {
        self.outliers
            .first()
            .copied()
            .unwrap_or(self.lower_whisker)
            .min(self.lower_whisker)
    }

    fn max(&self) -> f64 {
        self.outliers
            .last()
            .copied()
            .unwrap_or(self.upper_whisker)
            .max(self.upper_whisker)
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// One category on the x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    /// Boxes drawn side by side within the category, with the hue they belong to.
    pub boxes: Vec<(usize, BoxStats)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub groups: Vec<BoxGroup>,
    /// Legend entries. Without hues each group gets its own colour and there is no legend.
    pub hues: Vec<String>,
    pub palette: Option<&'static [&'static str]>,
    /// Only place ticks on whole numbers.
    pub integer_ticks: bool,
    /// Fixed y axis range instead of fitting the data.
    pub y_range: Option<(f64, f64)>,
    /// Rotate the x axis labels to fit long category names.
    pub rotate_labels: bool,
}

impl BoxPlot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            groups: Vec::new(),
            hues: Vec::new(),
            palette: None,
            integer_ticks: false,
            y_range: None,
            rotate_labels: false,
        }
    }

    /// Add one box per group, coloured by group.
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        for (label, values) in groups {
            if let Some(stats) = BoxStats::from_values(&values) {
                let hue = self.groups.len();
                self.groups.push(BoxGroup {
                    label,
                    boxes: vec![(hue, stats)],
                });
            }
        }
        self
    }

    /// Add boxes split by hue within each group.
    ///
    /// Input is `(group, hue, values)`; groups and hues appear in first-seen order.
    pub fn with_hue_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = (String, String, Vec<f64>)>,
    {
        for (label, hue, values) in groups {
            let Some(stats) = BoxStats::from_values(&values) else {
                continue;
            };
            let hue_index = match self.hues.iter().position(|h| *h == hue) {
                Some(i) => i,
                None => {
                    self.hues.push(hue);
                    self.hues.len() - 1
                }
            };
            match self.groups.iter_mut().find(|g| g.label == label) {
                Some(group) => group.boxes.push((hue_index, stats)),
                None => self.groups.push(BoxGroup {
                    label,
                    boxes: vec![(hue_index, stats)],
                }),
            }
        }
        self
    }

    pub fn x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    pub fn y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = label.into();
        self
    }

    pub fn palette(mut self, palette: &'static [&'static str]) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn integer_ticks(mut self) -> Self {
        self.integer_ticks = true;
        self
    }

    pub fn y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn rotate_labels(mut self) -> Self {
        self.rotate_labels = true;
        self
    }

    /// Whether there is anything to draw.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn colour(&self, index: usize, theme: &PlotTheme) -> &'static str {
        let palette = self.palette.unwrap_or(theme.palette);
        let count = if self.hues.is_empty() {
            self.groups.len()
        } else {
            self.hues.len()
        };
        if palette.is_empty() {
            return "#808080";
        }
        // Spread the categories across sequential palettes
        if self.palette.is_some() && count > 1 && count <= palette.len() {
            palette[index * (palette.len() - 1) / (count - 1)]
        } else {
            palette[index % palette.len()]
        }
    }

    fn value_range(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }

        let (min, max) = self
            .groups
            .iter()
            .flat_map(|g| g.boxes.iter())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), (_, stats)| {
                (min.min(stats.min()), max.max(stats.max()))
            });
        if !min.is_finite() || !max.is_finite() {
            return (0.0, 1.0);
        }

        let span = if max > min { max - min } else { max.abs().max(1.0) };
        let pad = span * 0.05;
        (min - pad, max + pad)
    }

    fn slot(&self, hue: usize) -> usize {
        if self.hues.is_empty() {
            0
        } else {
            hue
        }
    }

    /// Render the plot as an SVG document.
    pub fn render_svg(&self, theme: &PlotTheme) -> String {
        let width = theme.width as f64;
        let height = theme.height as f64;
        let legend_width = if self.hues.is_empty() { 0.0 } else { 160.0 };
        let left = 80.0;
        let right = width - 20.0 - legend_width;
        let top = 50.0;
        let bottom = height - if self.rotate_labels { 110.0 } else { 60.0 };
        let plot_height = bottom - top;

        let (y_min, y_max) = self.value_range();
        let ticks = axis_ticks(y_min, y_max, self.integer_ticks);
        let y_of = |v: f64| bottom - (v.clamp(y_min, y_max) - y_min) / (y_max - y_min) * plot_height;

        let band = (right - left) / self.groups.len().max(1) as f64;
        let slot_width = band * 0.8 / self.hues.len().max(1) as f64;
        let y_label_y = px(top + plot_height / 2.0);

        // Every element gets an explicit end tag so the document is well-formed XML.
        html! {
            svg xmlns="http://www.w3.org/2000/svg" width=(width) height=(height)
                viewBox=(format!("0 0 {width} {height}")) font-family=(theme.font_family)
                fill=(theme.text_colour) {
                rect width=(width) height=(height) fill=(theme.background) {}
                text x=(px((left + right) / 2.0)) y="30" font-size="20" text-anchor="middle" {
                    (self.title)
                }

                // Grid and y axis
                @for tick in &ticks {
                    @let y = px(y_of(*tick));
                    line x1=(left) y1=(y) x2=(right) y2=(y) stroke=(theme.grid_colour) stroke-width="1" {}
                    text x=(left - 8.0) y=(px(y_of(*tick) + 4.0)) font-size="12" text-anchor="end" {
                        (format_tick(*tick))
                    }
                }
                @if !self.y_label.is_empty() {
                    text x="20" y=(y_label_y) font-size="14" text-anchor="middle"
                        transform=(format!("rotate(-90 20 {y_label_y})")) {
                        (self.y_label)
                    }
                }

                // Boxes
                @for (i, group) in self.groups.iter().enumerate() {
                    @let band_start = left + band * i as f64;
                    @for (hue, stats) in &group.boxes {
                        @let x = band_start + band * 0.1 + slot_width * self.slot(*hue) as f64;
                        (self.box_markup(theme, stats, *hue, x, slot_width * 0.9, &y_of))
                    }

                    @let label_x = px(band_start + band / 2.0);
                    @let label_y = px(bottom + 20.0);
                    @if self.rotate_labels {
                        text x=(label_x) y=(label_y) font-size="12" text-anchor="end"
                            transform=(format!("rotate(-45 {label_x} {label_y})")) {
                            (group.label)
                        }
                    } @else {
                        text x=(label_x) y=(label_y) font-size="12" text-anchor="middle" {
                            (group.label)
                        }
                    }
                }

                @if !self.x_label.is_empty() {
                    text x=(px((left + right) / 2.0)) y=(px(height - 12.0)) font-size="14" text-anchor="middle" {
                        (self.x_label)
                    }
                }

                // Legend
                @for (i, hue) in self.hues.iter().enumerate() {
                    @let x = right + 20.0;
                    @let y = top + 10.0 + 24.0 * i as f64;
                    rect x=(px(x)) y=(px(y)) width="14" height="14" fill=(self.colour(i, theme))
                        stroke=(theme.line_colour) {}
                    text x=(px(x + 20.0)) y=(px(y + 12.0)) font-size="12" { (hue) }
                }
            }
        }
        .into_string()
    }

    /// Whiskers, box, median and outliers for one set of values.
    fn box_markup(
        &self,
        theme: &PlotTheme,
        stats: &BoxStats,
        hue: usize,
        x: f64,
        width: f64,
        y_of: &impl Fn(f64) -> f64,
    ) -> Markup {
        let stroke = &theme.line_colour;
        let centre = px(x + width / 2.0);
        let cap_start = px(x + width / 4.0);
        let cap_end = px(x + width * 3.0 / 4.0);
        let (q1, q3) = (y_of(stats.q1), y_of(stats.q3));
        let median = px(y_of(stats.median));

        html! {
            line x1=(centre) y1=(px(y_of(stats.lower_whisker))) x2=(centre) y2=(px(q1))
                stroke=(stroke) stroke-width="1.5" {}
            line x1=(centre) y1=(px(q3)) x2=(centre) y2=(px(y_of(stats.upper_whisker)))
                stroke=(stroke) stroke-width="1.5" {}
            @for whisker in [stats.lower_whisker, stats.upper_whisker] {
                @let y = px(y_of(whisker));
                line x1=(cap_start) y1=(y) x2=(cap_end) y2=(y) stroke=(stroke) stroke-width="1.5" {}
            }
            rect x=(px(x)) y=(px(q3)) width=(px(width)) height=(px((q1 - q3).max(1.0)))
                fill=(self.colour(hue, theme)) stroke=(stroke) stroke-width="1.5" {}
            line x1=(px(x)) y1=(median) x2=(px(x + width)) y2=(median) stroke=(stroke) stroke-width="2" {}
            @for outlier in &stats.outliers {
                circle cx=(centre) cy=(px(y_of(*outlier))) r="3" fill="none" stroke=(stroke) {}
            }
        }
    }
}

fn px(value: f64) -> String {
    format!("{value:.1}")
}

/// Tick positions covering `[min, max]` at a 1, 2, 2.5 or 5 times power of ten step.
pub fn axis_ticks(min: f64, max: f64, integer_only: bool) -> Vec<f64> {
    if max.is_nan() || min.is_nan() || max <= min {
        return vec![min];
    }

    let rough = (max - min) / 6.0;
    let magnitude = 10f64.powf(rough.log10().floor());
    let mut step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= rough)
        .unwrap_or(10.0 * magnitude);
    if integer_only {
        step = step.ceil().max(1.0);
    }

    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_tick(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

/// Encode an SVG document as a `data:` URI for an `<img>` tag.
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}
