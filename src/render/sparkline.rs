use base64::{engine::general_purpose, Engine as _};

const WIDTH: f64 = 520.0;
const HEIGHT: f64 = 110.0;
const PAD: f64 = 8.0;
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy)]
pub struct SparklineStyle {
    pub line: &'static str,
    pub fill: &'static str,
}

pub const TRAFFIC_STYLE: SparklineStyle = SparklineStyle {
    line: "#2f6f5e",
    fill: "rgba(47,111,94,0.14)",
};

pub const ERROR_STYLE: SparklineStyle = SparklineStyle {
    line: "#b22f25",
    fill: "rgba(178,47,37,0.14)",
};

/// Polyline coordinates inside the padded viewBox. The scale always includes 0 and 1.
pub fn sparkline_points(values: &[u64]) -> Vec<(f64, f64)> {
    let max = values.iter().copied().max().unwrap_or(0).max(1) as f64;
    let min = 0.0;
    let spread = if max - min == 0.0 { 1.0 } else { max - min };
    let step = if values.len() > 1 {
        (WIDTH - PAD * 2.0) / (values.len() - 1) as f64
    } else {
        0.0
    };
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = PAD + i as f64 * step;
            let y = HEIGHT - PAD - ((v as f64 - min) / spread) * (HEIGHT - PAD * 2.0);
            (x, y)
        })
        .collect()
}

fn join_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inline SVG: a filled area under the trend plus the trend line itself.
pub fn sparkline_svg(values: &[u64], style: SparklineStyle) -> String {
    let points = sparkline_points(values);
    let baseline = HEIGHT - PAD;
    let mut area = vec![(PAD, baseline)];
    area.extend(points.iter().copied());
    area.push((WIDTH - PAD, baseline));

    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" preserveAspectRatio="none" role="img" aria-label="trend sparkline">"#,
            r#"<polyline points="{area}" fill="{fill}" stroke="none"></polyline>"#,
            r#"<polyline points="{line}" fill="none" stroke="{stroke}" stroke-width="2.5" stroke-linecap="round"></polyline>"#,
            "</svg>"
        ),
        w = WIDTH,
        h = HEIGHT,
        area = join_points(&area),
        fill = style.fill,
        line = join_points(&points),
        stroke = style.line,
    )
}

pub fn svg_data_uri(svg: &str) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(svg.as_bytes())
    )
}

/// One block character per bucket, scaled to the series maximum.
pub fn sparkline_text(values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0).max(1);
    values
        .iter()
        .map(|&v| {
            let level = (v * (BLOCKS.len() as u64 - 1) + max / 2) / max;
            BLOCKS[level.min(BLOCKS.len() as u64 - 1) as usize]
        })
        .collect()
}
