//! Standalone interactive HTML output (Plotly surface trace)

use serde_json::json;

use super::mesh::Mesh;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const DEFAULT_TITLE: &str = "3D figure";

pub fn render(mesh: &Mesh) -> String {
    let title = mesh.title.as_deref().unwrap_or(DEFAULT_TITLE);

    // NaN serializes as null, which Plotly draws as a gap
    let data = json!([{
        "type": "surface",
        "x": mesh.x,
        "y": mesh.y,
        "z": mesh.z,
        "surfacecolor": mesh.color,
        "colorscale": "Viridis",
    }]);
    let layout = json!({
        "title": { "text": title },
        "autosize": true,
        "scene": { "aspectmode": "auto" },
        "margin": { "l": 0, "r": 0, "t": 48, "b": 0 },
    });

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <script src="{PLOTLY_CDN}"></script>
    <style>
        html, body {{ margin: 0; height: 100%; }}
        #figure {{ width: 100%; height: 100%; }}
    </style>
</head>
<body>
    <div id="figure"></div>
    <script>
        Plotly.newPlot("figure", {data}, {layout}, {{ responsive: true }});
    </script>
</body>
</html>
"#,
        title = escape_html(title),
        data = script_safe(&data.to_string()),
        layout = script_safe(&layout.to_string()),
    )
}

/// Escape text placed in HTML element content
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Keep serialized JSON from closing the surrounding `<script>` element
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
}
