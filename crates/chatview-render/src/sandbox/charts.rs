//! Reading chart requests out of evaluated values.
//!
//! Two shapes are accepted: Chart.js configs (`new Chart(canvas, { type,
//! data: { labels, datasets }, options })`) and chart components
//! (`<BarChart data={rows}>` with optional `<XAxis>`/`<Bar>` children).

use super::value::{Element, ElementKind, Object, Value};
use crate::chart::{ChartKind, ChartSpec, Dataset};

/// A `<Bar dataKey=..>`-style child of a chart component.
struct Part {
    name: &'static str,
    props: Object,
}

const SERIES_PARTS: &[&str] = &["Bar", "Line", "Area", "Pie"];

fn get(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(object) => object.borrow().get(key).cloned().unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Str(s) => s.to_string(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .map(Value::to_display)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// `new Chart(canvas, config)`.
pub(super) fn from_config(config: &Value) -> ChartSpec {
    let kind = get(config, "type")
        .as_str()
        .and_then(ChartKind::from_name)
        .unwrap_or(ChartKind::Bar);
    let mut spec = ChartSpec::new(kind);
    read_datasets(&get(config, "data"), &mut spec);

    let options = get(config, "options");
    spec.title = text(&get(&get(&get(&options, "plugins"), "title"), "text"))
        .or_else(|| text(&get(&get(&options, "title"), "text")));
    spec
}

/// `{ labels, datasets: [{ label, data }] }`.
fn read_datasets(data: &Value, spec: &mut ChartSpec) {
    if let Value::Array(labels) = get(data, "labels") {
        spec.labels = labels.borrow().iter().map(Value::to_display).collect();
    }
    let Value::Array(datasets) = get(data, "datasets") else {
        return;
    };
    for dataset in datasets.borrow().iter() {
        let values = match get(dataset, "data") {
            Value::Array(values) => values
                .borrow()
                .iter()
                .map(|point| match point {
                    // Scatter-style points.
                    Value::Object(_) => get(point, "y").to_number(),
                    other => other.to_number(),
                })
                .collect(),
            _ => Vec::new(),
        };
        spec.datasets.push(Dataset {
            label: text(&get(dataset, "label")),
            data: values,
        });
    }
}

/// `<BarChart data={..} xKey=".." yKey="..">` and friends.
pub(super) fn from_element(
    kind: Option<ChartKind>,
    props: &Object,
    children: &[Value],
) -> ChartSpec {
    let prop = |key: &str| props.get(key).cloned().unwrap_or(Value::Undefined);
    let kind = kind
        .or_else(|| prop("type").as_str().and_then(ChartKind::from_name))
        .unwrap_or(ChartKind::Bar);
    let mut spec = ChartSpec::new(kind);
    spec.title = text(&prop("title"));

    let mut parts = Vec::new();
    collect_parts(children, &mut parts);
    if let Some(children) = props.get("children") {
        collect_parts(std::slice::from_ref(children), &mut parts);
    }

    let data = match prop("data") {
        Value::Undefined => parts
            .iter()
            .find_map(|part| part.props.get("data").cloned())
            .unwrap_or(Value::Undefined),
        data => data,
    };
    match &data {
        Value::Array(rows) => read_rows(&rows.borrow(), props, &parts, &mut spec),
        Value::Object(_) => read_datasets(&data, &mut spec),
        _ => {}
    }
    spec
}

fn collect_parts(values: &[Value], parts: &mut Vec<Part>) {
    for value in values {
        match value {
            Value::Array(items) => collect_parts(&items.borrow(), parts),
            Value::Element(element) => collect_element(element, parts),
            _ => {}
        }
    }
}

fn collect_element(element: &Element, parts: &mut Vec<Part>) {
    match element.kind {
        ElementKind::ChartPart(name) => parts.push(Part {
            name,
            props: element.props.clone(),
        }),
        ElementKind::Fragment | ElementKind::Passthrough => {}
        _ => return,
    }
    collect_parts(&element.children, parts);
}

fn string_prop(props: &Object, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| props.get(key).and_then(Value::as_str).map(str::to_string))
}

/// Rows of records (`[{ month, sales }]`) or plain numbers.
fn read_rows(rows: &[Value], props: &Object, parts: &[Part], spec: &mut ChartSpec) {
    if rows.iter().all(|row| matches!(row, Value::Num(_))) {
        spec.datasets.push(Dataset {
            label: None,
            data: rows.iter().map(Value::to_number).collect(),
        });
        return;
    }
    let first = rows.first().cloned().unwrap_or(Value::Undefined);
    let Value::Object(first) = first else {
        return;
    };
    let first = first.borrow();

    let x_key = string_prop(props, &["x", "xKey", "nameKey"])
        .or_else(|| {
            parts
                .iter()
                .find(|part| part.name == "XAxis")
                .and_then(|part| string_prop(&part.props, &["dataKey"]))
        })
        .or_else(|| {
            parts
                .iter()
                .find(|part| part.name == "Pie")
                .and_then(|part| string_prop(&part.props, &["nameKey"]))
        })
        .or_else(|| {
            first
                .iter()
                .find(|(_, value)| matches!(value, Value::Str(_)))
                .map(|(key, _)| key.clone())
        });

    let series = y_series(props, parts, &first, x_key.as_deref());
    if let Some(x_key) = &x_key {
        spec.labels = rows
            .iter()
            .map(|row| get(row, x_key).to_display())
            .collect();
    }
    for (key, label) in series {
        spec.datasets.push(Dataset {
            label: Some(label),
            data: rows.iter().map(|row| get(row, &key).to_number()).collect(),
        });
    }
}

/// `(data key, series label)` pairs to plot.
fn y_series(
    props: &Object,
    parts: &[Part],
    first: &Object,
    x_key: Option<&str>,
) -> Vec<(String, String)> {
    for key in ["y", "yKey", "dataKey"] {
        match props.get(key) {
            Some(Value::Str(key)) => return vec![(key.to_string(), key.to_string())],
            Some(Value::Array(keys)) => {
                return keys
                    .borrow()
                    .iter()
                    .filter_map(|key| key.as_str().map(|k| (k.to_string(), k.to_string())))
                    .collect();
            }
            _ => {}
        }
    }

    let from_parts: Vec<(String, String)> = parts
        .iter()
        .filter(|part| SERIES_PARTS.contains(&part.name))
        .filter_map(|part| {
            let key = string_prop(&part.props, &["dataKey"])?;
            let label = string_prop(&part.props, &["name"]).unwrap_or_else(|| key.clone());
            Some((key, label))
        })
        .collect();
    if !from_parts.is_empty() {
        return from_parts;
    }

    first
        .iter()
        .filter(|(key, value)| Some(key.as_str()) != x_key && matches!(value, Value::Num(_)))
        .map(|(key, _)| (key.clone(), key.clone()))
        .collect()
}
