//! Offline rendering of a content document.

use std::io::Read;

use anyhow::{Context, Result};
use chatview_core::Config;
use chatview_render::lines_to_text;
use serde_json::Value;

/// Key under which the document's charts are drawn.
const DOCUMENT_KEY: &str = "document";

pub fn run(config: &Config, input: &str, width: usize) -> Result<()> {
    let raw = read_input(input)?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse JSON from {}", display_name(input)))?;
    let content = chatview_types::parse(&value)
        .with_context(|| format!("invalid content in {}", display_name(input)))?;

    let rendered = super::renderer(config).render_content(DOCUMENT_KEY, &content, width);
    println!("{}", lines_to_text(&rendered.to_lines()));
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read content from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("read {input}"))
    }
}

fn display_name(input: &str) -> &str {
    if input == "-" { "stdin" } else { input }
}
