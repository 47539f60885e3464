//! Per-message chart drawing surfaces.
//!
//! A message gets at most one surface, provisioned the first time one of its
//! code blocks draws a chart. Every render pass starts by discarding what the
//! previous pass drew, so re-rendering never accumulates drawings.

use std::collections::HashMap;

use crate::chart::ChartSpec;
use crate::style::StyledLine;

/// One chart as drawn on a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub spec: ChartSpec,
    pub lines: Vec<StyledLine>,
}

/// Immutable copy of a surface after a render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSnapshot {
    pub drawings: Vec<Drawing>,
}

impl SurfaceSnapshot {
    pub fn get(&self, index: usize) -> Option<&Drawing> {
        self.drawings.get(index)
    }
}

#[derive(Debug, Default)]
struct Surface {
    drawings: Vec<Drawing>,
}

/// Drawing surfaces keyed by message id.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<String, Surface>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the previous pass's drawings for `key`.
    ///
    /// The surface itself stays provisioned.
    pub fn begin_pass(&mut self, key: &str) {
        if let Some(surface) = self.surfaces.get_mut(key) {
            surface.drawings.clear();
        }
    }

    /// Draws `spec` at `width` on the surface for `key`, provisioning it on
    /// first use. Returns the drawing's index within the surface.
    pub fn draw(&mut self, key: &str, spec: ChartSpec, width: usize) -> usize {
        let surface = self.surfaces.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(message_id = key, "provisioned drawing surface");
            Surface::default()
        });
        let lines = spec.draw(width);
        surface.drawings.push(Drawing { spec, lines });
        surface.drawings.len() - 1
    }

    /// Current drawings for `key`; `None` when no surface was provisioned.
    pub fn snapshot(&self, key: &str) -> Option<SurfaceSnapshot> {
        self.surfaces.get(key).map(|surface| SurfaceSnapshot {
            drawings: surface.drawings.clone(),
        })
    }

    /// Drops the surface for `key`.
    pub fn release(&mut self, key: &str) {
        self.surfaces.remove(key);
    }

    /// Drops every surface whose key `keep` rejects.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.surfaces.retain(|key, _| keep(key.as_str()));
    }

    /// Number of provisioned surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
