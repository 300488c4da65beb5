//! Graphic overrides for filters on views.
//!
//! Each enabled channel of [`GraphicsOptions`] is written into the view's
//! existing override record for the filter; channels that are off keep
//! whatever the record held. With no channel enabled the projection and cut
//! line colors are set.
//!
//! Colors come from a fixed palette. `deterministic` mode hashes the filter id
//! (SHA-256) into the palette so a filter keeps its color across runs;
//! `random` mode draws from it once per filter and run, so every view of a
//! run shows the filter in the same color.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::commands::CmdMessage;
use crate::error::Result;
use crate::host::HostDocument;
use crate::model::{
    Color, ColorMode, FilterId, GraphicsOptions, OverrideRecord, PatternId, ViewId,
};

pub const PALETTE: [Color; 12] = [
    Color::rgb(230, 25, 75),
    Color::rgb(60, 180, 75),
    Color::rgb(0, 130, 200),
    Color::rgb(245, 130, 48),
    Color::rgb(145, 30, 180),
    Color::rgb(70, 240, 240),
    Color::rgb(240, 50, 230),
    Color::rgb(210, 245, 60),
    Color::rgb(250, 190, 190),
    Color::rgb(0, 128, 128),
    Color::rgb(170, 110, 40),
    Color::rgb(128, 0, 0),
];

/// Palette color derived from the filter id alone.
pub fn deterministic_color(filter: FilterId) -> Color {
    let digest = Sha256::digest(filter.0.to_le_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let index = u64::from_le_bytes(head) % PALETTE.len() as u64;
    PALETTE[index as usize]
}

/// Source of override colors.
pub struct ColorPicker {
    rng: StdRng,
    drawn: HashMap<FilterId, Color>,
}

impl Default for ColorPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            drawn: HashMap::new(),
        }
    }

    /// Reproducible random draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            drawn: HashMap::new(),
        }
    }

    /// Forget the random draws of the previous run.
    pub fn start_run(&mut self) {
        self.drawn.clear();
    }

    pub fn pick(&mut self, mode: ColorMode, filter: FilterId) -> Color {
        match mode {
            ColorMode::Deterministic => deterministic_color(filter),
            ColorMode::Random => {
                let rng = &mut self.rng;
                *self
                    .drawn
                    .entry(filter)
                    .or_insert_with(|| PALETTE[rng.gen_range(0..PALETTE.len())])
            }
        }
    }
}

/// Apply the enabled channels on top of `current`.
pub fn build_overrides(
    current: OverrideRecord,
    graphics: &GraphicsOptions,
    color: Color,
    solid_pattern: Option<PatternId>,
) -> OverrideRecord {
    let channels = if graphics.channels.any() {
        graphics.channels
    } else {
        crate::model::GraphicsChannels::legacy()
    };
    let pattern = graphics.pattern_id.or(solid_pattern);

    let mut record = current;
    if channels.projection_line {
        record.projection_line_color = Some(color);
    }
    if channels.cut_line {
        record.cut_line_color = Some(color);
    }
    if channels.projection_pattern {
        record.projection_pattern = pattern;
        record.projection_pattern_color = Some(color);
    }
    if channels.cut_pattern {
        record.cut_pattern = pattern;
        record.cut_pattern_color = Some(color);
    }
    if channels.halftone {
        record.halftone = true;
    }
    record
}

/// Write overrides for `filter` on `view`. Does nothing unless the selection
/// asks for graphics.
pub fn apply<H: HostDocument + ?Sized>(
    host: &mut H,
    view: ViewId,
    filter: FilterId,
    graphics: &GraphicsOptions,
    colors: &mut ColorPicker,
) -> Result<()> {
    if !graphics.apply_graphics {
        return Ok(());
    }
    let current = host.filter_overrides(view, filter).unwrap_or_default();
    let color = colors.pick(graphics.color_mode, filter);
    let record = build_overrides(current, graphics, color, host.solid_fill_pattern());
    host.set_filter_overrides(view, filter, &record)?;
    tracing::debug!(filter = %filter, view = %view, color = %color, "applied overrides");
    Ok(())
}

/// [`apply`], turning a failure into a message naming the filter and view.
pub fn apply_or_skip<H: HostDocument + ?Sized>(
    host: &mut H,
    view: ViewId,
    filter: FilterId,
    graphics: &GraphicsOptions,
    colors: &mut ColorPicker,
) -> Option<CmdMessage> {
    match apply(host, view, filter, graphics, colors) {
        Ok(()) => None,
        Err(e) => {
            let view_name = host
                .view_name(view)
                .unwrap_or_else(|_| format!("#{}", view));
            tracing::warn!(filter = %filter, view = %view_name, error = %e, "override failed");
            Some(CmdMessage::warning(format!(
                "Could not apply graphics for filter {} in view '{}': {}",
                filter, view_name, e
            )))
        }
    }
}
