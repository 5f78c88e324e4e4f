mod boundary;
mod config;
mod field;
mod hud;
mod solver;
mod stimulus;
mod visuals;

pub use boundary::{apply_boundary, FieldKind};
pub use config::{Settings, SETTINGS_ENV, SETTINGS_FILE};
pub use field::ScalarField;
pub use hud::{overlay_text, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH, LINE_SPACING};
pub use solver::{Fluid, FluidParams, DENSITY_FADE, RELAX_SWEEPS};
pub use stimulus::{
    audio_splat, drag_velocity, paint_density, random_splat, AUDIO_VELOCITY_SCALE,
    DRAG_VELOCITY_SCALE, PAINT_DENSITY,
};
pub use visuals::Visuals;
