//! Cellular fire. Drag with the mouse to add fuel.
//!
//! Both shaders are watched: edit them while the demo runs.

use flare::{AppConfig, Result, Simulation};

fn main() -> Result<()> {
    Simulation::new()
        .simulate_file(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/shaders/fire_simulate.wgsl"))
        .display_file(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/shaders/fire_display.wgsl"))
        .scale(0.5)
        .iterations(2)
        .go_with(AppConfig::new().title("Fire").size(960, 640))
}
