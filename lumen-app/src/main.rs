//! Lumen - grayscale camera preview
//!
//! Opens a video source, converts each frame to grayscale, and displays
//! it in a window until Escape is pressed.

mod app;

use clap::Parser;

/// Lumen - grayscale camera preview
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera device index
    #[arg(short, long, default_value_t = 0)]
    pub device: u32,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Use a deterministic synthetic source instead of a camera
    #[arg(long)]
    pub synthetic: bool,

    /// List available camera devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = app::run(args) {
        eprintln!("lumen: {e}");
        std::process::exit(1);
    }
}
