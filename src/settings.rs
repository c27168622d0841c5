//! User-facing emulation settings consumed by the TIA.

/// Settings that affect TIA behavior. Captured once at construction; the
/// runtime toggles on [`crate::tia::Tia`] take over from there.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Whether undriven TIA pins read back random bits instead of mirroring
    /// the last data bus value. Some games depend on one or the other.
    pub tia_pins_driven: bool,
    /// Whether PAL color-loss emulation is allowed. Only takes effect on
    /// PAL-rate consoles; NTSC never exhibits color loss.
    pub color_loss: bool,
    /// Frames per second. Anything at or below 0 enables autodetection from
    /// the scanline count of each finished frame.
    pub framerate: f32,
    /// First visible scanline of the frame.
    pub ystart: u32,
    /// Number of visible scanlines.
    pub height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tia_pins_driven: false,
            color_loss: false,
            framerate: 60.0,
            ystart: 34,
            height: 210,
        }
    }
}
