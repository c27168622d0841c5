//! The TIA device: registers, catch-up renderer and frame lifecycle.
//!
//! The renderer is a catch-up painter. Nothing is drawn eagerly; instead,
//! every register access first calls [`Tia::update_frame`] with the access's
//! own color clock (plus the register's propagation delay), which paints all
//! pixels between the last update point and that clock. Painting is therefore
//! idempotent and monotonic within a frame, and a register write becomes
//! visible exactly at its propagation point.

pub mod flags;
pub mod registers;

mod ball;
mod horizontal;
mod missile;
mod player;
mod playfield;
mod tables;

#[cfg(test)]
mod tests;

use enum_map::EnumMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::bus::{BusState, Cpu, PokeResult};
use crate::controller::{AnalogPin, AnalogReadout, Controller, Jack};
use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::settings::Settings;
use crate::sound::Sound;
use ball::Ball;
use horizontal::Beam;
use missile::Missile;
use player::{Player, ResetTiming};
use playfield::Playfield;
use tables::{TiaTables, PLAYFIELD_DELAY};

/// Color clocks per scanline.
pub(crate) const SCANLINE_CLOCKS: i32 = 228;
/// Color clocks of horizontal blank at the start of each scanline.
pub(crate) const HBLANK_CLOCKS: i32 = 68;
/// Visible pixels per scanline.
pub(crate) const VISIBLE_PIXELS: i32 = 160;
/// Color clocks per CPU cycle.
pub(crate) const PIXEL_CLOCKS: i32 = 3;
/// CPU cycles per scanline.
pub(crate) const SCANLINE_CYCLES: i32 = 76;
/// Scanlines the frame buffer can hold.
pub(crate) const BUFFER_LINES: u32 = 320;
pub(crate) const BUFFER_SIZE: usize = (VISIBLE_PIXELS as usize) * (BUFFER_LINES as usize);
/// Sentinel HMOVE position meaning "no HMOVE in flight".
pub(crate) const NO_HMOVE: i32 = 0x7FFF_FFFF;

const TIA_TAG: &str = "TIA";

pub struct Tia {
    settings: Settings,
    sound: Box<dyn Sound>,
    controllers: EnumMap<Jack, Box<dyn Controller>>,
    tables: TiaTables,
    rng: SmallRng,

    current_buffer: Box<[u8; BUFFER_SIZE]>,
    previous_buffer: Box<[u8; BUFFER_SIZE]>,
    /// Index of the next pixel to paint in the current buffer.
    frame_pointer: usize,
    /// Visible pixels painted so far this frame.
    frame_pointer_clocks: u32,
    /// Index of the first pixel of the user-visible window; the buffer itself
    /// is always painted from scanline zero.
    frame_pointer_offset: usize,
    frame_ystart: u32,
    frame_height: u32,
    partial_frame: bool,
    /// First scanline on which VBLANK was disabled, for short-frame detection.
    start_scanline: u32,

    clock_when_frame_started: i32,
    clock_start_display: i32,
    clock_stop_display: i32,
    clock_at_last_update: i32,
    clocks_to_end_of_scanline: i32,
    stop_display_offset: i32,
    vsync_finish_clock: i32,
    scanline_count_for_last_frame: u32,
    maximum_number_of_scanlines: u32,

    framerate: f32,
    auto_frame_enabled: bool,
    color_loss_enabled: bool,
    frame_counter: u32,
    pal_frame_counter: u32,

    vsync: u8,
    vblank: u8,
    colors: [u8; 8],
    fixed_colors: [u8; 8],
    fixed_colors_on: bool,
    /// `[screen half][presence bits | score/priority bits]` -> color index.
    priority_encoder: Box<[[u8; 256]; 2]>,

    collision: u16,
    /// Upper 16 bits: per-object collision enables; lower 16: the latch mask
    /// they expand to.
    collision_enabled_mask: u32,
    /// Presence bits of objects the debugger has left visible.
    enabled_objects: u8,
    bits_enabled: bool,
    collisions_enabled: bool,
    allow_hmove_blanks: bool,
    hmove_blank_enabled: bool,
    current_hmove_pos: i32,
    previous_hmove_pos: i32,

    dump_enabled: bool,
    dump_disabled_cycle: i32,
    /// INPT4/INPT5 latches, active when VBLANK bit 6 is set.
    input_latch: [u8; 2],
    tia_pins_driven: bool,

    playfield: Playfield,
    player0: Player,
    player1: Player,
    missile0: Missile,
    missile1: Missile,
    ball: Ball,
}

impl Tia {
    pub fn new(
        settings: Settings,
        sound: Box<dyn Sound>,
        controllers: EnumMap<Jack, Box<dyn Controller>>,
    ) -> Self {
        let framerate = if settings.framerate > 0.0 {
            settings.framerate
        } else {
            60.0
        };
        let frame_ystart = settings.ystart;
        let frame_height = settings.height;
        let mut tia = Tia {
            settings,
            sound,
            controllers,
            tables: TiaTables::new(),
            rng: SmallRng::from_entropy(),
            current_buffer: Box::new([0; BUFFER_SIZE]),
            previous_buffer: Box::new([0; BUFFER_SIZE]),
            frame_pointer: 0,
            frame_pointer_clocks: 0,
            frame_pointer_offset: 0,
            frame_ystart,
            frame_height,
            partial_frame: false,
            start_scanline: 0,
            clock_when_frame_started: 0,
            clock_start_display: 0,
            clock_stop_display: 0,
            clock_at_last_update: 0,
            clocks_to_end_of_scanline: SCANLINE_CLOCKS,
            stop_display_offset: 0,
            vsync_finish_clock: NO_HMOVE,
            scanline_count_for_last_frame: 0,
            maximum_number_of_scanlines: 290,
            framerate,
            auto_frame_enabled: false,
            color_loss_enabled: false,
            frame_counter: 0,
            pal_frame_counter: 0,
            vsync: 0,
            vblank: 0,
            colors: [0; 8],
            fixed_colors: [0; 8],
            fixed_colors_on: false,
            priority_encoder: Box::new([[0; 256]; 2]),
            collision: 0,
            collision_enabled_mask: 0xFFFF_FFFF,
            enabled_objects: 0xFF,
            bits_enabled: true,
            collisions_enabled: true,
            allow_hmove_blanks: true,
            hmove_blank_enabled: false,
            current_hmove_pos: NO_HMOVE,
            previous_hmove_pos: NO_HMOVE,
            dump_enabled: false,
            dump_disabled_cycle: 0,
            input_latch: [flags::INPUT_HIGH; 2],
            tia_pins_driven: false,
            playfield: Playfield::default(),
            player0: Player::new(flags::P0_BIT),
            player1: Player::new(flags::P1_BIT),
            missile0: Missile::new(flags::M0_BIT),
            missile1: Missile::new(flags::M1_BIT),
            ball: Ball::new(),
        };
        tia.reset();
        return tia;
    }

    /// Resets the device to its power-on state. Assumes the CPU cycle counter
    /// has been freshly zeroed.
    pub fn reset(&mut self) {
        self.sound.reset();

        self.enabled_objects = 0xFF;
        self.allow_hmove_blanks = true;

        self.vsync = 0;
        self.vblank = 0;
        self.colors = [0; 8];

        self.collision = 0;
        self.collision_enabled_mask = 0xFFFF_FFFF;

        self.current_hmove_pos = NO_HMOVE;
        self.previous_hmove_pos = NO_HMOVE;
        self.hmove_blank_enabled = false;

        self.enable_objects(true);

        self.dump_enabled = false;
        self.dump_disabled_cycle = 0;
        self.input_latch = [flags::INPUT_HIGH; 2];

        self.tia_pins_driven = self.settings.tia_pins_driven;

        self.frame_counter = 0;
        self.pal_frame_counter = 0;
        self.scanline_count_for_last_frame = 0;
        self.partial_frame = false;

        self.playfield.reset();
        self.player0.reset();
        self.player1.reset();
        self.missile0.reset();
        self.missile1.reset();
        self.ball.reset();

        self.set_fixed_colors(false);
        self.frame_reset();
    }

    /// Recomputes the frame geometry after a change to ystart, height or the
    /// detected TV system. Assumes the CPU cycle counter is zeroed.
    pub fn frame_reset(&mut self) {
        self.current_buffer.fill(0);
        self.previous_buffer.fill(0);
        self.frame_pointer = 0;
        self.frame_pointer_clocks = 0;

        self.frame_pointer_offset = (VISIBLE_PIXELS as usize) * (self.frame_ystart as usize);

        self.auto_frame_enabled = self.settings.framerate <= 0.0;

        if self.framerate > 55.0 {
            // NTSC
            self.fixed_colors[flags::P0_COLOR] = 0x30;
            self.fixed_colors[flags::P1_COLOR] = 0x16;
            self.fixed_colors[flags::M0_COLOR] = 0x38;
            self.fixed_colors[flags::M1_COLOR] = 0x12;
            self.fixed_colors[flags::BL_COLOR] = 0x7e;
            self.fixed_colors[flags::PF_COLOR] = 0x76;
            self.fixed_colors[flags::BK_COLOR] = 0x0a;
            self.fixed_colors[flags::HBLANK_COLOR] = 0x0e;
            self.color_loss_enabled = false;
            self.maximum_number_of_scanlines = 290;
        } else {
            // PAL
            self.fixed_colors[flags::P0_COLOR] = 0x62;
            self.fixed_colors[flags::P1_COLOR] = 0x26;
            self.fixed_colors[flags::M0_COLOR] = 0x68;
            self.fixed_colors[flags::M1_COLOR] = 0x2e;
            self.fixed_colors[flags::BL_COLOR] = 0xde;
            self.fixed_colors[flags::PF_COLOR] = 0xd8;
            self.fixed_colors[flags::BK_COLOR] = 0x1c;
            self.fixed_colors[flags::HBLANK_COLOR] = 0x0e;
            self.color_loss_enabled = self.settings.color_loss;
            self.maximum_number_of_scanlines = 342;
        }

        // NTSC screens process at least 262 scanlines, PAL at least 312; at
        // most BUFFER_LINES can be stored.
        let mut scanlines = self.frame_ystart + self.frame_height;
        scanlines = scanlines.max(if self.maximum_number_of_scanlines == 290 {
            262
        } else {
            312
        });
        self.stop_display_offset = SCANLINE_CLOCKS * scanlines.min(BUFFER_LINES) as i32;

        self.clock_when_frame_started = 0;
        self.clock_start_display = 0;
        self.clock_stop_display = self.stop_display_offset;
        self.clock_at_last_update = 0;
        self.clocks_to_end_of_scanline = SCANLINE_CLOCKS;
        self.vsync_finish_clock = NO_HMOVE;
    }

    /// Rebases all cycle-derived bookkeeping after the CPU cycle counter is
    /// reset to zero.
    pub fn system_cycles_reset(&mut self, cycles: i32) {
        self.sound.adjust_cycle_counter(-cycles);
        self.dump_disabled_cycle -= cycles;

        let clocks = cycles * PIXEL_CLOCKS;
        self.clock_when_frame_started -= clocks;
        self.clock_start_display -= clocks;
        self.clock_stop_display -= clocks;
        self.clock_at_last_update -= clocks;
        self.vsync_finish_clock -= clocks;
    }

    /// Runs the emulation for one frame of video.
    pub fn update(&mut self, cpu: &mut dyn Cpu) {
        if !self.partial_frame {
            self.start_frame(cpu);
        }

        // The frame is finished when a VSYNC poke clears this flag; if the
        // instruction budget runs out first, the next call picks the frame up
        // where it stopped.
        self.partial_frame = true;

        cpu.execute(25000, self);

        self.end_frame(cpu);
    }

    fn start_frame(&mut self, cpu: &mut dyn Cpu) {
        std::mem::swap(&mut self.current_buffer, &mut self.previous_buffer);

        // Some games position objects during VSYNC and the TIA's internal
        // counters are not reset by it, so the new frame's starting clock is
        // offset by the clocks already spent on the current scanline.
        let cycles = cpu.cycles();
        let clocks = (cycles * PIXEL_CLOCKS - self.clock_when_frame_started) % SCANLINE_CLOCKS;

        self.system_cycles_reset(cycles);
        cpu.reset_cycles();

        self.clock_when_frame_started = -clocks;
        self.clock_start_display = self.clock_when_frame_started;
        self.clock_stop_display = self.clock_when_frame_started + self.stop_display_offset;
        self.clock_at_last_update = self.clock_start_display;
        self.clocks_to_end_of_scanline = SCANLINE_CLOCKS;

        self.frame_pointer = 0;
        self.frame_pointer_clocks = 0;

        // PAL color loss: on odd frames the chroma of every color register is
        // knocked out by forcing the luminance parity.
        if self.color_loss_enabled {
            if self.scanline_count_for_last_frame & 0x01 != 0 {
                for index in 0..flags::HBLANK_COLOR {
                    self.colors[index] |= 0x01;
                }
            } else {
                for index in 0..flags::HBLANK_COLOR {
                    self.colors[index] &= 0xfe;
                }
            }
        }
        self.start_scanline = 0;
    }

    fn end_frame(&mut self, cpu: &mut dyn Cpu) {
        let current_lines = self.scanlines_at(cpu.cycles() * PIXEL_CLOCKS);

        // Frames that complete before the first visible scanline still ran
        // code, but are never shown; restart without counting them so the
        // double buffering doesn't get confused.
        if current_lines <= self.start_scanline {
            log::warn!(
                "discarding {}-scanline frame that ended before the first visible scanline",
                current_lines
            );
            self.start_frame(cpu);
            return;
        }

        let previous_count = self.scanline_count_for_last_frame;
        self.scanline_count_for_last_frame = current_lines;

        // When the scanline count jumps compared to the previous frame, part
        // of the buffers is blanked. The two buffers get different filler
        // values so that dirty-rectangle consumers notice the change.
        if self.scanline_count_for_last_frame > self.maximum_number_of_scanlines + 1 {
            self.scanline_count_for_last_frame = self.maximum_number_of_scanlines;
            if previous_count < self.maximum_number_of_scanlines {
                self.current_buffer.fill(0);
                self.previous_buffer.fill(1);
            }
        } else if self.scanline_count_for_last_frame < previous_count
            && self.scanline_count_for_last_frame < BUFFER_LINES
            && previous_count < BUFFER_LINES
        {
            let offset =
                (self.scanline_count_for_last_frame as usize) * (VISIBLE_PIXELS as usize);
            let end = (previous_count as usize) * (VISIBLE_PIXELS as usize);
            self.current_buffer[offset..end].fill(0);
            self.previous_buffer[offset..end].fill(1);
        }

        self.frame_counter += 1;
        if self.scanline_count_for_last_frame >= 287 {
            self.pal_frame_counter += 1;
        }

        if self.auto_frame_enabled {
            let line_rate = if self.scanline_count_for_last_frame > 285 {
                15600.0
            } else {
                15720.0
            };
            self.framerate = line_rate / self.scanline_count_for_last_frame as f32;

            // Accommodate the highest scanline count seen so far, up to the
            // size of the buffer.
            let offset = SCANLINE_CLOCKS * self.scanline_count_for_last_frame as i32;
            if offset > self.stop_display_offset && offset < SCANLINE_CLOCKS * BUFFER_LINES as i32
            {
                self.stop_display_offset = offset;
            }
        }
    }

    /// Paints all pixels between the last update point and `clock`.
    pub fn update_frame(&mut self, clock: i32) {
        if clock < self.clock_start_display
            || self.clock_at_last_update >= self.clock_stop_display
            || self.clock_at_last_update >= clock
        {
            return;
        }
        let clock = clock.min(self.clock_stop_display);

        let start_line = (self.clock_at_last_update - self.clock_when_frame_started) / SCANLINE_CLOCKS;
        let end_line = (clock - self.clock_when_frame_started) / SCANLINE_CLOCKS;

        for line in start_line..=end_line {
            if line != start_line {
                // Crossing into a new scanline: previously issued HMOVEs are
                // no longer relevant, and motion from an HMOVE strobed during
                // the display only takes effect here.
                self.previous_hmove_pos = NO_HMOVE;

                self.player0.horizontal.apply_pending_motions(self.current_hmove_pos);
                self.player1.horizontal.apply_pending_motions(self.current_hmove_pos);
                self.missile0.horizontal.apply_pending_motions(self.current_hmove_pos);
                self.missile1.horizontal.apply_pending_motions(self.current_hmove_pos);
                self.ball.horizontal.apply_pending_motions(self.current_hmove_pos);

                if self.current_hmove_pos != NO_HMOVE {
                    if (97..157).contains(&self.current_hmove_pos) {
                        self.previous_hmove_pos = self.current_hmove_pos;
                    }
                    self.current_hmove_pos = NO_HMOVE;
                }
            }

            let mut clocks_from_start = SCANLINE_CLOCKS - self.clocks_to_end_of_scanline;

            let mut clocks_to_update;
            if clock > self.clock_at_last_update + self.clocks_to_end_of_scanline {
                // More than this scanline to go, so finish the current one.
                clocks_to_update = self.clocks_to_end_of_scanline;
                self.clocks_to_end_of_scanline = SCANLINE_CLOCKS;
                self.clock_at_last_update += clocks_to_update;
            } else {
                clocks_to_update = clock - self.clock_at_last_update;
                self.clocks_to_end_of_scanline -= clocks_to_update;
                self.clock_at_last_update = clock;
            }

            // Skip over as much horizontal blank as possible.
            if clocks_from_start < HBLANK_CLOCKS {
                let skipped = (HBLANK_CLOCKS - clocks_from_start).min(clocks_to_update);
                clocks_from_start += skipped;
                clocks_to_update -= skipped;
            }

            let old_frame_pointer = self.frame_pointer;

            if clocks_to_update != 0 {
                let ending = self.frame_pointer + clocks_to_update as usize;
                self.frame_pointer_clocks += clocks_to_update as u32;

                if self.vblank & flags::VBLANK_ON != 0 {
                    self.current_buffer[self.frame_pointer..ending].fill(0);
                } else {
                    self.player0.update_mask();
                    self.player1.update_mask();
                    self.missile0.update_mask();
                    self.missile1.update_mask();
                    self.ball.update_mask();

                    let palette = if self.fixed_colors_on {
                        &self.fixed_colors
                    } else {
                        &self.colors
                    };
                    let mut hpos = (clocks_from_start - HBLANK_CLOCKS) as usize;
                    for index in self.frame_pointer..ending {
                        let mut enabled = self.playfield.enabled(&self.tables, hpos);
                        enabled |= self.ball.enabled(&self.tables, hpos);
                        enabled |= self.player1.enabled(&self.tables, hpos);
                        enabled |= self.missile1.enabled(&self.tables, hpos);
                        enabled |= self.player0.enabled(&self.tables, hpos);
                        enabled |= self.missile0.enabled(&self.tables, hpos);
                        enabled &= self.enabled_objects;

                        self.collision |= self.tables.collision_mask[usize::from(enabled)];

                        let half = usize::from(hpos >= (VISIBLE_PIXELS as usize) / 2);
                        let selector = enabled | self.playfield.priority_and_score();
                        self.current_buffer[index] = palette
                            [usize::from(self.priority_encoder[half][usize::from(selector)])];
                        hpos += 1;
                    }
                }
                self.frame_pointer = ending;
            }

            // The HMOVE blank covers the 8 pixels after horizontal blank.
            if self.hmove_blank_enabled && clocks_from_start < HBLANK_CLOCKS + 8 {
                let hblank_color = if self.fixed_colors_on {
                    self.fixed_colors[flags::HBLANK_COLOR]
                } else {
                    self.colors[flags::HBLANK_COLOR]
                };
                let blanks = (HBLANK_CLOCKS + 8 - clocks_from_start) as usize;
                let end = (old_frame_pointer + blanks).min(BUFFER_SIZE);
                self.current_buffer[old_frame_pointer..end].fill(hblank_color);

                if clocks_to_update + clocks_from_start >= HBLANK_CLOCKS + 8 {
                    self.hmove_blank_enabled = false;
                }
            }

            if self.clocks_to_end_of_scanline == SCANLINE_CLOCKS {
                self.player0.clear_suppress();
                self.player1.clear_suppress();
            }
        }
    }

    /// Reads a TIA register. Only D7 and D6 are driven by the chip; the rest
    /// mirror the data bus, or float randomly when the pins are undriven.
    pub fn peek(&mut self, addr: u16, bus: &BusState) -> u8 {
        use registers::*;

        self.update_frame(bus.cycles * PIXEL_CLOCKS);

        let noise = if self.tia_pins_driven {
            self.rng.gen::<u8>()
        } else {
            0
        };
        let mut value = 0x3F & (bus.data_bus | noise);
        let collision = self.collision & self.collision_enabled_mask as u16;

        let pair = |high: u16, low: u16| -> u8 {
            (if collision & high != 0 { 0x80 } else { 0x00 })
                | (if collision & low != 0 { 0x40 } else { 0x00 })
        };

        match addr & 0x000F {
            CXM0P => value |= pair(flags::CX_M0P1, flags::CX_M0P0),
            CXM1P => value |= pair(flags::CX_M1P0, flags::CX_M1P1),
            CXP0FB => value |= pair(flags::CX_P0PF, flags::CX_P0BL),
            CXP1FB => value |= pair(flags::CX_P1PF, flags::CX_P1BL),
            CXM0FB => value |= pair(flags::CX_M0PF, flags::CX_M0BL),
            CXM1FB => value |= pair(flags::CX_M1PF, flags::CX_M1BL),
            CXBLPF => value = (value & 0x7F) | pair(flags::CX_BLPF, 0),
            CXPPMM => value |= pair(flags::CX_P0P1, flags::CX_M0M1),
            INPT0 => {
                let readout = self.controllers[Jack::Left].read_analog(AnalogPin::Nine);
                value = (value & 0x7F) | self.dumped_input_port(readout, bus);
            }
            INPT1 => {
                let readout = self.controllers[Jack::Left].read_analog(AnalogPin::Five);
                value = (value & 0x7F) | self.dumped_input_port(readout, bus);
            }
            INPT2 => {
                let readout = self.controllers[Jack::Right].read_analog(AnalogPin::Nine);
                value = (value & 0x7F) | self.dumped_input_port(readout, bus);
            }
            INPT3 => {
                let readout = self.controllers[Jack::Right].read_analog(AnalogPin::Five);
                value = (value & 0x7F) | self.dumped_input_port(readout, bus);
            }
            INPT4 => value = (value & 0x7F) | self.latched_button(Jack::Left),
            INPT5 => value = (value & 0x7F) | self.latched_button(Jack::Right),
            _ => {}
        }
        return value;
    }

    /// Writes a TIA register. The returned [`PokeResult`] carries WSYNC cycle
    /// consumption and end-of-frame CPU halt requests back to the CPU core.
    pub fn poke(&mut self, addr: u16, value: u8, bus: &BusState) -> PokeResult {
        use registers::*;

        let addr = addr & 0x003F;
        let clock = bus.cycles * PIXEL_CLOCKS;

        let mut delay = i32::from(self.tables.poke_delay[addr as usize]);
        if delay == -1 {
            // Playfield registers propagate after a delay that cycles with
            // the beam position.
            let x = (clock - self.clock_when_frame_started) % SCANLINE_CLOCKS;
            delay = i32::from(PLAYFIELD_DELAY[((x / PIXEL_CLOCKS) & 3) as usize]);
        }

        self.update_frame(clock + delay);

        let mut result = PokeResult::default();

        // If a VSYNC hasn't been generated in time, end the frame anyway.
        if (clock - self.clock_when_frame_started) / SCANLINE_CLOCKS
            >= self.maximum_number_of_scanlines as i32
        {
            log::warn!(
                "frame exceeded {} scanlines without VSYNC",
                self.maximum_number_of_scanlines
            );
            result.halt_cpu = true;
            self.partial_frame = false;
        }

        match addr {
            VSYNC => {
                self.vsync = value;
                if self.vsync & flags::VSYNC_ON != 0 {
                    // Nominally VSYNC lasts 3 scanlines, but some games don't
                    // supply all of them.
                    self.vsync_finish_clock = clock + SCANLINE_CLOCKS;
                } else if clock >= self.vsync_finish_clock {
                    self.vsync_finish_clock = NO_HMOVE;
                    result.halt_cpu = true;
                    self.partial_frame = false;
                }
            }

            VBLANK => {
                // Dump-to-ground path for the paddle ports.
                if self.vblank & flags::VBLANK_DUMP_PORTS == 0
                    && value & flags::VBLANK_DUMP_PORTS != 0
                {
                    self.dump_enabled = true;
                } else if self.vblank & flags::VBLANK_DUMP_PORTS != 0
                    && value & flags::VBLANK_DUMP_PORTS == 0
                {
                    self.dump_enabled = false;
                    self.dump_disabled_cycle = bus.cycles;
                }

                if self.vblank & flags::VBLANK_INPUT_LATCH == 0 {
                    self.input_latch = [flags::INPUT_HIGH; 2];
                }

                // Remember the first scanline at which VBLANK is disabled;
                // usually the first scanline to start drawing.
                if self.start_scanline == 0 && value & 0x10 == 0 {
                    self.start_scanline = self.scanlines_at(clock);
                }

                self.vblank = value;
            }

            WSYNC => {
                // The CPU only halts on a read cycle, so the write half of
                // read-modify-write instructions is ignored.
                if bus.last_access_was_read {
                    let cycles_to_end_of_line = SCANLINE_CYCLES
                        - ((bus.cycles - self.clock_when_frame_started / PIXEL_CLOCKS)
                            % SCANLINE_CYCLES);
                    if cycles_to_end_of_line < SCANLINE_CYCLES {
                        result.consume_cycles = cycles_to_end_of_line;
                    }
                }
            }

            RSYNC => {}

            NUSIZ0 => {
                self.player0.write_nusiz(value);
                self.missile0.write_nusiz(value);
            }

            NUSIZ1 => {
                self.player1.write_nusiz(value);
                self.missile1.write_nusiz(value);
            }

            COLUP0 => {
                let color = self.lossy_color(value);
                self.colors[flags::P0_COLOR] = color;
                self.colors[flags::M0_COLOR] = color;
            }

            COLUP1 => {
                let color = self.lossy_color(value);
                self.colors[flags::P1_COLOR] = color;
                self.colors[flags::M1_COLOR] = color;
            }

            COLUPF => {
                let color = self.lossy_color(value);
                self.colors[flags::PF_COLOR] = color;
                self.colors[flags::BL_COLOR] = color;
            }

            COLUBK => {
                self.colors[flags::BK_COLOR] = self.lossy_color(value);
            }

            CTRLPF => {
                self.playfield.write_ctrlpf(value);
                self.ball.write_ctrlpf(value);
            }

            REFP0 => self.player0.write_refp(value, &self.tables),
            REFP1 => self.player1.write_refp(value, &self.tables),

            PF0 => self.playfield.write_pf0(value),
            PF1 => self.playfield.write_pf1(value),
            PF2 => self.playfield.write_pf2(value),

            RESP0 => {
                let beam = self.beam(clock);
                if let Some(reset) = self.player0.prepare_reset(&beam) {
                    if reset.timing == ResetTiming::DuringDisplay {
                        self.update_frame(clock + 11);
                    }
                    self.player0.commit_reset(reset);
                }
            }

            RESP1 => {
                let beam = self.beam(clock);
                if let Some(reset) = self.player1.prepare_reset(&beam) {
                    if reset.timing == ResetTiming::DuringDisplay {
                        self.update_frame(clock + 11);
                    }
                    self.player1.commit_reset(reset);
                }
            }

            RESM0 => {
                let beam = self.beam(clock);
                self.missile0.reset_position(&beam);
            }

            RESM1 => {
                let beam = self.beam(clock);
                self.missile1.reset_position(&beam);
            }

            RESBL => {
                let beam = self.beam(clock);
                self.ball.reset_position(&beam);
            }

            AUDC0 | AUDC1 | AUDF0 | AUDF1 | AUDV0 | AUDV1 => {
                self.sound.set(addr, value, bus.cycles);
            }

            GRP0 => {
                self.player0.write_grp(value, &self.tables);
                self.player1.commit_delayed_grp(&self.tables);
            }

            GRP1 => {
                self.player1.write_grp(value, &self.tables);
                self.player0.commit_delayed_grp(&self.tables);
                self.ball.commit_delayed_enable();
            }

            ENAM0 => self.missile0.write_enam(value),
            ENAM1 => self.missile1.write_enam(value),
            ENABL => self.ball.write_enabl(value),

            HMP0 => {
                let beam = self.beam(clock);
                self.player0.horizontal.write_motion(value, &beam);
            }
            HMP1 => {
                let beam = self.beam(clock);
                self.player1.horizontal.write_motion(value, &beam);
            }
            HMM0 => {
                let beam = self.beam(clock);
                self.missile0.horizontal.write_motion(value, &beam);
            }
            HMM1 => {
                let beam = self.beam(clock);
                self.missile1.horizontal.write_motion(value, &beam);
            }
            HMBL => {
                let beam = self.beam(clock);
                self.ball.horizontal.write_motion(value, &beam);
            }

            VDELP0 => self.player0.write_vdel(value, &self.tables),
            VDELP1 => self.player1.write_vdel(value, &self.tables),
            VDELBL => self.ball.write_vdel(value),

            RESMP0 => {
                self.missile0
                    .write_resmp(value, &self.player0, self.current_hmove_pos);
            }
            RESMP1 => {
                self.missile1
                    .write_resmp(value, &self.player1, self.current_hmove_pos);
            }

            HMOVE => {
                let hpos =
                    (clock - self.clock_when_frame_started) % SCANLINE_CLOCKS - HBLANK_CLOCKS;
                self.current_hmove_pos = hpos;

                let cycle_of_line =
                    ((clock - self.clock_when_frame_started) % SCANLINE_CLOCKS) / PIXEL_CLOCKS;
                self.hmove_blank_enabled = self.allow_hmove_blanks
                    && self.tables.hmove_blank_enable_cycles[cycle_of_line as usize];

                let beam = self.beam(clock);
                self.player0.apply_hmove(&beam);
                self.player1.apply_hmove(&beam);
                self.missile0.horizontal.apply_hmove(&beam);
                self.missile1.horizontal.apply_hmove(&beam);
                self.ball.horizontal.apply_hmove(&beam);

                // Strobes during the display are ignored entirely.
                if (-5..97).contains(&hpos) {
                    self.hmove_blank_enabled = false;
                    self.current_hmove_pos = NO_HMOVE;
                }
            }

            HMCLR => {
                let beam = self.beam(clock);
                self.player0.horizontal.write_motion(0, &beam);
                self.player1.horizontal.write_motion(0, &beam);
                self.missile0.horizontal.write_motion(0, &beam);
                self.missile1.horizontal.write_motion(0, &beam);
                self.ball.horizontal.write_motion(0, &beam);
            }

            CXCLR => self.collision = 0,

            _ => {
                log::debug!("poke to unmapped TIA register {:#04X}", addr);
            }
        }
        return result;
    }

    fn beam(&self, clock: i32) -> Beam {
        Beam {
            hpos: (clock - self.clock_when_frame_started) % SCANLINE_CLOCKS - HBLANK_CLOCKS,
            current_hmove_pos: self.current_hmove_pos,
            previous_hmove_pos: self.previous_hmove_pos,
        }
    }

    fn lossy_color(&self, value: u8) -> u8 {
        let mut color = value & 0xFE;
        if self.color_loss_enabled && self.scanline_count_for_last_frame & 0x01 != 0 {
            color |= 0x01;
        }
        return color;
    }

    /// Charge state of a dumped input port, as the D7 value of INPT0-INPT3.
    fn dumped_input_port(&self, readout: AnalogReadout, bus: &BusState) -> u8 {
        match readout {
            AnalogReadout::Minimum => flags::INPUT_HIGH,
            AnalogReadout::Maximum => 0x00,
            AnalogReadout::Resistance(_) if self.dump_enabled => 0x00,
            AnalogReadout::Resistance(ohms) => {
                // Constant derived from 1.6 * 0.01e-6 * 228 / 3: the RC rise
                // time of the dump capacitor, in CPU cycles per ohm.
                let needed = (1.216e-6
                    * f64::from(ohms)
                    * f64::from(self.scanline_count_for_last_frame)
                    * f64::from(self.framerate)) as i32;
                if bus.cycles - self.dump_disabled_cycle > needed {
                    flags::INPUT_HIGH
                } else {
                    0x00
                }
            }
        }
    }

    fn latched_button(&mut self, jack: Jack) -> u8 {
        let button = if self.controllers[jack].button() {
            flags::INPUT_HIGH
        } else {
            0x00
        };
        let index = match jack {
            Jack::Left => 0,
            Jack::Right => 1,
        };
        self.input_latch[index] = if self.vblank & flags::VBLANK_INPUT_LATCH != 0 {
            self.input_latch[index] & button
        } else {
            button
        };
        return self.input_latch[index];
    }

    fn scanlines_at(&self, clock: i32) -> u32 {
        ((clock - self.clock_when_frame_started) / SCANLINE_CLOCKS) as u32
    }

    // Frame geometry and introspection.

    pub fn width(&self) -> u32 {
        VISIBLE_PIXELS as u32
    }

    pub fn height(&self) -> u32 {
        self.frame_height
    }

    pub fn ystart(&self) -> u32 {
        self.frame_ystart
    }

    /// Takes effect at the next [`Tia::frame_reset`].
    pub fn set_height(&mut self, height: u32) {
        self.frame_height = height;
    }

    /// Takes effect at the next [`Tia::frame_reset`].
    pub fn set_ystart(&mut self, ystart: u32) {
        self.frame_ystart = ystart;
    }

    /// The visible window of the frame buffer, `width() * height()` indexed
    /// color pixels starting at `ystart()`.
    pub fn frame_buffer(&self) -> &[u8] {
        let end = (self.frame_pointer_offset
            + (self.frame_height as usize) * (VISIBLE_PIXELS as usize))
            .min(BUFFER_SIZE);
        &self.current_buffer[self.frame_pointer_offset..end]
    }

    pub fn previous_frame_buffer(&self) -> &[u8] {
        let end = (self.frame_pointer_offset
            + (self.frame_height as usize) * (VISIBLE_PIXELS as usize))
            .min(BUFFER_SIZE);
        &self.previous_buffer[self.frame_pointer_offset..end]
    }

    /// Number of scanlines completed in the current frame.
    pub fn scanlines(&self, bus: &BusState) -> u32 {
        self.scanlines_at(bus.cycles * PIXEL_CLOCKS)
    }

    /// Color clocks completed on the current scanline.
    pub fn clocks_this_line(&self, bus: &BusState) -> i32 {
        (bus.cycles * PIXEL_CLOCKS - self.clock_when_frame_started) % SCANLINE_CLOCKS
    }

    /// Position of the beam within the visible window, if it is there.
    pub fn scanline_pos(&self) -> Option<(u32, u32)> {
        if !self.partial_frame {
            return None;
        }
        let clocks = self.frame_pointer_clocks as usize;
        if clocks < self.frame_pointer_offset {
            return None;
        }
        let rel = clocks - self.frame_pointer_offset;
        return Some(
            ((rel % VISIBLE_PIXELS as usize) as u32, (rel / VISIBLE_PIXELS as usize) as u32),
        );
    }

    pub fn partial_frame(&self) -> bool {
        self.partial_frame
    }

    pub fn scanline_count_for_last_frame(&self) -> u32 {
        self.scanline_count_for_last_frame
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Frames with a PAL-like scanline count; lets the console autodetect the
    /// TV system after a few frames.
    pub fn pal_frame_counter(&self) -> u32 {
        self.pal_frame_counter
    }

    pub fn framerate(&self) -> f32 {
        self.framerate
    }

    pub fn is_pal(&self) -> bool {
        self.maximum_number_of_scanlines == 342
    }

    pub fn enable_auto_frame(&mut self, enabled: bool) {
        self.auto_frame_enabled = enabled;
    }

    pub fn enable_color_loss(&mut self, enabled: bool) {
        self.color_loss_enabled = enabled;
    }

    // Debugger toggles.

    /// Shows or hides one object, by its presence bit from [`flags`].
    pub fn set_object_enabled(&mut self, bit: u8, enabled: bool) {
        if enabled {
            self.enabled_objects |= bit;
        } else {
            self.enabled_objects &= !bit;
        }
    }

    pub fn toggle_object(&mut self, bit: u8) -> bool {
        let enabled = self.enabled_objects & bit == 0;
        self.set_object_enabled(bit, enabled);
        return enabled;
    }

    pub fn enable_objects(&mut self, enabled: bool) {
        for bit in [
            flags::P0_BIT,
            flags::P1_BIT,
            flags::M0_BIT,
            flags::M1_BIT,
            flags::BL_BIT,
            flags::PF_BIT,
        ] {
            self.set_object_enabled(bit, enabled);
        }
        self.bits_enabled = enabled;
    }

    pub fn toggle_objects(&mut self) -> bool {
        self.bits_enabled = !self.bits_enabled;
        self.enable_objects(self.bits_enabled);
        return self.bits_enabled;
    }

    /// Enables or disables collision detection for one object.
    pub fn set_collision_enabled(&mut self, bit: u8, enabled: bool) {
        let mut enables = (self.collision_enabled_mask >> 16) as u16;
        if enabled {
            enables |= u16::from(bit);
        } else {
            enables &= !u16::from(bit);
        }
        self.rebuild_collision_mask(enables);
    }

    pub fn toggle_collision(&mut self, bit: u8) -> bool {
        let enabled = (self.collision_enabled_mask >> 16) & u32::from(bit) == 0;
        self.set_collision_enabled(bit, enabled);
        return enabled;
    }

    pub fn enable_collisions(&mut self, enabled: bool) {
        for bit in [
            flags::P0_BIT,
            flags::P1_BIT,
            flags::M0_BIT,
            flags::M1_BIT,
            flags::BL_BIT,
            flags::PF_BIT,
        ] {
            self.set_collision_enabled(bit, enabled);
        }
        self.collisions_enabled = enabled;
    }

    pub fn toggle_collisions(&mut self) -> bool {
        self.collisions_enabled = !self.collisions_enabled;
        self.enable_collisions(self.collisions_enabled);
        return self.collisions_enabled;
    }

    pub fn toggle_hmove_blanks(&mut self) -> bool {
        self.allow_hmove_blanks = !self.allow_hmove_blanks;
        return self.allow_hmove_blanks;
    }

    /// Replaces the color registers with per-object debug colors.
    pub fn set_fixed_colors(&mut self, on: bool) {
        self.fixed_colors_on = on;
        // The encoder depends on this flag: fixed colors disable the score
        // mode's split playfield coloring.
        self.rebuild_priority_encoder();
    }

    pub fn toggle_fixed_colors(&mut self) -> bool {
        self.set_fixed_colors(!self.fixed_colors_on);
        return self.fixed_colors_on;
    }

    fn rebuild_collision_mask(&mut self, enables: u16) {
        use flags::*;
        let on = |bit: u8| enables & u16::from(bit) != 0;

        // Assume all pairs are on, then turn off every pair that touches a
        // disabled object.
        let mut mask = 0xFFFFu16;
        if !on(P0_BIT) {
            mask &= !(CX_M0P0 | CX_M1P0 | CX_P0PF | CX_P0BL | CX_P0P1);
        }
        if !on(P1_BIT) {
            mask &= !(CX_M0P1 | CX_M1P1 | CX_P1PF | CX_P1BL | CX_P0P1);
        }
        if !on(M0_BIT) {
            mask &= !(CX_M0P0 | CX_M0P1 | CX_M0PF | CX_M0BL | CX_M0M1);
        }
        if !on(M1_BIT) {
            mask &= !(CX_M1P0 | CX_M1P1 | CX_M1PF | CX_M1BL | CX_M0M1);
        }
        if !on(BL_BIT) {
            mask &= !(CX_P0BL | CX_P1BL | CX_M0BL | CX_M1BL | CX_BLPF);
        }
        if !on(PF_BIT) {
            mask &= !(CX_P0PF | CX_P1PF | CX_M0PF | CX_M1PF | CX_BLPF);
        }

        self.collision_enabled_mask = (u32::from(enables) << 16) | u32::from(mask);
    }

    fn rebuild_priority_encoder(&mut self) {
        let fixed = self.fixed_colors_on;
        for half in 0..2 {
            for enabled in 0..256usize {
                let bits = enabled as u8;
                let color;
                if bits & flags::PRIORITY_BIT != 0 {
                    // Priority from highest to lowest: PF/BL, P0/M0, P1/M1,
                    // BK. With the playfield on top, score mode is moot.
                    let mut c = flags::BK_COLOR;
                    if bits & flags::M1_BIT != 0 {
                        c = flags::M1_COLOR;
                    }
                    if bits & flags::P1_BIT != 0 {
                        c = flags::P1_COLOR;
                    }
                    if bits & flags::M0_BIT != 0 {
                        c = flags::M0_COLOR;
                    }
                    if bits & flags::P0_BIT != 0 {
                        c = flags::P0_COLOR;
                    }
                    if bits & flags::BL_BIT != 0 {
                        c = flags::BL_COLOR;
                    }
                    if bits & flags::PF_BIT != 0 {
                        c = flags::PF_COLOR;
                    }
                    color = c;
                } else {
                    // Priority from highest to lowest: P0/M0, P1/M1, PF/BL,
                    // BK. In score mode each half of the playfield borrows a
                    // player's color.
                    let mut c = flags::BK_COLOR;
                    if bits & flags::BL_BIT != 0 {
                        c = flags::BL_COLOR;
                    }
                    if bits & flags::PF_BIT != 0 {
                        c = if !fixed && bits & flags::SCORE_BIT != 0 {
                            if half == 0 {
                                flags::P0_COLOR
                            } else {
                                flags::P1_COLOR
                            }
                        } else {
                            flags::PF_COLOR
                        };
                    }
                    if bits & flags::M1_BIT != 0 {
                        c = flags::M1_COLOR;
                    }
                    if bits & flags::P1_BIT != 0 {
                        c = flags::P1_COLOR;
                    }
                    if bits & flags::M0_BIT != 0 {
                        c = flags::M0_COLOR;
                    }
                    if bits & flags::P0_BIT != 0 {
                        c = flags::P0_COLOR;
                    }
                    color = c;
                }
                self.priority_encoder[half][enabled] = color as u8;
            }
        }
    }

    // Save states.

    pub fn save(&self, out: &mut Serializer) -> Result<(), SerializationError> {
        out.put_string(TIA_TAG);

        out.put_int(self.clock_when_frame_started as u32);
        out.put_int(self.clock_start_display as u32);
        out.put_int(self.clock_stop_display as u32);
        out.put_int(self.clock_at_last_update as u32);
        out.put_int(self.clocks_to_end_of_scanline as u32);
        out.put_int(self.scanline_count_for_last_frame);
        out.put_int(self.vsync_finish_clock as u32);

        out.put_byte(self.enabled_objects);

        out.put_byte(self.vsync);
        out.put_byte(self.vblank);

        for color in self.colors {
            out.put_int(u32::from(color));
        }

        out.put_short(self.collision);
        out.put_int(self.collision_enabled_mask);

        out.put_bool(self.dump_enabled);
        out.put_int(self.dump_disabled_cycle as u32);

        out.put_int(self.current_hmove_pos as u32);
        out.put_int(self.previous_hmove_pos as u32);
        out.put_bool(self.hmove_blank_enabled);

        out.put_int(self.frame_counter);
        out.put_int(self.pal_frame_counter);

        self.playfield.save(out);
        self.player0.save(out);
        self.player1.save(out);
        self.missile0.save(out);
        self.missile1.save(out);
        self.ball.save(out);

        self.sound.save(out)?;
        return Ok(());
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        input.expect_tag(TIA_TAG)?;

        self.clock_when_frame_started = input.get_int()? as i32;
        self.clock_start_display = input.get_int()? as i32;
        self.clock_stop_display = input.get_int()? as i32;
        self.clock_at_last_update = input.get_int()? as i32;
        self.clocks_to_end_of_scanline = input.get_int()? as i32;
        self.scanline_count_for_last_frame = input.get_int()?;
        self.vsync_finish_clock = input.get_int()? as i32;

        self.enabled_objects = input.get_byte()?;

        self.vsync = input.get_byte()?;
        self.vblank = input.get_byte()?;

        for color in self.colors.iter_mut() {
            *color = input.get_int()? as u8;
        }

        self.collision = input.get_short()?;
        self.collision_enabled_mask = input.get_int()?;

        self.dump_enabled = input.get_bool()?;
        self.dump_disabled_cycle = input.get_int()? as i32;

        self.current_hmove_pos = input.get_int()? as i32;
        self.previous_hmove_pos = input.get_int()? as i32;
        self.hmove_blank_enabled = input.get_bool()?;

        self.frame_counter = input.get_int()?;
        self.pal_frame_counter = input.get_int()?;

        self.playfield.load(input)?;
        self.player0.load(input)?;
        self.player1.load(input)?;
        self.missile0.load(input)?;
        self.missile1.load(input)?;
        self.ball.load(input)?;

        self.sound.load(input)?;

        // Debugger state is not part of the stream; reset it.
        self.enable_objects(true);
        self.set_fixed_colors(false);
        self.allow_hmove_blanks = true;
        return Ok(());
    }

    /// Saves the frame buffer contents, separately from the register state.
    pub fn save_display(&self, out: &mut Serializer) {
        out.put_bool(self.partial_frame);
        out.put_int(self.frame_pointer_clocks);
        out.put_byte_array(&self.current_buffer[..]);
    }

    pub fn load_display(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.partial_frame = input.get_bool()?;
        self.frame_pointer_clocks = input.get_int()?;

        self.current_buffer.fill(0);
        self.previous_buffer.fill(0);
        let data = input.get_byte_array()?;
        let count = data.len().min(BUFFER_SIZE);
        self.current_buffer[..count].copy_from_slice(&data[..count]);
        self.previous_buffer[..count].copy_from_slice(&data[..count]);

        // In partial-frame mode, re-create the paint position as it was when
        // the state was saved.
        self.frame_pointer = if self.partial_frame {
            self.frame_pointer_clocks as usize
        } else {
            0
        };
        return Ok(());
    }
}
