use super::registers::*;
use super::*;
use crate::controller::{Joystick, MockController, NullController};
use crate::sound::NullSound;
use enum_map::enum_map;
use itertools::assert_equal;
use std::cell::RefCell;
use std::rc::Rc;

fn bus(cycles: i32) -> BusState {
    BusState {
        cycles,
        data_bus: 0,
        last_access_was_read: true,
    }
}

fn tia_with_settings(settings: Settings) -> Tia {
    Tia::new(
        settings,
        Box::new(NullSound),
        enum_map! { _ => Box::new(NullController) as Box<dyn Controller> },
    )
}

fn tia_with_controllers(left: Box<dyn Controller>, right: Box<dyn Controller>) -> Tia {
    let mut left = Some(left);
    let mut right = Some(right);
    Tia::new(
        Settings::default(),
        Box::new(NullSound),
        enum_map! {
            Jack::Left => left.take().unwrap(),
            Jack::Right => right.take().unwrap(),
        },
    )
}

fn new_tia() -> Tia {
    tia_with_settings(Settings::default())
}

fn poke(tia: &mut Tia, cycles: i32, addr: u16, value: u8) -> PokeResult {
    tia.poke(addr, value, &bus(cycles))
}

fn peek(tia: &mut Tia, cycles: i32, addr: u16) -> u8 {
    tia.peek(addr, &bus(cycles))
}

/// Paints up to the end of the given scanline and returns its visible pixels,
/// encoded with one character per color from `legend`.
fn raster_line(tia: &mut Tia, line: i32, legend: &[(u8, char)]) -> String {
    tia.update_frame((line + 1) * SCANLINE_CLOCKS);
    let start = (line as usize) * (VISIBLE_PIXELS as usize);
    tia.current_buffer[start..start + VISIBLE_PIXELS as usize]
        .iter()
        .map(|&pixel| {
            legend
                .iter()
                .find(|&&(color, _)| color == pixel)
                .map(|&(_, symbol)| symbol)
                .unwrap_or('?')
        })
        .collect()
}

/// Issues a fixed list of `(cycle, register, value)` pokes, honoring halt
/// requests the way a real CPU core would.
struct ScriptedCpu {
    cycles: i32,
    script: Vec<(i32, u16, u8)>,
}

impl ScriptedCpu {
    fn new(script: Vec<(i32, u16, u8)>) -> Self {
        ScriptedCpu { cycles: 0, script }
    }
}

impl Cpu for ScriptedCpu {
    fn execute(&mut self, _max_instructions: u32, tia: &mut Tia) {
        for index in 0..self.script.len() {
            let (cycles, addr, value) = self.script[index];
            self.cycles = cycles;
            let result = tia.poke(addr, value, &bus(cycles));
            self.cycles += result.consume_cycles;
            if result.halt_cpu {
                return;
            }
        }
    }

    fn cycles(&self) -> i32 {
        self.cycles
    }

    fn reset_cycles(&mut self) {
        self.cycles = 0;
    }
}

/// Captures audio register writes for inspection.
struct RecordingSound {
    writes: Rc<RefCell<Vec<(u16, u8, i32)>>>,
}

impl Sound for RecordingSound {
    fn reset(&mut self) {
        self.writes.borrow_mut().clear();
    }

    fn set(&mut self, address: u16, value: u8, cycle: i32) {
        self.writes.borrow_mut().push((address, value, cycle));
    }

    fn adjust_cycle_counter(&mut self, _delta: i32) {}

    fn save(&self, _out: &mut Serializer) -> Result<(), SerializationError> {
        Ok(())
    }

    fn load(&mut self, _input: &mut Deserializer) -> Result<(), SerializationError> {
        Ok(())
    }
}

#[test]
fn background_color_fills_the_scanline() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    let line = raster_line(&mut tia, 0, &[(0x88, '=')]);
    assert_eq!(line, "=".repeat(160));
}

#[test]
fn vertical_blank_forces_black() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    poke(&mut tia, 0, VBLANK, flags::VBLANK_ON);
    let legend = [(0x88, '='), (0x00, '.')];
    assert_eq!(raster_line(&mut tia, 0, &legend), ".".repeat(160));

    // Disabling VBLANK resumes painting mid-frame.
    poke(&mut tia, SCANLINE_CYCLES, VBLANK, 0);
    assert_eq!(raster_line(&mut tia, 1, &legend), "=".repeat(160));
}

#[test]
fn playfield_repeats_and_reflects() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUPF, 0x46);
    poke(&mut tia, 0, PF0, 0x10);
    let legend = [(0x46, 'X'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 0, &legend),
        format!(
            "{}{}{}{}",
            "X".repeat(4),
            ".".repeat(76),
            "X".repeat(4),
            ".".repeat(76)
        )
    );

    poke(&mut tia, SCANLINE_CYCLES, CTRLPF, flags::CTRLPF_REFLECT);
    assert_eq!(
        raster_line(&mut tia, 1, &legend),
        format!("{}{}{}", "X".repeat(4), ".".repeat(152), "X".repeat(4))
    );
}

#[test]
fn score_mode_borrows_player_colors() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, COLUP1, 0x8A);
    poke(&mut tia, 0, COLUPF, 0x46);
    poke(&mut tia, 0, PF0, 0xF0);
    poke(&mut tia, 0, CTRLPF, flags::CTRLPF_SCORE);
    let legend = [(0x4A, '0'), (0x8A, '1'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 0, &legend),
        format!(
            "{}{}{}{}",
            "0".repeat(16),
            ".".repeat(64),
            "1".repeat(16),
            ".".repeat(64)
        )
    );
}

#[test]
fn playfield_priority_covers_players() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, COLUPF, 0x46);
    poke(&mut tia, 0, PF0, 0xF0);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 0, CTRLPF, flags::CTRLPF_PRIORITY);
    poke(&mut tia, 2, RESP0, 0); // hblank strobe: lands at column 3
    let legend = [(0x46, 'X'), (0x4A, '0'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 0, &legend),
        format!(
            "{}{}{}{}",
            "X".repeat(16),
            ".".repeat(64),
            "X".repeat(16),
            ".".repeat(64)
        )
    );

    poke(&mut tia, SCANLINE_CYCLES, CTRLPF, 0);
    assert_eq!(
        raster_line(&mut tia, 1, &legend),
        format!(
            "{}{}{}{}{}{}",
            "XXX",
            "0".repeat(8),
            "X".repeat(5),
            ".".repeat(64),
            "X".repeat(16),
            ".".repeat(64)
        )
    );
}

#[test]
fn player_reset_suppresses_the_rest_of_the_line() {
    let mut tia = new_tia();
    poke(&mut tia, 1, COLUP0, 0x4A);
    poke(&mut tia, 30, RESP0, 0); // line 0, beam at 22: lands at column 27
    poke(&mut tia, 80, GRP0, 0xFF);
    poke(&mut tia, 190, RESP0, 0); // line 2, beam at 46: lands at column 51
    let legend = [(0x4A, '0'), (0x00, '.')];
    let stationary = format!("{}{}{}", ".".repeat(27), "0".repeat(8), ".".repeat(125));
    assert_eq!(raster_line(&mut tia, 1, &legend), stationary);
    // On the line of the second strobe the old copy was already painted and
    // the new position stays suppressed until the end of the line.
    assert_eq!(raster_line(&mut tia, 2, &legend), stationary);
    assert_eq!(
        raster_line(&mut tia, 3, &legend),
        format!("{}{}{}", ".".repeat(51), "0".repeat(8), ".".repeat(101))
    );
}

#[test]
fn nusiz_draws_multiple_player_copies() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 0, NUSIZ0, 0x01); // two copies, close together
    poke(&mut tia, 30, RESP0, 0);
    let legend = [(0x4A, '0'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 2, &legend),
        format!(
            "{}{}{}{}{}",
            ".".repeat(27),
            "0".repeat(8),
            ".".repeat(8),
            "0".repeat(8),
            ".".repeat(109)
        )
    );
}

#[test]
fn missile_and_ball_land_four_clocks_past_the_beam() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A); // missile 0 shares player 0's color
    poke(&mut tia, 0, COLUPF, 0x46); // the ball shares the playfield's
    poke(&mut tia, 0, ENAM0, flags::ENAXX_ENABLE);
    poke(&mut tia, 0, ENABL, flags::ENAXX_ENABLE);
    poke(&mut tia, 100, RESM0, 0); // line 1, beam at 4: lands at column 8
    poke(&mut tia, 110, RESBL, 0); // line 1, beam at 34: lands at column 38
    let legend = [(0x4A, 'm'), (0x46, 'b'), (0x00, '.')];
    // Both render one clock after their position counter.
    assert_eq!(
        raster_line(&mut tia, 2, &legend),
        format!("{}m{}b{}", ".".repeat(9), ".".repeat(29), ".".repeat(120))
    );
}

#[test]
fn hmove_in_hblank_shifts_objects_and_blanks_eight_pixels() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 30, RESP0, 0); // lands at column 27
    poke(&mut tia, 40, HMP0, 0x30); // +3: three clocks to the left
    poke(&mut tia, 152, HMOVE, 0); // strobed at the start of line 2
    let legend = [(0x88, '='), (0x4A, '0'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 1, &legend),
        format!("{}{}{}", "=".repeat(27), "0".repeat(8), "=".repeat(125))
    );
    assert_eq!(
        raster_line(&mut tia, 2, &legend),
        format!(
            "{}{}{}{}",
            ".".repeat(8),
            "=".repeat(16),
            "0".repeat(8),
            "=".repeat(128)
        )
    );
}

#[test]
fn hmove_during_display_is_ignored() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 30, RESP0, 0);
    poke(&mut tia, 40, HMP0, 0x30);
    poke(&mut tia, 110, HMOVE, 0); // beam at 34, inside the ignore window
    let legend = [(0x4A, '0'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 2, &legend),
        format!("{}{}{}", ".".repeat(27), "0".repeat(8), ".".repeat(125))
    );
}

#[test]
fn hmclr_zeroes_all_motion_registers() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 30, RESP0, 0);
    poke(&mut tia, 40, HMP0, 0x30);
    poke(&mut tia, 50, HMCLR, 0);
    poke(&mut tia, 152, HMOVE, 0);
    let legend = [(0x4A, '0'), (0x00, '.')];
    // With HM cleared, HMOVE applies the neutral 8 - 8 = 0 shift.
    assert_eq!(
        raster_line(&mut tia, 2, &legend),
        format!("{}{}{}", ".".repeat(27), "0".repeat(8), ".".repeat(125))
    );
}

#[test]
fn hmove_blanks_can_be_disabled() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    assert!(!tia.toggle_hmove_blanks());
    poke(&mut tia, 152, HMOVE, 0);
    let legend = [(0x88, '='), (0x00, '.')];
    assert_eq!(raster_line(&mut tia, 2, &legend), "=".repeat(160));
}

#[test]
fn wsync_consumes_cycles_to_the_end_of_the_scanline() {
    let mut tia = new_tia();
    assert_eq!(poke(&mut tia, 30, WSYNC, 0).consume_cycles, 46);
    assert_eq!(poke(&mut tia, 76, WSYNC, 0).consume_cycles, 0);
    assert_eq!(poke(&mut tia, 100, WSYNC, 0).consume_cycles, 52);

    // The write half of a read-modify-write instruction doesn't halt.
    let result = tia.poke(
        WSYNC,
        0,
        &BusState {
            cycles: 30,
            data_bus: 0,
            last_access_was_read: false,
        },
    );
    assert_eq!(result.consume_cycles, 0);
}

#[test]
fn vsync_ends_the_frame_after_a_full_scanline() {
    let mut tia = new_tia();
    tia.partial_frame = true;
    poke(&mut tia, 100, VSYNC, flags::VSYNC_ON);
    // Too early: VSYNC hasn't lasted a scanline yet.
    let result = poke(&mut tia, 120, VSYNC, 0);
    assert!(!result.halt_cpu);
    assert!(tia.partial_frame);

    poke(&mut tia, 150, VSYNC, flags::VSYNC_ON);
    let result = poke(&mut tia, 230, VSYNC, 0);
    assert!(result.halt_cpu);
    assert!(!tia.partial_frame);
}

#[test]
fn runaway_frame_without_vsync_halts_the_cpu() {
    let mut tia = new_tia();
    tia.partial_frame = true;
    let result = poke(&mut tia, 290 * SCANLINE_CYCLES, COLUBK, 0x88);
    assert!(result.halt_cpu);
    assert!(!tia.partial_frame);
}

#[test]
fn collisions_latch_until_cxclr() {
    let mut tia = new_tia();
    poke(&mut tia, 0, PF0, 0xF0);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 2, RESP0, 0); // lands at column 3, inside the playfield
    assert_eq!(peek(&mut tia, SCANLINE_CYCLES, CXP0FB), 0x80);
    assert_eq!(peek(&mut tia, SCANLINE_CYCLES, CXM0FB), 0x00);

    // The latch survives scanlines where the objects no longer overlap.
    poke(&mut tia, SCANLINE_CYCLES, GRP0, 0x00);
    assert_eq!(peek(&mut tia, 2 * SCANLINE_CYCLES, CXP0FB), 0x80);

    poke(&mut tia, 2 * SCANLINE_CYCLES, CXCLR, 0);
    assert_eq!(peek(&mut tia, 3 * SCANLINE_CYCLES, CXP0FB), 0x00);
}

#[test]
fn collision_toggles_mask_the_latch_without_clearing_it() {
    let mut tia = new_tia();
    poke(&mut tia, 0, PF0, 0xF0);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 2, RESP0, 0);

    tia.set_collision_enabled(flags::P0_BIT, false);
    assert_eq!(peek(&mut tia, SCANLINE_CYCLES, CXP0FB), 0x00);
    tia.set_collision_enabled(flags::P0_BIT, true);
    assert_eq!(peek(&mut tia, SCANLINE_CYCLES, CXP0FB), 0x80);
}

#[test]
fn hidden_objects_neither_render_nor_collide() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, COLUPF, 0x46);
    poke(&mut tia, 0, PF0, 0xF0);
    poke(&mut tia, 0, GRP0, 0xFF);
    poke(&mut tia, 2, RESP0, 0);
    tia.set_object_enabled(flags::P0_BIT, false);
    let legend = [(0x46, 'X'), (0x4A, '0'), (0x00, '.')];
    assert_eq!(
        raster_line(&mut tia, 0, &legend),
        format!(
            "{}{}{}{}",
            "X".repeat(16),
            ".".repeat(64),
            "X".repeat(16),
            ".".repeat(64)
        )
    );
    assert_eq!(peek(&mut tia, SCANLINE_CYCLES, CXP0FB), 0x00);
}

#[test]
fn fixed_colors_override_the_palette() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    tia.set_fixed_colors(true);
    // The NTSC debug palette paints the background 0x0a.
    let line = raster_line(&mut tia, 0, &[(0x0a, '=')]);
    assert_eq!(line, "=".repeat(160));
    assert!(!tia.toggle_fixed_colors());
}

#[test]
fn undriven_bits_mirror_the_data_bus() {
    let mut tia = new_tia();
    let value = tia.peek(
        INPT0,
        &BusState {
            cycles: 0,
            data_bus: 0x35,
            last_access_was_read: true,
        },
    );
    assert_eq!(value, 0x35);
}

#[test]
fn inpt4_latches_the_button_when_enabled() {
    let mut left = MockController::new();
    let mut seq = mockall::Sequence::new();
    left.expect_button()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(true);
    left.expect_button()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(false);
    left.expect_button()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(true);
    let mut tia = tia_with_controllers(Box::new(left), Box::new(NullController));

    poke(&mut tia, 0, VBLANK, flags::VBLANK_INPUT_LATCH);
    assert_eq!(peek(&mut tia, 1, INPT4), 0x80);
    assert_eq!(peek(&mut tia, 2, INPT4), 0x00);
    // Releasing the button doesn't release the latch.
    assert_eq!(peek(&mut tia, 3, INPT4), 0x00);
}

#[test]
fn joystick_fire_button_drives_inpt4() {
    let mut tia = tia_with_controllers(
        Box::new(Joystick {
            fire_pressed: false,
        }),
        Box::new(NullController),
    );
    assert_eq!(peek(&mut tia, 0, INPT4), 0x80);

    let mut tia = tia_with_controllers(
        Box::new(Joystick { fire_pressed: true }),
        Box::new(NullController),
    );
    assert_eq!(peek(&mut tia, 0, INPT4), 0x00);
}

#[test]
fn grounded_and_open_analog_pins_read_instantly() {
    let mut left = MockController::new();
    left.expect_read_analog()
        .with(mockall::predicate::eq(AnalogPin::Nine))
        .return_const(AnalogReadout::Minimum);
    left.expect_read_analog()
        .with(mockall::predicate::eq(AnalogPin::Five))
        .return_const(AnalogReadout::Maximum);
    let mut tia = tia_with_controllers(Box::new(left), Box::new(NullController));
    assert_eq!(peek(&mut tia, 0, INPT0), 0x80);
    assert_eq!(peek(&mut tia, 0, INPT1), 0x00);
}

#[test]
fn paddle_ports_charge_through_the_dump_capacitor() {
    let mut right = MockController::new();
    right
        .expect_read_analog()
        .return_const(AnalogReadout::Resistance(100_000));
    let mut tia = tia_with_controllers(Box::new(NullController), Box::new(right));
    tia.scanline_count_for_last_frame = 262;

    // 1.216e-6 * 100kOhm * 262 lines * 60 Hz comes to 1911 cycles to charge.
    assert_eq!(peek(&mut tia, 1000, INPT2), 0x00);
    assert_eq!(peek(&mut tia, 3000, INPT2), 0x80);

    // Grounding the ports drains the capacitor.
    poke(&mut tia, 3000, VBLANK, flags::VBLANK_DUMP_PORTS);
    assert_eq!(peek(&mut tia, 3001, INPT2), 0x00);

    // After the dump ends, the charge starts over from the dump cycle.
    poke(&mut tia, 3002, VBLANK, 0);
    assert_eq!(peek(&mut tia, 4000, INPT2), 0x00);
    assert_eq!(peek(&mut tia, 3002 + 2000, INPT2), 0x80);
}

#[test]
fn audio_writes_are_forwarded_with_timestamps() {
    let writes = Rc::new(RefCell::new(Vec::new()));
    let sound = RecordingSound {
        writes: Rc::clone(&writes),
    };
    let mut tia = Tia::new(
        Settings::default(),
        Box::new(sound),
        enum_map! { _ => Box::new(NullController) as Box<dyn Controller> },
    );
    poke(&mut tia, 10, AUDC0, 0x05);
    poke(&mut tia, 20, AUDF1, 0x1F);
    poke(&mut tia, 30, AUDV0, 0x0A);
    assert_equal(
        writes.borrow().iter().copied(),
        [(AUDC0, 0x05, 10), (AUDF1, 0x1F, 20), (AUDV0, 0x0A, 30)],
    );
}

#[test]
fn update_runs_a_whole_frame() {
    let mut tia = new_tia();
    let mut cpu = ScriptedCpu::new(vec![
        (0, VBLANK, 0),
        (100, COLUBK, 0x88),
        (19830, VSYNC, flags::VSYNC_ON),
        (19910, VSYNC, 0),
    ]);
    tia.update(&mut cpu);

    assert!(!tia.partial_frame());
    assert_eq!(tia.frame_counter(), 1);
    assert_eq!(tia.scanline_count_for_last_frame(), 261);
    // The visible window starts at ystart and carries the background color.
    assert_eq!(tia.frame_buffer().len(), 210 * 160);
    assert_eq!(tia.frame_buffer()[0], 0x88);
}

#[test]
fn frames_ending_before_the_first_visible_scanline_are_discarded() {
    let mut tia = new_tia();
    let mut cpu = ScriptedCpu::new(vec![
        (3810, VSYNC, flags::VSYNC_ON),
        (3880, VBLANK, 0),
        (3890, VSYNC, 0),
    ]);
    tia.update(&mut cpu);

    assert_eq!(tia.frame_counter(), 0);
    // The restart rebased the cycle counter.
    assert_eq!(cpu.cycles(), 0);
}

#[test]
fn auto_frame_detects_the_framerate_from_the_scanline_count() {
    let mut tia = tia_with_settings(Settings {
        framerate: 0.0,
        ..Settings::default()
    });
    let mut cpu = ScriptedCpu::new(vec![(19830, VSYNC, flags::VSYNC_ON), (19910, VSYNC, 0)]);
    tia.update(&mut cpu);
    assert_eq!(tia.scanline_count_for_last_frame(), 261);
    assert!((tia.framerate() - 15720.0 / 261.0).abs() < 1e-3);
}

#[test]
fn pal_framerates_use_the_pal_geometry() {
    let tia = tia_with_settings(Settings {
        framerate: 50.0,
        ..Settings::default()
    });
    assert!(tia.is_pal());
    assert_eq!(tia.maximum_number_of_scanlines, 342);
    assert_eq!(tia.stop_display_offset, SCANLINE_CLOCKS * 312);

    let tia = new_tia();
    assert!(!tia.is_pal());
    assert_eq!(tia.maximum_number_of_scanlines, 290);
    assert_eq!(tia.stop_display_offset, SCANLINE_CLOCKS * 262);
}

#[test]
fn pal_color_loss_forces_luminance_parity_on_odd_frames() {
    let mut tia = tia_with_settings(Settings {
        framerate: 50.0,
        color_loss: true,
        ..Settings::default()
    });
    tia.scanline_count_for_last_frame = 263;
    poke(&mut tia, 0, COLUP0, 0x44);
    assert_eq!(tia.colors[flags::P0_COLOR], 0x45);

    tia.scanline_count_for_last_frame = 262;
    poke(&mut tia, 1, COLUP0, 0x44);
    assert_eq!(tia.colors[flags::P0_COLOR], 0x44);

    // Starting a frame reapplies the parity to the stored colors.
    tia.scanline_count_for_last_frame = 263;
    tia.start_frame(&mut ScriptedCpu::new(vec![]));
    assert_eq!(tia.colors[flags::P0_COLOR], 0x45);
}

#[test]
fn beam_position_helpers_track_the_cpu_cycle_counter() {
    let tia = new_tia();
    assert_eq!(tia.scanlines(&bus(100)), 1);
    assert_eq!(tia.clocks_this_line(&bus(100)), 300 - 228);
}

#[test]
fn scanline_pos_reports_the_beam_inside_the_visible_window() {
    let mut tia = new_tia();
    assert_eq!(tia.scanline_pos(), None);
    tia.partial_frame = true;
    // Still inside the vertical blanking area above ystart.
    tia.update_frame(10 * SCANLINE_CLOCKS);
    assert_eq!(tia.scanline_pos(), None);
    tia.update_frame(44 * SCANLINE_CLOCKS + HBLANK_CLOCKS + 10);
    assert_eq!(tia.scanline_pos(), Some((10, 10)));
}

#[test]
fn save_load_round_trip_preserves_the_register_state() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    poke(&mut tia, 0, COLUP0, 0x4A);
    poke(&mut tia, 0, PF1, 0xA5);
    poke(&mut tia, 0, GRP0, 0x3C);
    poke(&mut tia, 30, RESP0, 0);
    poke(&mut tia, 40, HMP0, 0x30);
    poke(&mut tia, 60, ENAM1, flags::ENAXX_ENABLE);
    tia.update_frame(SCANLINE_CLOCKS);

    let mut out = Serializer::new();
    tia.save(&mut out).unwrap();
    let bytes = out.into_bytes();

    let mut restored = new_tia();
    restored.load(&mut Deserializer::new(&bytes)).unwrap();

    let mut second = Serializer::new();
    restored.save(&mut second).unwrap();
    assert_eq!(second.into_bytes(), bytes);
}

#[test]
fn load_rejects_foreign_streams() {
    let mut out = Serializer::new();
    out.put_string("RIOT");
    let bytes = out.into_bytes();
    let mut tia = new_tia();
    assert!(matches!(
        tia.load(&mut Deserializer::new(&bytes)),
        Err(SerializationError::TagMismatch { .. })
    ));
}

#[test]
fn display_state_round_trips_with_the_paint_position() {
    let mut tia = new_tia();
    poke(&mut tia, 0, COLUBK, 0x88);
    tia.partial_frame = true;
    tia.update_frame(5 * SCANLINE_CLOCKS);

    let mut out = Serializer::new();
    tia.save_display(&mut out);
    let bytes = out.into_bytes();

    let mut restored = new_tia();
    restored.load_display(&mut Deserializer::new(&bytes)).unwrap();
    assert!(restored.partial_frame());
    assert_eq!(restored.frame_pointer, 5 * 160);
    assert_eq!(&restored.current_buffer[..], &tia.current_buffer[..]);
}
