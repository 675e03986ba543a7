//! ASCII startup banner with a color gradient (MEDIA-DL).

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::ExecutableCommand;
use figlet_rs::FIGfont;
use std::io::{stdout, Write};

/// Electric blue (#00bfff).
const ELECTRIC_BLUE: (u8, u8, u8) = (0x00, 0xbf, 0xff);
/// Signal green (#32cd32).
const SIGNAL_GREEN: (u8, u8, u8) = (0x32, 0xcd, 0x32);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints the welcome banner: "MEDIA-DL" in figlet ASCII with a gradient
/// from electric blue to signal green, then the version line. Rendering
/// problems are ignored; the banner is decoration.
pub fn print_welcome() {
    let Ok(font) = FIGfont::standard() else { return };
    let Some(figure) = font.convert("MEDIA-DL") else {
        return;
    };
    let art = figure.to_string();
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    let mut out = stdout();
    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(ELECTRIC_BLUE, SIGNAL_GREEN, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: SIGNAL_GREEN.0,
        g: SIGNAL_GREEN.1,
        b: SIGNAL_GREEN.2,
    }));
    let _ = out.execute(Print(format!("v{}\r\n", version)));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
