//! Pairing QR codes rendered for the terminal.

use papagaio_core::error::BotError;
use qrcode::{Color, EcLevel, QrCode};

/// Light modules kept around the code so scanners find its edges.
const QUIET_ZONE: usize = 1;

/// Render `qr_data` with Unicode half blocks, two module rows per text line.
pub fn render_terminal(qr_data: &str) -> Result<String, BotError> {
    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| BotError::Session(format!("QR generation failed: {e}")))?;

    let width = code.width();
    let colors = code.into_colors();
    let size = width + QUIET_ZONE * 2;
    let dark = |row: usize, col: usize| -> bool {
        if row < QUIET_ZONE || col < QUIET_ZONE {
            return false;
        }
        let (r, c) = (row - QUIET_ZONE, col - QUIET_ZONE);
        r < width && c < width && colors[r * width + c] == Color::Dark
    };

    let mut out = String::with_capacity(size * (size / 2 + 1) * 3);
    for row in (0..size).step_by(2) {
        for col in 0..size {
            out.push(match (dark(row, col), dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}
