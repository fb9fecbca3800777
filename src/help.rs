//! Controls overlay drawn over the field with `h`

use crate::terminal::Terminal;
use crossterm::style::Color;

const TITLE: &str = " termfire controls ";
const FOOTER: &str = "h to close";

/// (keys, what they do) in the order shown
pub const CONTROLS: &[(&str, &str)] = &[
    ("z  P0", "sprays light water, puts out small fires"),
    ("x  P1", "puts out medium fires"),
    ("z+x", "heavy water, the only way to shrink large fires"),
    ("s  blow", "puts out small fires, may scatter embers"),
    ("arrows", "move the firefighter"),
    ("space", "pause"),
    ("r", "restart with a new field"),
    ("q  Esc", "quit"),
];

/// Draw the controls table centred in the field. Keys use the HUD's
/// highlight colour, the border matches the status bar.
pub fn render_help_overlay(term: &mut Terminal) {
    let (width, height) = term.size();
    let key_w = CONTROLS.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let text_w = CONTROLS.iter().map(|(_, t)| t.chars().count()).max().unwrap_or(0);

    let inner = (key_w + 3 + text_w).max(TITLE.chars().count() + 2);
    let box_w = inner + 2;
    let box_h = CONTROLS.len() + 4;
    let x0 = (width as i32 - box_w as i32).max(0) / 2;
    let y0 = (height as i32 - box_h as i32).max(0) / 2;
    let right = x0 + box_w as i32 - 1;
    let bottom = y0 + box_h as i32 - 1;
    let border = Some(Color::DarkGrey);

    for y in y0..=bottom {
        for x in x0..=right {
            let ch = match (x == x0, x == right, y == y0, y == bottom) {
                (true, _, true, _) => '╭',
                (_, true, true, _) => '╮',
                (true, _, _, true) => '╰',
                (_, true, _, true) => '╯',
                (_, _, true, _) | (_, _, _, true) => '─',
                (true, _, _, _) | (_, true, _, _) => '│',
                _ => ' ',
            };
            term.set(x, y, ch, border, false);
        }
    }
    term.set_str(x0 + 2, y0, TITLE, Some(Color::White), true);

    for (i, (keys, text)) in CONTROLS.iter().enumerate() {
        let y = y0 + 2 + i as i32;
        term.set_str(x0 + 2, y, keys, Some(Color::Yellow), true);
        term.set_str(x0 + 2 + key_w as i32 + 2, y, text, Some(Color::Grey), false);
    }

    let footer_x = right - 1 - FOOTER.chars().count() as i32;
    term.set_str(footer_x, bottom, FOOTER, border, false);
}
