//! Heat chart layout and rendering.
//!
//! ┌────────────────┬───┬──────────────────────────────┬──────────┐
//! │192.168.1  .10  │ | │▓▓▓████████████████████       │ 210.4k   │
//! │142.250.74 .46  │ | │██████████████                │ 98.1k    │
//! │fe80::1         │ | │██                            │ 12.0k    │
//! └────────────────┴───┴──────────────────────────────┴──────────┘
//!   address column  sep  bar (tier one green, tier two red)  label
//!
//! Everything up to [`paint`] is a pure function of the snapshot, the
//! terminal size and [`LayoutConfig`], so the chart can be checked cell by
//! cell against a [`Buffer`] without a real terminal.

use std::cmp::Ordering;

use netheat_core::HeatEntry;
use netheat_core::config::{MAX_BYTES, MAX_HEAT};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::prelude::*;

use super::app::App;

/// Fixed width of the address column.
pub const ADDRESS_COLUMN_WIDTH: u16 = 16;

/// Drawn between the address column and the bar.
pub const SEPARATOR: &str = " | ";

/// Columns held back on the right for the heat label.
pub const LABEL_RESERVE: u16 = 10;

/// Bars never shrink below this, even on tiny terminals.
const MIN_BAR_WIDTH: u16 = 10;

/// Width of each dotted-quad segment in the address column.
const QUAD_SEGMENT_WIDTH: usize = 3;

/// Padded labels longer than this collapse to `" MAX "`.
const MAX_LABEL_LEN: usize = 10;

const BAR_GLYPH: char = '█';

const ADDRESS_STYLE: Style = Style::new().fg(Color::White);
const TIER_ONE_STYLE: Style = Style::new().fg(Color::Green);
const TIER_TWO_STYLE: Style = Style::new().fg(Color::Red);
const LABEL_STYLE: Style = Style::new().fg(Color::Yellow);

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Geometry and scale of the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub address_column_width: u16,
    pub separator: String,
    pub label_reserve: u16,
    /// Heat at which the tier-one bar is full.
    pub max_bytes: f64,
    /// Heat at or above which the label reads `MAX`.
    pub max_heat: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            address_column_width: ADDRESS_COLUMN_WIDTH,
            separator: SEPARATOR.to_string(),
            label_reserve: LABEL_RESERVE,
            max_bytes: MAX_BYTES,
            max_heat: MAX_HEAT,
        }
    }
}

impl LayoutConfig {
    pub fn separator_len(&self) -> u16 {
        self.separator.chars().count() as u16
    }

    /// First column of both bar tiers.
    pub fn bar_origin(&self) -> u16 {
        self.address_column_width
            .saturating_add(self.separator_len())
    }
}

// ---------------------------------------------------------------------------
// Pure layout steps
// ---------------------------------------------------------------------------

/// Hottest first, ties by address; at most `limit` entries.
pub fn rank(entries: &[HeatEntry], limit: usize) -> Vec<HeatEntry> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(|a, b| {
        b.heat
            .partial_cmp(&a.heat)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked.truncate(limit);
    ranked
}

/// Bar width for a terminal `width` columns wide.
pub fn bar_width(width: u16, config: &LayoutConfig) -> u16 {
    let used = i32::from(config.address_column_width)
        + i32::from(config.separator_len())
        + i32::from(config.label_reserve);
    let available = i32::from(width) - used;
    available.max(i32::from(MIN_BAR_WIDTH)) as u16
}

/// Widths of the tier-one and tier-two bars for `heat`.
///
/// Tier one fills up at `max_bytes`. Tier two starts above that and fills
/// up at `max_bytes * 11`.
pub fn tier_widths(heat: f64, bar_width: u16, max_bytes: f64) -> (u16, u16) {
    let heat = non_negative(heat);
    let width = f64::from(bar_width);

    let one = (heat / max_bytes).clamp(0.0, 1.0);
    let two = if heat > max_bytes {
        ((heat - max_bytes) / (max_bytes * 10.0)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    // NaN (max_bytes == 0 with zero heat) casts to 0.
    ((one * width).round() as u16, (two * width).round() as u16)
}

/// Short human label: `999`, `1.5k`, `2.5M`, or `MAX` at the cap.
pub fn format_heat(heat: f64, max_heat: f64) -> String {
    let heat = non_negative(heat);
    if heat >= max_heat {
        "MAX".to_string()
    } else if heat < 1_000.0 {
        format!("{heat:.0}")
    } else if heat < 1_000_000.0 {
        format!("{:.1}k", heat / 1_000.0)
    } else {
        format!("{:.1}M", heat / 1_000_000.0)
    }
}

/// The label as drawn: one space either side, collapsed to `" MAX "` if too long.
pub fn label_text(heat: f64, max_heat: f64) -> String {
    let padded = format!(" {} ", format_heat(heat, max_heat));
    if padded.chars().count() > MAX_LABEL_LEN {
        " MAX ".to_string()
    } else {
        padded
    }
}

/// Fixed-width address text.
///
/// Dotted quads get every segment forced to three characters so the dots
/// line up down the column. Anything else is cut or padded to `width`.
pub fn format_address(address: &str, width: u16) -> String {
    let segments: Vec<&str> = address.split('.').collect();
    if segments.len() == 4 {
        segments
            .iter()
            .map(|s| fit(s, QUAD_SEGMENT_WIDTH))
            .collect::<Vec<_>>()
            .join(".")
    } else {
        fit(address, usize::from(width))
    }
}

fn fit(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

fn non_negative(value: f64) -> f64 {
    // Also folds NaN and -0.0 to 0.0.
    if value > 0.0 { value } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Paint operations
// ---------------------------------------------------------------------------

/// Write `text` in `style` starting at (`x`, `y`), one cell per char.
///
/// Operations are applied in order; later ones overwrite earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintOp {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub style: Style,
}

impl PaintOp {
    /// Column one past the last cell this op writes.
    pub fn end(&self) -> u16 {
        self.x.saturating_add(self.text.chars().count() as u16)
    }
}

/// Clip to the terminal width and queue.
fn push_clipped(ops: &mut Vec<PaintOp>, width: u16, x: u16, y: u16, text: String, style: Style) {
    if x >= width {
        return;
    }
    let room = usize::from(width - x);
    let text: String = if text.chars().count() > room {
        text.chars().take(room).collect()
    } else {
        text
    };
    if !text.is_empty() {
        ops.push(PaintOp { x, y, text, style });
    }
}

/// Full chart for one frame as an ordered list of paint operations.
///
/// No op writes at a column `>= width` or a row `>= height`.
pub fn layout_rows(
    entries: &[HeatEntry],
    width: u16,
    height: u16,
    config: &LayoutConfig,
) -> Vec<PaintOp> {
    let ranked = rank(entries, usize::from(height));
    let bar = bar_width(width, config);
    let origin = config.bar_origin();
    let label_x = origin.saturating_add(bar).saturating_add(1);

    let mut ops = Vec::with_capacity(ranked.len() * 5);
    for (row, entry) in ranked.iter().enumerate() {
        let y = row as u16;
        let (one, two) = tier_widths(entry.heat, bar, config.max_bytes);

        let address: String = format_address(&entry.address, config.address_column_width)
            .chars()
            .take(usize::from(config.address_column_width))
            .collect();
        push_clipped(&mut ops, width, 0, y, address, ADDRESS_STYLE);
        push_clipped(
            &mut ops,
            width,
            config.address_column_width,
            y,
            config.separator.clone(),
            ADDRESS_STYLE,
        );

        // Tier one owns the whole bar width so stale cells are blanked.
        let mut tier_one = String::with_capacity(usize::from(bar) * 3);
        tier_one.extend(std::iter::repeat_n(BAR_GLYPH, usize::from(one)));
        tier_one.extend(std::iter::repeat_n(' ', usize::from(bar - one)));
        push_clipped(&mut ops, width, origin, y, tier_one, TIER_ONE_STYLE);

        if two > 0 {
            let tier_two: String = std::iter::repeat_n(BAR_GLYPH, usize::from(two)).collect();
            push_clipped(&mut ops, width, origin, y, tier_two, TIER_TWO_STYLE);
        }

        push_clipped(
            &mut ops,
            width,
            label_x,
            y,
            label_text(entry.heat, config.max_heat),
            LABEL_STYLE,
        );
    }
    ops
}

/// Apply `ops` to `buf`, relative to the top-left corner of `area`.
pub fn paint(ops: &[PaintOp], area: Rect, buf: &mut Buffer) {
    for op in ops {
        if op.y >= area.height {
            continue;
        }
        let y = area.y + op.y;
        for (i, ch) in op.text.chars().enumerate() {
            let Some(dx) = op.x.checked_add(i as u16) else {
                break;
            };
            if dx >= area.width {
                break;
            }
            if let Some(cell) = buf.cell_mut((area.x + dx, y)) {
                cell.set_char(ch).set_style(op.style);
            }
        }
    }
}

/// Render a whole frame into a fresh cell grid.
pub fn render_grid(entries: &[HeatEntry], width: u16, height: u16, config: &LayoutConfig) -> Buffer {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    paint(&layout_rows(entries, width, height, config), area, &mut buf);
    buf
}

// ---------------------------------------------------------------------------
// Widget + frame entry point
// ---------------------------------------------------------------------------

/// Ratatui widget running the same pipeline as [`render_grid`].
pub struct HeatChart<'a> {
    entries: &'a [HeatEntry],
    config: &'a LayoutConfig,
}

impl<'a> HeatChart<'a> {
    pub fn new(entries: &'a [HeatEntry], config: &'a LayoutConfig) -> Self {
        Self { entries, config }
    }
}

impl Widget for HeatChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ops = layout_rows(self.entries, area.width, area.height, self.config);
        paint(&ops, area, buf);
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let entries = app.snapshot();
    f.render_widget(HeatChart::new(&entries, app.layout_config()), f.area());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(address: &str, heat: f64) -> HeatEntry {
        HeatEntry::new(address, heat)
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    fn fg(buf: &Buffer, x: u16, y: u16) -> Color {
        buf.cell((x, y)).unwrap().fg
    }

    // -----------------------------------------------------------------------
    // format_heat
    // -----------------------------------------------------------------------

    #[test]
    fn heat_labels() {
        let cap = f64::INFINITY;
        assert_eq!(format_heat(0.0, cap), "0");
        assert_eq!(format_heat(999.0, cap), "999");
        assert_eq!(format_heat(1500.0, cap), "1.5k");
        assert_eq!(format_heat(2_500_000.0, cap), "2.5M");
    }

    #[test]
    fn heat_at_or_above_cap_is_max() {
        assert_eq!(format_heat(1_000_000.0, 1_000_000.0), "MAX");
        assert_eq!(format_heat(5_000_000.0, 1_000_000.0), "MAX");
        assert_eq!(format_heat(999_999.0, 1_000_000.0), "1000.0k");
    }

    #[test]
    fn negative_and_nan_heat_read_zero() {
        assert_eq!(format_heat(-5.0, MAX_HEAT), "0");
        assert_eq!(format_heat(-0.0, MAX_HEAT), "0");
        assert_eq!(format_heat(f64::NAN, MAX_HEAT), "0");
    }

    #[test]
    fn label_text_is_padded_and_collapses_when_long() {
        assert_eq!(label_text(1500.0, MAX_HEAT), " 1.5k ");
        assert_eq!(label_text(MAX_HEAT, MAX_HEAT), " MAX ");
        assert_eq!(label_text(123_456_789_000.0, f64::INFINITY), " MAX ");
    }

    // -----------------------------------------------------------------------
    // format_address
    // -----------------------------------------------------------------------

    #[test]
    fn dotted_quad_segments_are_three_wide() {
        assert_eq!(format_address("1.2.3.4", 16), "1  .2  .3  .4  ");
        assert_eq!(format_address("192.168.1.10", 16), "192.168.1  .10 ");
        assert_eq!(format_address("255.255.255.255", 16), "255.255.255.255");
    }

    #[test]
    fn dotted_quad_width_is_constant() {
        for addr in ["1.1.1.1", "10.0.0.254", "172.16.100.3", "255.255.255.255"] {
            assert_eq!(format_address(addr, 16).chars().count(), 15, "{addr}");
        }
    }

    #[test]
    fn long_quad_segments_keep_first_three_chars() {
        assert_eq!(format_address("1234.5.6.7", 16), "123.5  .6  .7  ");
    }

    #[test]
    fn other_forms_fit_column() {
        assert_eq!(format_address("fe80::1", 16), "fe80::1         ");
        assert_eq!(
            format_address("2001:db8:85a3::8a2e:370:7334", 16),
            "2001:db8:85a3::8"
        );
        assert_eq!(format_address("", 4), "    ");
    }

    // -----------------------------------------------------------------------
    // bars
    // -----------------------------------------------------------------------

    #[test]
    fn tier_widths_reference_values() {
        assert_eq!(tier_widths(75_000.0, 100, 150_000.0), (50, 0));
        assert_eq!(tier_widths(300_000.0, 100, 150_000.0), (100, 10));
    }

    #[test]
    fn tier_two_is_zero_at_or_below_threshold() {
        assert_eq!(tier_widths(150_000.0, 100, 150_000.0), (100, 0));
        assert_eq!(tier_widths(0.0, 100, 150_000.0), (0, 0));
    }

    #[test]
    fn tier_two_saturates() {
        assert_eq!(tier_widths(1_650_000.0, 40, 150_000.0), (40, 40));
        assert_eq!(tier_widths(9e12, 40, 150_000.0), (40, 40));
    }

    #[test]
    fn bar_width_has_floor() {
        let cfg = LayoutConfig::default();
        assert_eq!(bar_width(129, &cfg), 100);
        assert_eq!(bar_width(39, &cfg), 10);
        assert_eq!(bar_width(0, &cfg), 10);
    }

    // -----------------------------------------------------------------------
    // rank
    // -----------------------------------------------------------------------

    #[test]
    fn rank_orders_by_heat_then_address() {
        let ranked = rank(
            &[
                entry("10.0.0.3", 5.0),
                entry("10.0.0.2", 9.0),
                entry("10.0.0.1", 5.0),
                entry("10.0.0.4", 0.0),
            ],
            10,
        );
        let order: Vec<_> = ranked.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(order, vec!["10.0.0.2", "10.0.0.1", "10.0.0.3", "10.0.0.4"]);
    }

    #[test]
    fn rank_truncates_and_is_deterministic() {
        let a = vec![entry("b", 1.0), entry("a", 1.0), entry("c", 1.0)];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(rank(&a, 2), rank(&b, 2));
        assert_eq!(rank(&a, 2).len(), 2);
        assert!(rank(&a, 0).is_empty());
    }

    // -----------------------------------------------------------------------
    // layout + grid
    // -----------------------------------------------------------------------

    #[test]
    fn ops_stay_inside_terminal() {
        let cfg = LayoutConfig::default();
        let entries = vec![entry("10.0.0.1", 900_000.0), entry("fe80::1", 10.0)];
        for (w, h) in [(0, 0), (5, 1), (17, 2), (25, 3), (80, 24), (200, 1)] {
            for op in layout_rows(&entries, w, h, &cfg) {
                assert!(op.y < h, "row {} at height {h}", op.y);
                assert!(op.x < w && op.end() <= w, "{op:?} at width {w}");
            }
        }
    }

    #[test]
    fn tier_two_is_painted_after_tier_one() {
        let cfg = LayoutConfig::default();
        let ops = layout_rows(&[entry("a", 300_000.0)], 129, 1, &cfg);
        let styles: Vec<Style> = ops.iter().map(|op| op.style).collect();
        assert_eq!(
            styles,
            vec![
                ADDRESS_STYLE,
                ADDRESS_STYLE,
                TIER_ONE_STYLE,
                TIER_TWO_STYLE,
                LABEL_STYLE
            ]
        );
        assert_eq!(ops[2].x, 19);
        assert_eq!(ops[3].x, 19);
        assert_eq!(ops[3].text.chars().count(), 10);
        assert_eq!(ops[4].x, 19 + 100 + 1);
    }

    #[test]
    fn two_hosts_render_hottest_first() {
        let cfg = LayoutConfig::default();
        let buf = render_grid(
            &[entry("10.0.0.2", 50_000.0), entry("10.0.0.1", 200_000.0)],
            60,
            5,
            &cfg,
        );
        // bar = 60 - 29 = 31 columns starting at 19, label at 51.
        let top = row_text(&buf, 0);
        assert!(top.starts_with("10 .0  .0  .1    | "), "{top:?}");
        assert_eq!(fg(&buf, 19, 0), Color::Red);
        assert_eq!(fg(&buf, 20, 0), Color::Green);
        assert_eq!(fg(&buf, 49, 0), Color::Green);
        assert_eq!(&top[top.len() - 9..], " 200.0k  ");
        assert_eq!(fg(&buf, 52, 0), Color::Yellow);

        let second = row_text(&buf, 1);
        assert!(second.starts_with("10 .0  .0  .2    | "), "{second:?}");
        // 50k / 150k * 31 rounds to 10 filled cells.
        assert_eq!(second.chars().skip(19).take(10).collect::<String>(), "█".repeat(10));
        assert_eq!(second.chars().nth(29), Some(' '));
        assert_eq!(fg(&buf, 19, 1), Color::Green);

        assert_eq!(row_text(&buf, 2).trim(), "");
    }

    #[test]
    fn rows_are_limited_by_height() {
        let cfg = LayoutConfig::default();
        let entries: Vec<_> = (0..10)
            .map(|i| entry(&format!("10.0.0.{i}"), f64::from(i) * 100.0))
            .collect();
        let buf = render_grid(&entries, 80, 3, &cfg);
        assert!(row_text(&buf, 0).starts_with("10 .0  .0  .9  "));
        assert!(row_text(&buf, 2).starts_with("10 .0  .0  .7  "));
    }

    #[test]
    fn narrow_terminal_clips_label() {
        let cfg = LayoutConfig::default();
        let buf = render_grid(&[entry("10.0.0.1", 1_000.0)], 25, 1, &cfg);
        assert_eq!(row_text(&buf, 0).chars().count(), 25);
        assert!(!row_text(&buf, 0).contains("1.0k"));
    }

    #[test]
    fn empty_snapshot_renders_blank() {
        let buf = render_grid(&[], 40, 4, &LayoutConfig::default());
        for y in 0..4 {
            assert_eq!(row_text(&buf, y).trim(), "");
        }
    }

    #[test]
    fn widget_honours_area_offset() {
        let cfg = LayoutConfig::default();
        let entries = [entry("10.0.0.1", 100.0)];
        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 3));
        HeatChart::new(&entries, &cfg).render(Rect::new(0, 1, 60, 2), &mut buf);
        assert_eq!(row_text(&buf, 0).trim(), "");
        assert!(row_text(&buf, 1).starts_with("10 .0  .0  .1  "));
    }
}
