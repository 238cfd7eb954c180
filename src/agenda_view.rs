//! Agenda panel: today and tomorrow on an hour grid.

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};

use crate::canvas::{infallible, Canvas, Fill, TriColor};
use crate::event::CalendarEvent;
use crate::layout::{self, BlockKind, DayWindow, Half, LayoutBlock};
use crate::render::{draw_text, draw_text_centered, text_width};

/// Number of grid rows: weekday names, all-day lanes and 24 hours.
pub const GRID_ROWS: u32 = 28;

/// First row with a dotted hour line.
const FIRST_DOTTED_ROW: u32 = 4;

/// Gap between dots of the hour lines.
const DOT_STEP: usize = 7;

/// Corner radius of event blocks.
const BLOCK_RADIUS: u32 = 6;

/// Horizontal gap between a block and its column edges.
const BLOCK_INSET: i32 = 2;

/// Text offset from the left edge of a block.
const TEXT_INSET: i32 = 10;

/// Weekday name format.
const WEEKDAY_FORMAT: &str = "%A";

/// Pixel geometry of the agenda grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgendaGrid {
    /// Width of one day column
    pub column_width: u32,
    /// Height of one grid row
    pub row_height: u32,
    /// Panel height
    pub height: u32,
}

impl AgendaGrid {
    /// Grid for a panel of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            column_width: size.width / 2,
            row_height: size.height / GRID_ROWS,
            height: size.height,
        }
    }

    /// Inclusive pixel corners of a block.
    pub fn block_corners(&self, block: &LayoutBlock) -> (Point, Point) {
        let column_x = (block.column.index() * self.column_width) as i32;
        let cw = self.column_width as i32;
        let (x0, x1) = match block.half {
            Half::Full => (column_x + BLOCK_INSET, column_x + cw - BLOCK_INSET),
            Half::Left => (column_x + BLOCK_INSET, column_x + cw / 2 - BLOCK_INSET),
            Half::Right => (column_x + cw / 2 + BLOCK_INSET, column_x + cw - BLOCK_INSET),
        };

        let row = self.row_height as f32;
        let (y0, y1) = match block.kind {
            BlockKind::AllDay => (
                (block.span.0 * row) as i32 + 1,
                (block.span.1 * row) as i32 - 1,
            ),
            BlockKind::Timed => ((block.span.0 * row) as i32, (block.span.1 * row) as i32),
        };

        (Point::new(x0, y0), Point::new(x1, y1))
    }

    /// Top-left corner of a block's title.
    pub fn title_origin(&self, block: &LayoutBlock) -> Point {
        let (top_left, _) = self.block_corners(block);
        let x = top_left.x - BLOCK_INSET + TEXT_INSET;
        match block.kind {
            BlockKind::AllDay => Point::new(x, top_left.y),
            BlockKind::Timed => Point::new(x, top_left.y + 2),
        }
    }
}

/// Draw the agenda for `window` into a panel of `size`.
pub fn render_agenda(
    events: &[CalendarEvent],
    window: &DayWindow,
    size: Size,
    font: &'static MonoFont<'static>,
) -> Canvas {
    let mut canvas = Canvas::new(size.width, size.height);
    let grid = AgendaGrid::new(size);

    draw_grid(&mut canvas, &grid, size.width);

    let half_column = (grid.column_width / 2) as i32;
    for (i, day) in [window.today, window.tomorrow].iter().enumerate() {
        let center_x = (i as u32 * grid.column_width) as i32 + half_column;
        draw_text_centered(
            &mut canvas,
            &day.format(WEEKDAY_FORMAT).to_string(),
            Point::new(center_x, 10),
            font,
        );
    }

    let mut blocks = layout::layout(events, window);
    layout::fit_titles(&mut blocks, grid.column_width, |s| text_width(s, font));

    for block in &blocks {
        let (top_left, bottom_right) = grid.block_corners(block);
        canvas.rounded_block(
            top_left,
            bottom_right,
            BLOCK_RADIUS,
            Fill::from_tag(block.color),
            1,
        );
        draw_text(&mut canvas, &block.title, grid.title_origin(block), font);
    }

    canvas
}

fn draw_grid(canvas: &mut Canvas, grid: &AgendaGrid, width: u32) {
    let row = grid.row_height as i32;
    let width = width as i32;

    for r in FIRST_DOTTED_ROW..GRID_ROWS {
        canvas.dotted_hline(r as i32 * row, 0, width, DOT_STEP);
    }

    let stroke = PrimitiveStyle::with_stroke(TriColor::Black, 1);
    for y in [row, 3 * row] {
        infallible(
            Line::new(Point::new(0, y), Point::new(width, y))
                .into_styled(stroke)
                .draw(canvas),
        );
    }

    let x = grid.column_width as i32;
    infallible(
        Line::new(Point::new(x, 0), Point::new(x, grid.height as i32))
            .into_styled(stroke)
            .draw(canvas),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Column;
    use crate::render::font_by_name;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Europe::Berlin;

    fn block(column: Column, kind: BlockKind, span: (f32, f32), half: Half) -> LayoutBlock {
        LayoutBlock {
            column,
            kind,
            span,
            half,
            title: "x".into(),
            color: 1,
        }
    }

    #[test]
    fn test_grid_for_calendar_panel() {
        let grid = AgendaGrid::new(Size::new(300, 480));
        assert_eq!(grid.column_width, 150);
        assert_eq!(grid.row_height, 17);
    }

    #[test]
    fn test_block_corners() {
        let grid = AgendaGrid::new(Size::new(300, 480));

        // 09:00-10:00 today, full width
        let b = block(Column::Today, BlockKind::Timed, (12.0, 13.0), Half::Full);
        assert_eq!(
            grid.block_corners(&b),
            (Point::new(2, 204), Point::new(148, 221))
        );

        // right half of tomorrow
        let b = block(Column::Tomorrow, BlockKind::Timed, (12.0, 13.0), Half::Right);
        assert_eq!(grid.block_corners(&b).0.x, 150 + 75 + 2);
        assert_eq!(grid.title_origin(&b), Point::new(150 + 75 + 10, 206));

        // first all-day lane keeps a 1px gap to the grid lines
        let b = block(Column::Today, BlockKind::AllDay, (1.0, 2.0), Half::Full);
        assert_eq!(
            grid.block_corners(&b),
            (Point::new(2, 18), Point::new(148, 33))
        );
        assert_eq!(grid.title_origin(&b), Point::new(10, 18));
    }

    #[test]
    fn test_render_agenda_draws_blocks() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let at = |h, m| Berlin.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap();
        let events = vec![CalendarEvent::timed(at(9, 0), at(10, 0), "Standup", 2)];

        let font = font_by_name("6x10").unwrap();
        let canvas = render_agenda(&events, &DayWindow::new(today), Size::new(300, 480), font);

        // inside the block, away from the title: solid accent
        assert_eq!(canvas.pixel(120, 215), Some(TriColor::Accent));
        // column divider
        assert_eq!(canvas.pixel(150, 400), Some(TriColor::Black));
        // row 3 separator
        assert_eq!(canvas.pixel(200, 51), Some(TriColor::Black));
        // dotted hour line: dot on the step, gap in between
        assert_eq!(canvas.pixel(7, 4 * 17), Some(TriColor::Black));
        assert_eq!(canvas.pixel(8, 4 * 17), Some(TriColor::White));
    }
}
