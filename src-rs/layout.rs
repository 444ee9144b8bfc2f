use crate::corners::hot_zone_radius2;
use crate::geometry::Rect;
use crate::grid::GridPlan;

/// Fraction of the screen height given to the prompt band, when there is one.
const PROMPT_BAND_DIVISOR: i32 = 12;

/// Screen partition for one run: optional prompt band on top, grid cells
/// below it, and the corner hot-zone radius. Rendering and hit-testing both
/// read from the same value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Layout {
    pub screen: Rect,
    pub prompt_band: Option<Rect>,
    pub grid_area: Rect,
    pub plan: GridPlan,
    pub cells: Vec<Rect>,
    pub corner_radius2: i64,
}

impl Layout {
    pub fn new(width: i32, height: i32, items: usize, with_prompt: bool) -> Self {
        let screen = Rect::new(0, 0, width, height);
        let (prompt_band, grid_area) = if with_prompt {
            let band_h = (height / PROMPT_BAND_DIVISOR).max(1).min(height);
            (
                Some(Rect::new(0, 0, width, band_h)),
                Rect::new(0, band_h, width, height - band_h),
            )
        } else {
            (None, screen)
        };
        let plan = GridPlan::for_count(items);
        let cells = plan.cells(grid_area, items);
        log::debug!(
            "layout {width}x{height}: {} items in {}x{} grid",
            items,
            plan.columns,
            plan.rows
        );
        Self {
            screen,
            prompt_band,
            grid_area,
            plan,
            cells,
            corner_radius2: hot_zone_radius2(width, height),
        }
    }

    /// Index of the first cell containing the point.
    pub fn cell_at(&self, x: i32, y: i32) -> Option<usize> {
        self.cells.iter().position(|cell| cell.contains(x, y))
    }
}
