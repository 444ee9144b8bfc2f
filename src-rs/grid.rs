use crate::geometry::Rect;

/// Near-square partition of the layout area into `columns x rows` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GridPlan {
    pub columns: i32,
    pub rows: i32,
}

impl GridPlan {
    /// Grow the smaller dimension until the grid holds `count` items.
    /// Rows only catch up with columns, never overtake them.
    pub fn for_count(count: usize) -> Self {
        let mut columns: i32 = 1;
        let mut rows: i32 = 1;
        while ((columns * rows) as usize) < count {
            if rows < columns {
                rows += 1;
            } else {
                columns += 1;
            }
        }
        Self { columns, rows }
    }

    /// Destination cell of item `index` within `area`. Remainder pixels of the
    /// integer division are not assigned to any cell.
    pub fn cell(&self, area: Rect, index: usize) -> Rect {
        let cell_w = area.w / self.columns;
        let cell_h = area.h / self.rows;
        let index = index as i32;
        let col = index % self.columns;
        let row = (index / self.columns) % self.rows;
        Rect::new(area.x + col * cell_w, area.y + row * cell_h, cell_w, cell_h)
    }

    pub fn cells(&self, area: Rect, count: usize) -> Vec<Rect> {
        (0..count).map(|i| self.cell(area, i)).collect()
    }
}
