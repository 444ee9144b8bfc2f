/// Integer rectangle in screen-pixel space. Also used as a crop window into a
/// source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Half-open containment: the right and bottom edges belong to the neighbour.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.w && py < self.y + self.h
    }
}

/// Shrink the larger of `dest`/`src` on each axis to the smaller one and move
/// its origin so the overlap is centered. Afterwards both rects share the same
/// extents and can be used as a (placement, crop) pair for a blit.
pub fn center_rects(dest: &mut Rect, src: &mut Rect) {
    center_axis(&mut dest.x, &mut dest.w, &mut src.x, &mut src.w);
    center_axis(&mut dest.y, &mut dest.h, &mut src.y, &mut src.h);
}

fn center_axis(dest_pos: &mut i32, dest_len: &mut i32, src_pos: &mut i32, src_len: &mut i32) {
    if *dest_len > *src_len {
        *dest_pos += (*dest_len - *src_len) / 2;
        *dest_len = *src_len;
    } else {
        *src_pos += (*src_len - *dest_len) / 2;
        *src_len = *dest_len;
    }
}
