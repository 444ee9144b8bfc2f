/// Screen corner. The discriminant doubles as a bit mask: bit 0 selects the
/// right edge, bit 1 the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    NorthWest = 0,
    NorthEast = 1,
    SouthWest = 2,
    SouthEast = 3,
}

impl Corner {
    /// Hit-test order.
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Corner::NorthWest => "NW",
            Corner::NorthEast => "NE",
            Corner::SouthWest => "SW",
            Corner::SouthEast => "SE",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Pixel coordinates of this corner on a `width x height` screen.
    pub fn anchor(self, width: i32, height: i32) -> (i32, i32) {
        let bits = self as i32;
        let x = if bits & 1 != 0 { width - 1 } else { 0 };
        let y = if bits & 2 != 0 { height - 1 } else { 0 };
        (x, y)
    }
}

/// Squared hot-zone radius, scaled to the screen diagonal.
pub fn hot_zone_radius2(width: i32, height: i32) -> i64 {
    let w = i64::from(width);
    let h = i64::from(height);
    (w * w + h * h) / 16384
}

/// True when `(x, y)` lies strictly inside the hot zone of `corner`.
pub fn corner_hit(width: i32, height: i32, x: i32, y: i32, radius2: i64, corner: Corner) -> bool {
    let (cx, cy) = corner.anchor(width, height);
    let dx = i64::from(x - cx);
    let dy = i64::from(y - cy);
    radius2 > dx * dx + dy * dy
}

/// Optional action per corner, indexed by [`Corner::index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CornerActions {
    slots: [Option<Vec<u8>>; 4],
}

impl CornerActions {
    pub fn get(&self, corner: Corner) -> Option<&[u8]> {
        self.slots[corner.index()].as_deref()
    }

    pub fn set(&mut self, corner: Corner, action: Option<Vec<u8>>) {
        self.slots[corner.index()] = action;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Corner, &[u8])> + '_ {
        Corner::ALL
            .into_iter()
            .filter_map(|corner| self.get(corner).map(|action| (corner, action)))
    }
}
