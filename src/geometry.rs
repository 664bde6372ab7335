//! Triangle-grid addressing and pixel geometry.
//!
//! The canvas is tiled by equilateral triangles that alternate between
//! pointing up and pointing down. A cell is addressed by `(row, col)`; its
//! pixel origin is `(col · half_width, row · tri_height)` and each triangle is
//! two half-widths wide, so neighbouring columns overlap by one half-width and
//! share a slanted edge.
//!
//! Orientation is never stored: a cell points up when the parities of its row
//! and (absolute) column agree.

use std::fmt;

use emath::{Pos2, pos2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::components::tools::Tool;

/// Smallest / largest triangle edge length in pixels (zoom range).
pub const MIN_TRI_SIDE: f32 = 5.0;
pub const MAX_TRI_SIDE: f32 = 200.0;
/// Largest grid dimension (triangles per axis).
pub const MAX_GRID_DIM: u32 = 1000;

// ============================================================================
// CELL ADDRESS
// ============================================================================

/// Address of one triangle cell.
///
/// Signed so that candidate anchors and neighbours can be computed before the
/// bounds check; [`GridGeometry::contains`] decides whether a cell is real.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellCoord {
    pub row: i32,
    pub col: i32,
}

impl CellCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// True when the triangle points up (apex at the top).
    pub fn is_up(&self) -> bool {
        self.row.rem_euclid(2) == self.col.abs().rem_euclid(2)
    }

    /// Parse a `"row,col"` key as written by [`fmt::Display`].
    pub fn parse_key(key: &str) -> Option<Self> {
        let (r, c) = key.split_once(',')?;
        let row = r.trim().parse().ok()?;
        let col = c.trim().parse().ok()?;
        Some(Self { row, col })
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

// Cells serialize as "row,col" so a grid map can be a JSON object.
impl Serialize for CellCoord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellCoord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        CellCoord::parse_key(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cell key '{}'", key)))
    }
}

// ============================================================================
// GRID GEOMETRY
// ============================================================================

/// Geometry constants of one document: edge length plus grid bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Triangle edge length in pixels.
    pub tri_side: f32,
    /// Number of triangle columns.
    pub width: u32,
    /// Number of triangle rows.
    pub height: u32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::new(25.0, 40, 30)
    }
}

impl GridGeometry {
    /// Build a geometry, clamping edge length and dimensions into range.
    pub fn new(tri_side: f32, width: u32, height: u32) -> Self {
        let tri_side = if tri_side.is_finite() {
            tri_side.clamp(MIN_TRI_SIDE, MAX_TRI_SIDE)
        } else {
            MIN_TRI_SIDE
        };
        Self {
            tri_side,
            width: width.clamp(1, MAX_GRID_DIM),
            height: height.clamp(1, MAX_GRID_DIM),
        }
    }

    /// Height of one triangle row: `tri_side · √3 / 2`.
    pub fn tri_height(&self) -> f32 {
        self.tri_side * 3.0_f32.sqrt() / 2.0
    }

    /// Horizontal distance between neighbouring column origins.
    pub fn half_width(&self) -> f32 {
        self.tri_side / 2.0
    }

    /// Pixel size of the drawing surface that holds the whole grid.
    pub fn canvas_size(&self) -> (u32, u32) {
        let hw = self.half_width();
        let w = (self.width as f32 * hw + hw).ceil() as u32;
        let h = (self.height as f32 * self.tri_height()).ceil() as u32;
        (w, h)
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as i64) < self.height as i64
            && (cell.col as i64) < self.width as i64
    }

    /// Triangle vertices of a cell.
    ///
    /// Up: (bottom-left, bottom-right, top-center).
    /// Down: (top-left, top-right, bottom-center).
    pub fn vertices(&self, cell: CellCoord) -> [Pos2; 3] {
        let hw = self.half_width();
        let th = self.tri_height();
        let x = cell.col as f32 * hw;
        let y = cell.row as f32 * th;
        if cell.is_up() {
            [pos2(x, y + th), pos2(x + 2.0 * hw, y + th), pos2(x + hw, y)]
        } else {
            [pos2(x, y), pos2(x + 2.0 * hw, y), pos2(x + hw, y + th)]
        }
    }

    pub fn centroid(&self, cell: CellCoord) -> Pos2 {
        let [a, b, c] = self.vertices(cell);
        pos2((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    /// True when `p` lies inside or on the boundary of `cell`'s triangle.
    pub fn contains_point(&self, cell: CellCoord, p: Pos2) -> bool {
        let [a, b, c] = self.vertices(cell);
        let (u, v, w) = barycentric(p, a, b, c);
        const EPS: f32 = -1e-4;
        u >= EPS && v >= EPS && w >= EPS
    }

    /// Resolve a pixel position to the cell that contains it.
    ///
    /// Each `half_width × tri_height` rectangle is split by one diagonal into
    /// the right half of column `col_approx - 1` and the left half of column
    /// `col_approx`. The diagonal direction follows from the row and column
    /// parities. Points exactly on a diagonal belong to `col_approx`.
    pub fn pixel_to_cell(&self, p: Pos2) -> Option<CellCoord> {
        let hw = self.half_width();
        let th = self.tri_height();
        // Outside the canvas rectangle (or NaN): no cell, and no integer
        // overflow in the row/column arithmetic below.
        let max_x = (self.width as f32 + 1.0) * hw;
        let max_y = self.height as f32 * th;
        if !(p.x >= 0.0 && p.x <= max_x && p.y >= 0.0 && p.y <= max_y) {
            return None;
        }
        let row = (p.y / th).floor() as i32;
        let col_approx = (p.x / hw).floor() as i32;
        let local_x = p.x.rem_euclid(hw) / hw;
        let local_y = p.y.rem_euclid(th) / th;

        let row_even = row.rem_euclid(2) == 0;
        let col_even = col_approx.rem_euclid(2) == 0;
        let col = match (row_even, col_even) {
            // Column `col_approx` points up: "/" diagonal, up triangle below it.
            (true, true) | (false, false) => {
                if local_x + local_y < 1.0 {
                    col_approx - 1
                } else {
                    col_approx
                }
            }
            // Column `col_approx` points down: "\" diagonal, down triangle above it.
            (true, false) | (false, true) => {
                if local_y > local_x {
                    col_approx - 1
                } else {
                    col_approx
                }
            }
        };

        let cell = CellCoord::new(row, col);
        self.contains(cell).then_some(cell)
    }

    /// The three edge-sharing neighbours: left, right, and the cell across
    /// the horizontal edge (below for up triangles, above for down ones).
    /// Not bounds-filtered.
    pub fn neighbors(cell: CellCoord) -> [CellCoord; 3] {
        let vertical = if cell.is_up() { cell.row + 1 } else { cell.row - 1 };
        [
            CellCoord::new(cell.row, cell.col - 1),
            CellCoord::new(cell.row, cell.col + 1),
            CellCoord::new(vertical, cell.col),
        ]
    }

    // ---- brush footprint ----------------------------------------------------

    /// Cells covered by a brush of `size` anchored at `anchor`.
    ///
    /// Row `i` of the cluster sits `i` rows below an up anchor (above a down
    /// one) and spans columns `anchor.col - i ..= anchor.col + i`. Cells outside
    /// the grid are dropped.
    pub fn cluster(&self, anchor: CellCoord, size: u8) -> Vec<CellCoord> {
        if size <= 1 {
            return if self.contains(anchor) { vec![anchor] } else { Vec::new() };
        }
        let up = anchor.is_up();
        let mut cells = Vec::with_capacity(size as usize * size as usize);
        for i in 0..size as i32 {
            let row = if up { anchor.row + i } else { anchor.row - i };
            for col in (anchor.col - i)..=(anchor.col + i) {
                let cell = CellCoord::new(row, col);
                if self.contains(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Pick the anchor whose cluster's mean (row, col) is nearest `target`,
    /// so that the lopsided triangular brush sits centred under the cursor.
    pub fn best_anchor(&self, target: CellCoord, size: u8) -> CellCoord {
        if size <= 1 {
            return target;
        }
        let s = size as i32;
        let range = (s + 1) / 2 + 1;
        let (h, w) = (self.height as i32, self.width as i32);

        let mut best = target;
        let mut best_dist = f32::INFINITY;
        for dr in -range..=range {
            for dc in -1..=1 {
                let cand = CellCoord::new(target.row + dr, target.col + dc);
                if cand.row < -s || cand.row > h + s || cand.col < -s || cand.col > w + s {
                    continue;
                }
                let cells = self.cluster(cand, size);
                if cells.is_empty() {
                    continue;
                }
                let n = cells.len() as f32;
                let avg_r = cells.iter().map(|c| c.row as f32).sum::<f32>() / n;
                let avg_c = cells.iter().map(|c| c.col as f32).sum::<f32>() / n;
                let dist = (avg_r - target.row as f32).powi(2) + (avg_c - target.col as f32).powi(2);
                if dist < best_dist {
                    best_dist = dist;
                    best = cand;
                }
            }
        }
        best
    }

    /// Pixel-space variant of [`Self::best_anchor`]: minimises the distance
    /// between `p` and the mean of the cluster's triangle centroids.
    pub fn best_anchor_pixel(&self, p: Pos2, size: u8) -> Option<CellCoord> {
        let approx = self.pixel_to_cell(p)?;
        if size <= 1 {
            return Some(approx);
        }
        const RANGE: i32 = 2;

        let mut best = approx;
        let mut best_dist = f32::INFINITY;
        for dr in -RANGE..=RANGE {
            for dc in -RANGE..=RANGE {
                let cand = CellCoord::new(approx.row + dr, approx.col + dc);
                let cells = self.cluster(cand, size);
                if cells.is_empty() {
                    continue;
                }
                let n = cells.len() as f32;
                let (sx, sy) = cells.iter().fold((0.0, 0.0), |(sx, sy), c| {
                    let m = self.centroid(*c);
                    (sx + m.x, sy + m.y)
                });
                let dist = p.distance(pos2(sx / n, sy / n));
                if dist < best_dist {
                    best_dist = dist;
                    best = cand;
                }
            }
        }
        Some(best)
    }

    /// Cells under a brush of `size` at pixel `p`. Empty when `p` is off-grid.
    pub fn brush_footprint(&self, p: Pos2, size: u8, pixel_anchor: bool) -> Vec<CellCoord> {
        let anchor = if size > 1 && pixel_anchor {
            self.best_anchor_pixel(p, size)
        } else {
            self.pixel_to_cell(p).map(|cell| self.best_anchor(cell, size))
        };
        match anchor {
            Some(anchor) => self.cluster(anchor, size),
            None => Vec::new(),
        }
    }

    // ---- strokes ------------------------------------------------------------

    /// Sampling distance along a stroke: a third of an edge, at least 1px.
    pub fn stroke_step(&self) -> f32 {
        (self.tri_side / 3.0).max(1.0)
    }

    /// Evenly spaced sample points from `p0` to `p1`, both ends included.
    ///
    /// The segment is first clipped to the canvas rectangle, so the sample
    /// count is bounded by the canvas diagonal. Empty when the segment misses
    /// the canvas.
    pub fn stroke_samples(&self, p0: Pos2, p1: Pos2) -> Vec<Pos2> {
        let (w, h) = self.canvas_size();
        let Some((p0, p1)) = clip_segment(p0, p1, w as f64, h as f64) else {
            return Vec::new();
        };
        let delta = p1 - p0;
        let dist = delta.length();
        let steps = if dist.is_finite() {
            (dist / self.stroke_step()).ceil() as usize
        } else {
            0
        };
        (0..=steps)
            .map(|i| {
                let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
                p0 + delta * t
            })
            .collect()
    }

    /// All cells touched by dragging the brush from `p0` to `p1`, in first-hit
    /// order with duplicates removed.
    pub fn interpolate_stroke(
        &self,
        p0: Pos2,
        p1: Pos2,
        tool: Tool,
        brush_size: u8,
        pixel_anchor: bool,
    ) -> Vec<CellCoord> {
        let size = tool.effective_size(brush_size);
        let mut seen = std::collections::HashSet::new();
        let mut cells = Vec::new();
        for p in self.stroke_samples(p0, p1) {
            for cell in self.brush_footprint(p, size, pixel_anchor) {
                if seen.insert(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

// ============================================================================
// TRIANGLE MATH
// ============================================================================

/// Liang-Barsky clip of `p0 → p1` against `[0, w] × [0, h]`, in f64 so that
/// far-off endpoints cannot overflow.
fn clip_segment(p0: Pos2, p1: Pos2, w: f64, h: f64) -> Option<(Pos2, Pos2)> {
    if !(p0.x.is_finite() && p0.y.is_finite() && p1.x.is_finite() && p1.y.is_finite()) {
        return None;
    }
    let (x0, y0) = (p0.x as f64, p0.y as f64);
    let (dx, dy) = (p1.x as f64 - x0, p1.y as f64 - y0);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, x0), (dx, w - x0), (-dy, y0), (dy, h - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| pos2((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    Some((at(t0), at(t1)))
}

/// Barycentric coordinates of `p` w.r.t. triangle (a, b, c).
/// Returns (weight_a, weight_b, weight_c), summing to 1.
pub fn barycentric(p: Pos2, a: Pos2, b: Pos2, c: Pos2) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-10 {
        return (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

pub fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    pos2((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Vertices of child `child` of a quad-subdivided triangle.
///
/// Children 0..=2 keep original vertex 0..=2 plus the two adjacent edge
/// midpoints; child 3 is the center triangle of the three midpoints.
pub fn sub_triangle(tri: &[Pos2; 3], child: usize) -> [Pos2; 3] {
    let [a, b, c] = *tri;
    let ab = midpoint(a, b);
    let bc = midpoint(b, c);
    let ca = midpoint(c, a);
    match child {
        0 => [a, ab, ca],
        1 => [ab, b, bc],
        2 => [ca, bc, c],
        _ => [ab, bc, ca],
    }
}

/// Child index that owns `p`: a corner when its weight is a strict majority,
/// otherwise the center.
pub fn route_child(tri: &[Pos2; 3], p: Pos2) -> usize {
    let (u, v, w) = barycentric(p, tri[0], tri[1], tri[2]);
    if u > 0.5 {
        0
    } else if v > 0.5 {
        1
    } else if w > 0.5 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> GridGeometry {
        GridGeometry::new(20.0, 10, 10)
    }

    fn close(a: Pos2, b: Pos2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn orientation_alternates_along_rows_and_columns() {
        assert!(CellCoord::new(0, 0).is_up());
        assert!(!CellCoord::new(0, 1).is_up());
        assert!(!CellCoord::new(1, 0).is_up());
        assert!(CellCoord::new(1, 1).is_up());
        assert!(CellCoord::new(3, -1).is_up());
    }

    #[test]
    fn vertices_follow_orientation() {
        let g = geo();
        let th = g.tri_height();
        let up = g.vertices(CellCoord::new(0, 0));
        assert!(close(up[0], pos2(0.0, th)));
        assert!(close(up[1], pos2(20.0, th)));
        assert!(close(up[2], pos2(10.0, 0.0)));

        let down = g.vertices(CellCoord::new(0, 1));
        assert!(close(down[0], pos2(10.0, 0.0)));
        assert!(close(down[1], pos2(30.0, 0.0)));
        assert!(close(down[2], pos2(20.0, th)));
    }

    #[test]
    fn canvas_size_covers_last_half_width() {
        let g = geo();
        let (w, h) = g.canvas_size();
        assert_eq!(w, 110);
        assert_eq!(h, (10.0 * g.tri_height()).ceil() as u32);
    }

    #[test]
    fn geometry_is_clamped() {
        let g = GridGeometry::new(1.0, 0, 5000);
        assert_eq!(g.tri_side, MIN_TRI_SIDE);
        assert_eq!(g.width, 1);
        assert_eq!(g.height, MAX_GRID_DIM);
    }

    #[test]
    fn centroid_resolves_to_its_own_cell() {
        let g = geo();
        for row in 0..10 {
            for col in 0..10 {
                let cell = CellCoord::new(row, col);
                assert_eq!(g.pixel_to_cell(g.centroid(cell)), Some(cell), "cell {}", cell);
            }
        }
    }

    #[test]
    fn off_grid_pixels_resolve_to_none() {
        let g = geo();
        assert_eq!(g.pixel_to_cell(pos2(-1.0, 5.0)), None);
        assert_eq!(g.pixel_to_cell(pos2(5.0, -0.5)), None);
        assert_eq!(g.pixel_to_cell(pos2(5.0, 10.0 * g.tri_height() + 1.0)), None);
        // Left sliver of row 0 belongs to column -1.
        assert_eq!(g.pixel_to_cell(pos2(1.0, 1.0)), None);
        assert_eq!(g.pixel_to_cell(pos2(f32::NAN, 1.0)), None);
    }

    #[test]
    fn far_off_pixels_resolve_to_none() {
        let g = geo();
        assert_eq!(g.pixel_to_cell(pos2(-1.0e12, 5.0)), None);
        assert_eq!(g.pixel_to_cell(pos2(1.0e12, 1.0e12)), None);
        assert_eq!(g.pixel_to_cell(pos2(f32::MAX, f32::MIN)), None);
        assert_eq!(g.pixel_to_cell(pos2(f32::INFINITY, 5.0)), None);
    }

    #[test]
    fn diagonal_ties_go_to_the_right_hand_column() {
        let g = geo();
        let th = g.tri_height();
        // Row 0, rectangle col 2 ("/"): (25, th/2) sits on the left edge of
        // up cell (0, 2).
        assert_eq!(g.pixel_to_cell(pos2(25.0, th / 2.0)), Some(CellCoord::new(0, 2)));
        // Row 0, rectangle col 1 ("\"): on the left edge of down cell (0, 1).
        assert_eq!(g.pixel_to_cell(pos2(15.0, th / 2.0)), Some(CellCoord::new(0, 1)));
    }

    #[test]
    fn decision_table_agrees_with_point_containment() {
        let g = geo();
        let (w, h) = g.canvas_size();
        let mut y = 0.37;
        while y < h as f32 {
            let mut x = 0.53;
            while x < w as f32 {
                if let Some(cell) = g.pixel_to_cell(pos2(x, y)) {
                    assert!(g.contains_point(cell, pos2(x, y)), "({}, {}) -> {}", x, y, cell);
                }
                x += 1.7;
            }
            y += 1.3;
        }
    }

    #[test]
    fn neighbors_share_an_edge() {
        let g = geo();
        for cell in [CellCoord::new(2, 2), CellCoord::new(2, 3), CellCoord::new(5, 4)] {
            let verts = g.vertices(cell);
            for n in GridGeometry::neighbors(cell) {
                let other = g.vertices(n);
                let shared = verts.iter().filter(|v| other.iter().any(|o| close(**v, *o))).count();
                assert_eq!(shared, 2, "{} vs {}", cell, n);
            }
        }
    }

    #[test]
    fn cluster_of_one_is_the_anchor() {
        let g = geo();
        assert_eq!(g.cluster(CellCoord::new(3, 3), 1), vec![CellCoord::new(3, 3)]);
        assert!(g.cluster(CellCoord::new(-1, 3), 1).is_empty());
    }

    #[test]
    fn cluster_grows_away_from_the_apex() {
        let g = geo();
        let up = g.cluster(CellCoord::new(2, 4), 2);
        assert_eq!(
            up,
            vec![
                CellCoord::new(2, 4),
                CellCoord::new(3, 3),
                CellCoord::new(3, 4),
                CellCoord::new(3, 5),
            ]
        );
        let down = g.cluster(CellCoord::new(2, 5), 2);
        assert_eq!(down[1..], [CellCoord::new(1, 4), CellCoord::new(1, 5), CellCoord::new(1, 6)]);
    }

    #[test]
    fn cluster_is_clipped_at_the_border() {
        let g = geo();
        let cells = g.cluster(CellCoord::new(9, 1), 3);
        assert_eq!(cells, vec![CellCoord::new(9, 1)]);
        let cells = g.cluster(CellCoord::new(9, 0), 3);
        assert!(cells.iter().all(|c| g.contains(*c)));
        assert_eq!(cells.len(), 6);
        assert_eq!(g.cluster(CellCoord::new(5, 5), 5).len(), 25);
    }

    #[test]
    fn best_anchor_is_never_worse_than_the_target() {
        let g = geo();
        let target = CellCoord::new(5, 5);
        for size in 2..=5u8 {
            let mean_dist = |anchor: CellCoord| {
                let cells = g.cluster(anchor, size);
                let n = cells.len() as f32;
                let r = cells.iter().map(|c| c.row as f32).sum::<f32>() / n;
                let c = cells.iter().map(|c| c.col as f32).sum::<f32>() / n;
                (r - 5.0).powi(2) + (c - 5.0).powi(2)
            };
            let best = g.best_anchor(target, size);
            assert!(mean_dist(best) <= mean_dist(target));
        }
        assert_eq!(g.best_anchor(target, 1), target);
    }

    #[test]
    fn pixel_anchor_keeps_the_pointer_near_the_brush() {
        let g = geo();
        let p = g.centroid(CellCoord::new(5, 5));
        let anchor = g.best_anchor_pixel(p, 3).unwrap();
        let cells = g.cluster(anchor, 3);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&CellCoord::new(5, 5)));
        assert_eq!(g.best_anchor_pixel(pos2(-5.0, -5.0), 3), None);
    }

    #[test]
    fn stroke_samples_include_both_ends() {
        let g = geo();
        let samples = g.stroke_samples(pos2(0.0, 0.0), pos2(15.0, 0.0));
        assert_eq!(samples.len(), 4);
        assert!(close(samples[0], pos2(0.0, 0.0)));
        assert!(close(*samples.last().unwrap(), pos2(15.0, 0.0)));
        assert_eq!(g.stroke_samples(pos2(3.0, 3.0), pos2(3.0, 3.0)).len(), 1);
    }

    #[test]
    fn stroke_samples_are_clipped_to_the_canvas() {
        let g = geo();
        let (w, h) = g.canvas_size();
        let samples = g.stroke_samples(pos2(0.0, 0.0), pos2(1.0e30, 0.0));
        assert!(close(*samples.last().unwrap(), pos2(w as f32, 0.0)));
        assert!(samples.len() <= (w as f32 / g.stroke_step()).ceil() as usize + 1);

        let across = g.stroke_samples(pos2(-f32::MAX, 10.0), pos2(f32::MAX, 10.0));
        assert!(close(across[0], pos2(0.0, 10.0)));
        assert!(across.iter().all(|p| p.x >= 0.0 && p.x <= w as f32));

        assert!(g.stroke_samples(pos2(-50.0, -50.0), pos2(1.0e30, -50.0)).is_empty());
        assert!(g.stroke_samples(pos2(5.0, h as f32 + 1.0), pos2(5.0, h as f32 + 1.0)).is_empty());
        assert!(g.stroke_samples(pos2(5.0, 5.0), pos2(f32::NAN, 5.0)).is_empty());
    }

    #[test]
    fn interpolated_stroke_has_no_gaps_or_repeats() {
        let g = geo();
        let y = g.centroid(CellCoord::new(4, 1)).y;
        let cells = g.interpolate_stroke(pos2(14.0, y), pos2(95.0, y), Tool::Pencil, 1, false);
        let cols: Vec<i32> = cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, (1..=9).collect::<Vec<_>>());
        assert!(cells.iter().all(|c| c.row == 4));
    }

    #[test]
    fn bucket_strokes_ignore_brush_size() {
        let g = geo();
        let p = g.centroid(CellCoord::new(4, 4));
        let cells = g.interpolate_stroke(p, p, Tool::Bucket, 4, false);
        assert_eq!(cells, vec![CellCoord::new(4, 4)]);
        assert_eq!(g.interpolate_stroke(p, p, Tool::Pencil, 2, false).len(), 4);
    }

    #[test]
    fn center_and_corners_route_to_matching_children() {
        let tri = [pos2(0.0, 10.0), pos2(20.0, 10.0), pos2(10.0, 0.0)];
        let center = pos2(10.0, 20.0 / 3.0);
        assert_eq!(route_child(&tri, center), 3);
        assert_eq!(route_child(&tri, pos2(1.5, 9.5)), 0);
        assert_eq!(route_child(&tri, pos2(18.5, 9.5)), 1);
        assert_eq!(route_child(&tri, pos2(10.0, 1.0)), 2);
        for child in 0..4 {
            let sub = sub_triangle(&tri, child);
            let m = pos2((sub[0].x + sub[1].x + sub[2].x) / 3.0, (sub[0].y + sub[1].y + sub[2].y) / 3.0);
            assert_eq!(route_child(&tri, m), child);
        }
    }

    #[test]
    fn cell_keys_round_trip() {
        let cell = CellCoord::new(12, 7);
        assert_eq!(cell.to_string(), "12,7");
        assert_eq!(CellCoord::parse_key("12,7"), Some(cell));
        assert_eq!(CellCoord::parse_key("12;7"), None);
    }
}
