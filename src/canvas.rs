use std::collections::BTreeMap;
use std::fmt;

use emath::Pos2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::tools::Tool;
use crate::geometry::{CellCoord, GridGeometry, route_child, sub_triangle};

// ============================================================================
// CELL VALUES
// ============================================================================

/// Stable identifier of an externally owned bitmap. The grid only stores the
/// id; resolving it to pixels is the renderer's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub Uuid);

impl ImageRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image:{}", self.0)
    }
}

/// The value a tool paints with: a color token or an image reference.
///
/// Two fills are equal only when they are the same kind with the same
/// token / id; a color never equals an image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    Color(String),
    Image(ImageRef),
}

impl Fill {
    pub fn color(token: impl Into<String>) -> Self {
        Fill::Color(token.into())
    }

    pub fn as_color(&self) -> Option<&str> {
        match self {
            Fill::Color(token) => Some(token),
            Fill::Image(_) => None,
        }
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fill::Color(token) => f.write_str(token),
            Fill::Image(id) => write!(f, "{}", id),
        }
    }
}

/// Content of one cell. Empty cells are `None` at the use site, never a
/// sentinel variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    Color(String),
    Image(ImageRef),
    /// Quad split: children 0..=2 are the corner triangles (one per parent
    /// vertex), child 3 is the center triangle.
    Subdivided(Box<[Option<CellValue>; 4]>),
}

impl CellValue {
    /// A subdivided node whose four children all start as `seed`.
    pub fn subdivided(seed: Option<CellValue>) -> Self {
        CellValue::Subdivided(Box::new([seed.clone(), seed.clone(), seed.clone(), seed]))
    }

    pub fn is_subdivided(&self) -> bool {
        matches!(self, CellValue::Subdivided(_))
    }

    /// The leaf as a fill, `None` for subdivided nodes.
    pub fn as_fill(&self) -> Option<Fill> {
        match self {
            CellValue::Color(token) => Some(Fill::Color(token.clone())),
            CellValue::Image(id) => Some(Fill::Image(*id)),
            CellValue::Subdivided(_) => None,
        }
    }

    /// Levels of subdivision below this value (0 for a leaf).
    pub fn depth(&self) -> usize {
        match self {
            CellValue::Subdivided(children) => {
                1 + children.iter().flatten().map(CellValue::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl From<Fill> for CellValue {
    fn from(fill: Fill) -> Self {
        match fill {
            Fill::Color(token) => CellValue::Color(token),
            Fill::Image(id) => CellValue::Image(id),
        }
    }
}

// ============================================================================
// GRID STATE: sparse (row, col) → value map
// ============================================================================

/// Sparse cell store. Only non-empty cells have keys, so two grids with the
/// same painted cells compare equal regardless of how they got there.
///
/// Ordered by (row, col) so iteration, rendering and serialized snapshots are
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridState {
    cells: BTreeMap<CellCoord, CellValue>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: CellCoord) -> Option<&CellValue> {
        self.cells.get(&cell)
    }

    /// Store `value` at `cell`; `None` removes the key.
    pub fn set(&mut self, cell: CellCoord, value: Option<CellValue>) {
        match value {
            Some(v) => {
                self.cells.insert(cell, v);
            }
            None => {
                self.cells.remove(&cell);
            }
        }
    }

    pub fn delete(&mut self, cell: CellCoord) -> Option<CellValue> {
        self.cells.remove(&cell)
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &CellValue)> {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    /// Cells that lie inside `geometry`'s bounds.
    pub fn iter_within<'a>(
        &'a self,
        geometry: &'a GridGeometry,
    ) -> impl Iterator<Item = (CellCoord, &'a CellValue)> + 'a {
        self.iter().filter(move |(cell, _)| geometry.contains(*cell))
    }

    /// Drop cells outside `geometry`. Returns how many were removed.
    pub fn retain_within(&mut self, geometry: &GridGeometry) -> usize {
        let before = self.cells.len();
        self.cells.retain(|cell, _| geometry.contains(*cell));
        before - self.cells.len()
    }

    // ---- subdivision --------------------------------------------------------

    /// Apply `tool` at pixel `point` inside `cell`, descending through
    /// subdivided nodes to the sub-triangle that owns the point.
    ///
    /// * Pencil replaces the reached leaf with `fill`.
    /// * Eraser empties it.
    /// * Subdivide turns it into a node whose four children copy the old leaf.
    /// * Bucket and picker never mutate here.
    ///
    /// Returns `true` when the grid changed.
    pub fn route_and_mutate(
        &mut self,
        geometry: &GridGeometry,
        cell: CellCoord,
        point: Pos2,
        tool: Tool,
        fill: &Fill,
    ) -> bool {
        if !geometry.contains(cell) {
            return false;
        }
        let tri = geometry.vertices(cell);
        let mut slot = self.cells.remove(&cell);
        let changed = mutate_node(&mut slot, &tri, point, tool, fill);
        if let Some(value) = slot {
            self.cells.insert(cell, value);
        }
        changed
    }

    /// Subdivide a whole cell without routing. Already subdivided cells are
    /// left alone.
    pub fn subdivide(&mut self, cell: CellCoord) -> bool {
        match self.cells.get(&cell) {
            Some(CellValue::Subdivided(_)) => false,
            current => {
                let node = CellValue::subdivided(current.cloned());
                self.cells.insert(cell, node);
                true
            }
        }
    }

    /// Read the leaf under `point`, following the same routing as
    /// [`Self::route_and_mutate`].
    pub fn pick(&self, geometry: &GridGeometry, cell: CellCoord, point: Pos2) -> Option<Fill> {
        self.leaf_at(geometry, cell, point).0.and_then(CellValue::as_fill)
    }

    /// Vertices of the deepest sub-triangle under `point`, or `None` when the
    /// cell is not subdivided.
    pub fn leaf_triangle(
        &self,
        geometry: &GridGeometry,
        cell: CellCoord,
        point: Pos2,
    ) -> Option<[Pos2; 3]> {
        match self.cells.get(&cell) {
            Some(CellValue::Subdivided(_)) => Some(self.leaf_at(geometry, cell, point).1),
            _ => None,
        }
    }

    fn leaf_at(&self, geometry: &GridGeometry, cell: CellCoord, point: Pos2) -> (Option<&CellValue>, [Pos2; 3]) {
        let mut tri = geometry.vertices(cell);
        let mut node = self.cells.get(&cell);
        while let Some(CellValue::Subdivided(children)) = node {
            let idx = route_child(&tri, point);
            tri = sub_triangle(&tri, idx);
            node = children[idx].as_ref();
        }
        (node, tri)
    }
}

fn mutate_node(
    slot: &mut Option<CellValue>,
    tri: &[Pos2; 3],
    point: Pos2,
    tool: Tool,
    fill: &Fill,
) -> bool {
    if let Some(CellValue::Subdivided(children)) = slot {
        let idx = route_child(tri, point);
        return mutate_node(&mut children[idx], &sub_triangle(tri, idx), point, tool, fill);
    }

    let next = match tool {
        Tool::Pencil => Some(CellValue::from(fill.clone())),
        Tool::Eraser => None,
        Tool::Subdivide => Some(CellValue::subdivided(slot.take())),
        Tool::Bucket | Tool::Picker => return false,
    };
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use emath::pos2;

    fn geo() -> GridGeometry {
        GridGeometry::new(20.0, 10, 10)
    }

    fn red() -> Fill {
        Fill::color("red")
    }

    fn child(grid: &GridState, cell: CellCoord, idx: usize) -> Option<CellValue> {
        match grid.get(cell) {
            Some(CellValue::Subdivided(children)) => children[idx].clone(),
            other => panic!("cell {} is not subdivided: {:?}", cell, other),
        }
    }

    #[test]
    fn setting_none_removes_the_key() {
        let mut grid = GridState::new();
        let cell = CellCoord::new(1, 2);
        grid.set(cell, Some(CellValue::Color("#fff".into())));
        assert_eq!(grid.len(), 1);
        grid.set(cell, None);
        assert!(grid.is_empty());
        assert_eq!(grid, GridState::new());
    }

    #[test]
    fn fills_of_different_kinds_never_match() {
        let id = ImageRef::new();
        assert_eq!(Fill::Image(id), Fill::Image(id));
        assert_ne!(Fill::Image(id), Fill::Image(ImageRef::new()));
        assert_ne!(Fill::color(id.to_string()), Fill::Image(id));
    }

    #[test]
    fn subdividing_seeds_children_with_the_old_leaf() {
        let g = geo();
        let cell = CellCoord::new(2, 2);
        let mut grid = GridState::new();
        grid.set(cell, Some(red().into()));
        assert!(grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Subdivide, &red()));
        for idx in 0..4 {
            assert_eq!(child(&grid, cell, idx), Some(CellValue::Color("red".into())));
        }
    }

    #[test]
    fn subdividing_an_empty_cell_keeps_empty_children() {
        let g = geo();
        let cell = CellCoord::new(0, 0);
        let mut grid = GridState::new();
        assert!(grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Subdivide, &red()));
        assert_eq!(grid.get(cell), Some(&CellValue::subdivided(None)));
    }

    #[test]
    fn paint_routes_to_center_and_corners() {
        let g = geo();
        let cell = CellCoord::new(2, 2);
        let blue = Fill::color("blue");
        let mut grid = GridState::new();
        grid.set(cell, Some(red().into()));
        grid.subdivide(cell);

        assert!(grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Pencil, &blue));
        assert_eq!(child(&grid, cell, 3), Some(CellValue::Color("blue".into())));
        assert_eq!(child(&grid, cell, 0), Some(CellValue::Color("red".into())));

        let [v0, _, v2] = g.vertices(cell);
        let near_v2 = v2 + (g.centroid(cell) - v2) * 0.1;
        assert!(grid.route_and_mutate(&g, cell, near_v2, Tool::Pencil, &blue));
        assert_eq!(child(&grid, cell, 2), Some(CellValue::Color("blue".into())));

        let near_v0 = v0 + (g.centroid(cell) - v0) * 0.1;
        assert!(grid.route_and_mutate(&g, cell, near_v0, Tool::Eraser, &blue));
        assert_eq!(child(&grid, cell, 0), None);
        assert_eq!(child(&grid, cell, 1), Some(CellValue::Color("red".into())));
    }

    #[test]
    fn repainting_the_same_leaf_reports_no_change() {
        let g = geo();
        let cell = CellCoord::new(3, 3);
        let mut grid = GridState::new();
        assert!(grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Pencil, &red()));
        assert!(!grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Pencil, &red()));
        assert!(!grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Bucket, &Fill::color("x")));
        assert!(!grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Picker, &Fill::color("x")));
        assert!(grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Eraser, &red()));
        assert!(!grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Eraser, &red()));
        assert!(grid.is_empty());
    }

    #[test]
    fn subdivide_click_on_a_node_goes_one_level_deeper() {
        let g = geo();
        let cell = CellCoord::new(4, 4);
        let center = g.centroid(cell);
        let mut grid = GridState::new();
        grid.set(cell, Some(red().into()));
        grid.route_and_mutate(&g, cell, center, Tool::Subdivide, &red());
        assert_eq!(grid.get(cell).map(CellValue::depth), Some(1));

        assert!(grid.route_and_mutate(&g, cell, center, Tool::Subdivide, &red()));
        assert_eq!(grid.get(cell).map(CellValue::depth), Some(2));
        let center_child = child(&grid, cell, 3).unwrap();
        assert_eq!(center_child, CellValue::subdivided(Some(CellValue::Color("red".into()))));
        assert_eq!(child(&grid, cell, 1), Some(CellValue::Color("red".into())));
    }

    #[test]
    fn whole_cell_subdivide_is_a_no_op_on_nodes() {
        let mut grid = GridState::new();
        let cell = CellCoord::new(1, 1);
        assert!(grid.subdivide(cell));
        let before = grid.clone();
        assert!(!grid.subdivide(cell));
        assert_eq!(grid, before);
    }

    #[test]
    fn pick_reads_the_routed_leaf() {
        let g = geo();
        let cell = CellCoord::new(5, 2);
        let mut grid = GridState::new();
        assert_eq!(grid.pick(&g, cell, g.centroid(cell)), None);
        grid.subdivide(cell);
        grid.route_and_mutate(&g, cell, g.centroid(cell), Tool::Pencil, &red());
        assert_eq!(grid.pick(&g, cell, g.centroid(cell)), Some(red()));
        let [v0, _, _] = g.vertices(cell);
        let near_v0 = v0 + (g.centroid(cell) - v0) * 0.1;
        assert_eq!(grid.pick(&g, cell, near_v0), None);
    }

    #[test]
    fn leaf_triangle_shrinks_with_depth() {
        let g = geo();
        let cell = CellCoord::new(2, 3);
        let center = g.centroid(cell);
        let mut grid = GridState::new();
        assert_eq!(grid.leaf_triangle(&g, cell, center), None);
        grid.subdivide(cell);
        let tri = grid.leaf_triangle(&g, cell, center).unwrap();
        let full = g.vertices(cell);
        let side = |t: &[Pos2; 3]| t[0].distance(t[1]);
        assert!((side(&tri) - side(&full) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn out_of_bounds_cells_are_skipped() {
        let g = geo();
        let mut grid = GridState::new();
        let cell = CellCoord::new(10, 0);
        assert!(!grid.route_and_mutate(&g, cell, pos2(5.0, 5.0), Tool::Pencil, &red()));
        assert!(grid.is_empty());
    }

    #[test]
    fn retain_within_drops_cells_past_the_new_bounds() {
        let mut grid = GridState::new();
        grid.set(CellCoord::new(0, 0), Some(red().into()));
        grid.set(CellCoord::new(9, 9), Some(red().into()));
        assert_eq!(grid.retain_within(&GridGeometry::new(20.0, 5, 5)), 1);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn json_uses_row_col_keys_and_tagged_values() {
        let mut grid = GridState::new();
        grid.set(CellCoord::new(0, 1), Some(CellValue::Color("#111111".into())));
        grid.set(CellCoord::new(2, 0), Some(CellValue::subdivided(None)));
        let text = serde_json::to_string(&grid).unwrap();
        assert_eq!(
            text,
            r##"{"0,1":{"color":"#111111"},"2,0":{"subdivided":[null,null,null,null]}}"##
        );
        let back: GridState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, grid);
    }
}
