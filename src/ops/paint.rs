//! Grid mutations driven by the painting tools.
//!
//! Every function reports whether the grid actually changed so callers can
//! skip redraws and undo snapshots for no-op gestures.

use std::collections::{HashSet, VecDeque};

use emath::Pos2;

use crate::canvas::{CellValue, Fill, GridState};
use crate::components::tools::Tool;
use crate::geometry::{CellCoord, GridGeometry};

/// Default cap on flood-fill dequeues.
pub const FLOOD_FILL_LIMIT: usize = 500_000;

/// Apply pencil or eraser to whole cells. Other tools are a no-op.
pub fn batch_paint(grid: &mut GridState, cells: &[CellCoord], tool: Tool, fill: &Fill) -> bool {
    let mut changed = false;
    match tool {
        Tool::Pencil => {
            let value = CellValue::from(fill.clone());
            for &cell in cells {
                if grid.get(cell) != Some(&value) {
                    grid.set(cell, Some(value.clone()));
                    changed = true;
                }
            }
        }
        Tool::Eraser => {
            for &cell in cells {
                changed |= grid.delete(cell).is_some();
            }
        }
        Tool::Bucket | Tool::Picker | Tool::Subdivide => {}
    }
    changed
}

/// Breadth-first fill of the region connected to `start` whose cells hold
/// exactly the value found at `start`.
///
/// Empty cells do not form a region: an empty start cell is painted on its
/// own. A subdivided start cell matches only structurally identical nodes,
/// which are replaced by the fill as a whole. Stops after `limit` dequeues and
/// keeps whatever was filled so far.
pub fn flood_fill(
    grid: &mut GridState,
    geometry: &GridGeometry,
    start: CellCoord,
    fill: &Fill,
    limit: usize,
) -> bool {
    if !geometry.contains(start) {
        return false;
    }
    let replacement = CellValue::from(fill.clone());
    let target = grid.get(start).cloned();
    if target.as_ref() == Some(&replacement) {
        return false;
    }
    if target.is_none() {
        grid.set(start, Some(replacement));
        return true;
    }

    let mut queue = VecDeque::with_capacity(1024);
    let mut visited = HashSet::new();
    let mut dequeued = 0usize;
    let mut changed = false;
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        dequeued += 1;
        if dequeued > limit {
            log_warn!(
                "Flood fill from {} stopped after {} cells (limit {})",
                start,
                dequeued - 1,
                limit
            );
            break;
        }
        if !visited.insert(cell) {
            continue;
        }
        if grid.get(cell) != target.as_ref() {
            continue;
        }

        grid.set(cell, Some(replacement.clone()));
        changed = true;

        for next in GridGeometry::neighbors(cell) {
            if geometry.contains(next) && !visited.contains(&next) {
                queue.push_back(next);
            }
        }
    }
    changed
}

/// Paint a pointer drag from `p0` to `p1`.
///
/// Whole cells along the stroke are batch-painted. With a single-cell brush,
/// cells holding a subdivided node are instead painted at each stroke sample
/// through the subdivision routing, so the stroke lands on the sub-triangles
/// under the pointer.
#[allow(clippy::too_many_arguments)]
pub fn paint_stroke(
    grid: &mut GridState,
    geometry: &GridGeometry,
    p0: Pos2,
    p1: Pos2,
    tool: Tool,
    brush_size: u8,
    pixel_anchor: bool,
    fill: &Fill,
) -> bool {
    if !matches!(tool, Tool::Pencil | Tool::Eraser) {
        return false;
    }
    let size = tool.effective_size(brush_size);
    if size > 1 {
        let cells = geometry.interpolate_stroke(p0, p1, tool, size, pixel_anchor);
        return batch_paint(grid, &cells, tool, fill);
    }

    let mut changed = false;
    let mut whole = Vec::new();
    let mut seen = HashSet::new();
    for p in geometry.stroke_samples(p0, p1) {
        let Some(cell) = geometry.pixel_to_cell(p) else {
            continue;
        };
        if grid.get(cell).is_some_and(CellValue::is_subdivided) {
            changed |= grid.route_and_mutate(geometry, cell, p, tool, fill);
        } else if seen.insert(cell) {
            whole.push(cell);
        }
    }
    changed |= batch_paint(grid, &whole, tool, fill);
    changed
}

/// Subdivide every listed cell as a whole. Cells that are already subdivided
/// are left untouched.
pub fn subdivide_cells(grid: &mut GridState, geometry: &GridGeometry, cells: &[CellCoord]) -> bool {
    let mut changed = false;
    for &cell in cells {
        if geometry.contains(cell) {
            changed |= grid.subdivide(cell);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> GridGeometry {
        GridGeometry::new(20.0, 10, 10)
    }

    fn color(token: &str) -> Fill {
        Fill::color(token)
    }

    fn leaf(token: &str) -> Option<CellValue> {
        Some(CellValue::Color(token.into()))
    }

    #[test]
    fn bucket_on_empty_grid_fills_only_the_start_cell() {
        let g = geo();
        let mut grid = GridState::new();
        let fill = color("#111111");
        assert!(flood_fill(&mut grid, &g, CellCoord::new(0, 0), &fill, FLOOD_FILL_LIMIT));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(CellCoord::new(0, 0)), leaf("#111111").as_ref());
        assert!(!flood_fill(&mut grid, &g, CellCoord::new(0, 0), &fill, FLOOD_FILL_LIMIT));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn bucket_recolors_a_fully_painted_grid() {
        let g = geo();
        let mut grid = GridState::new();
        let all: Vec<_> = (0..10).flat_map(|r| (0..10).map(move |c| CellCoord::new(r, c))).collect();
        batch_paint(&mut grid, &all, Tool::Pencil, &color("A"));
        assert!(flood_fill(&mut grid, &g, CellCoord::new(4, 4), &color("B"), FLOOD_FILL_LIMIT));
        assert!(grid.iter().all(|(_, v)| *v == CellValue::Color("B".into())));
    }

    #[test]
    fn flood_fill_with_existing_color_is_a_no_op() {
        let g = geo();
        let mut grid = GridState::new();
        grid.set(CellCoord::new(2, 2), leaf("#abcdef"));
        let before = grid.clone();
        assert!(!flood_fill(&mut grid, &g, CellCoord::new(2, 2), &color("#abcdef"), FLOOD_FILL_LIMIT));
        assert_eq!(grid, before);
    }

    #[test]
    fn flood_fill_leaves_disconnected_islands_alone() {
        let g = geo();
        let mut grid = GridState::new();
        // Region A: a horizontal run on row 0.
        for col in 0..3 {
            grid.set(CellCoord::new(0, col), leaf("A"));
        }
        // Island of A far away, isolated by empty cells.
        grid.set(CellCoord::new(8, 8), leaf("A"));

        assert!(flood_fill(&mut grid, &g, CellCoord::new(0, 1), &color("B"), FLOOD_FILL_LIMIT));
        for col in 0..3 {
            assert_eq!(grid.get(CellCoord::new(0, col)), leaf("B").as_ref());
        }
        assert_eq!(grid.get(CellCoord::new(8, 8)), leaf("A").as_ref());
    }

    #[test]
    fn flood_fill_limit_yields_partial_result() {
        let g = geo();
        let mut grid = GridState::new();
        let all: Vec<_> = (0..10).flat_map(|r| (0..10).map(move |c| CellCoord::new(r, c))).collect();
        batch_paint(&mut grid, &all, Tool::Pencil, &color("A"));
        assert!(flood_fill(&mut grid, &g, CellCoord::new(0, 0), &color("B"), 5));
        let filled = grid.iter().filter(|(_, v)| **v == CellValue::Color("B".into())).count();
        assert!(filled > 0 && filled <= 5);
    }

    #[test]
    fn flood_fill_out_of_bounds_start() {
        let g = geo();
        let mut grid = GridState::new();
        assert!(!flood_fill(&mut grid, &g, CellCoord::new(-1, 0), &color("#000"), FLOOD_FILL_LIMIT));
        assert!(!flood_fill(&mut grid, &g, CellCoord::new(0, 10), &color("#000"), FLOOD_FILL_LIMIT));
        assert!(grid.is_empty());
    }

    #[test]
    fn color_and_image_fills_never_match() {
        let g = geo();
        let mut grid = GridState::new();
        let image = Fill::Image(crate::canvas::ImageRef::new());
        grid.set(CellCoord::new(0, 0), Some(CellValue::from(image.clone())));
        grid.set(CellCoord::new(0, 1), leaf("#ffffff"));
        assert!(flood_fill(&mut grid, &g, CellCoord::new(0, 0), &color("#000000"), FLOOD_FILL_LIMIT));
        assert_eq!(grid.get(CellCoord::new(0, 1)), leaf("#ffffff").as_ref());
    }

    #[test]
    fn batch_paint_reports_changes() {
        let mut grid = GridState::new();
        let cells = [CellCoord::new(0, 0), CellCoord::new(0, 1)];
        let red = color("#ff0000");
        assert!(batch_paint(&mut grid, &cells, Tool::Pencil, &red));
        assert!(!batch_paint(&mut grid, &cells, Tool::Pencil, &red));
        assert!(!batch_paint(&mut grid, &cells, Tool::Bucket, &red));
        assert!(batch_paint(&mut grid, &cells[..1], Tool::Eraser, &red));
        assert!(!batch_paint(&mut grid, &cells[..1], Tool::Eraser, &red));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn stroke_reaches_sub_triangles_of_subdivided_cells() {
        let g = geo();
        let mut grid = GridState::new();
        let cell = CellCoord::new(3, 3);
        grid.subdivide(cell);
        let c = g.centroid(cell);

        assert!(paint_stroke(&mut grid, &g, c, c, Tool::Pencil, 1, false, &color("#00ff00")));
        match grid.get(cell) {
            Some(CellValue::Subdivided(children)) => {
                assert_eq!(children[3], leaf("#00ff00"));
                assert_eq!(children[0], None);
            }
            other => panic!("expected node, got {:?}", other),
        }
    }

    #[test]
    fn large_brush_stroke_paints_whole_cells() {
        let g = geo();
        let mut grid = GridState::new();
        let cell = CellCoord::new(3, 3);
        grid.subdivide(cell);
        let c = g.centroid(cell);
        assert!(paint_stroke(&mut grid, &g, c, c, Tool::Pencil, 2, false, &color("#00ff00")));
        assert_eq!(grid.get(cell), leaf("#00ff00").as_ref());
    }

    #[test]
    fn subdivide_cells_skips_existing_nodes() {
        let g = geo();
        let mut grid = GridState::new();
        let a = CellCoord::new(1, 1);
        let b = CellCoord::new(1, 2);
        grid.set(a, leaf("red"));
        assert!(subdivide_cells(&mut grid, &g, &[a, b]));
        assert_eq!(grid.get(a), Some(&CellValue::subdivided(leaf("red"))));
        assert_eq!(grid.get(b), Some(&CellValue::subdivided(None)));
        assert!(!subdivide_cells(&mut grid, &g, &[a, b]));
    }
}
