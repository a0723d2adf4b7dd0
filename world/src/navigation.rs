//! Immutable walkability grid handed to the world by the level generator.

use std::hash::{Hash, Hasher};

use glam::Vec2;
use prophecy_core::NodeCoord;
use thiserror::Error;

/// Reasons a walkability grid could not be constructed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GridError {
    /// The requested grid contains no nodes.
    #[error("grid must contain at least one node, got {columns}x{rows}")]
    EmptyDimensions {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The cell size is zero, negative or not finite.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
    /// The grid origin is not finite.
    #[error("grid origin must be finite, got ({x}, {y})")]
    InvalidOrigin {
        /// Horizontal origin component.
        x: f32,
        /// Vertical origin component.
        y: f32,
    },
    /// A text layout row differs in width from the first row.
    #[error("layout row {row} has {found} glyphs, expected {expected}")]
    RaggedRow {
        /// Zero-based line index within the layout.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A text layout contains a glyph with no meaning.
    #[error("unknown glyph `{glyph}` at layout row {row}, column {column}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based line index within the layout.
        row: usize,
        /// Zero-based character index within the line.
        column: usize,
    },
}

/// Traversal class assigned to a node when the grid is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Agents may enter the node, paying the additional penalty.
    Walkable {
        /// Extra cost added on top of the step cost when entering the node.
        penalty: u32,
    },
    /// Agents never enter the node.
    Blocked,
}

impl NodeKind {
    /// Walkable node with uniform cost.
    pub const OPEN: Self = Self::Walkable { penalty: 0 };

    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::OPEN),
            '#' => Some(Self::Blocked),
            '1'..='9' => glyph.to_digit(10).map(|penalty| Self::Walkable { penalty }),
            _ => None,
        }
    }
}

/// Single grid cell.
///
/// Nodes compare and hash by grid coordinate only, never by world position.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    coord: NodeCoord,
    world_position: Vec2,
    walkable: bool,
    penalty: u32,
}

impl Node {
    /// Grid coordinate of the node.
    #[must_use]
    pub const fn coord(&self) -> NodeCoord {
        self.coord
    }

    /// World-space centre of the node.
    #[must_use]
    pub const fn world_position(&self) -> Vec2 {
        self.world_position
    }

    /// Whether agents may enter the node.
    #[must_use]
    pub const fn walkable(&self) -> bool {
        self.walkable
    }

    /// Additional traversal cost paid when entering the node.
    #[must_use]
    pub const fn penalty(&self) -> u32 {
        self.penalty
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
    }
}

/// Dense row-major grid of nodes covering the arena.
///
/// Node `(0, 0)` sits at the lower-left corner anchored at `origin`; rows
/// grow upward. The grid always holds at least one node and never changes
/// after construction.
#[derive(Clone, Debug)]
pub struct WalkabilityGrid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec2,
    nodes: Vec<Node>,
}

impl WalkabilityGrid {
    /// Builds a grid by classifying every coordinate with `classify`.
    pub fn from_fn<F>(
        columns: u32,
        rows: u32,
        cell_size: f32,
        origin: Vec2,
        mut classify: F,
    ) -> Result<Self, GridError>
    where
        F: FnMut(NodeCoord) -> NodeKind,
    {
        if columns == 0 || rows == 0 {
            return Err(GridError::EmptyDimensions { columns, rows });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        if !origin.is_finite() {
            return Err(GridError::InvalidOrigin {
                x: origin.x,
                y: origin.y,
            });
        }

        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        let mut nodes = Vec::with_capacity(capacity);
        for y in 0..rows {
            for x in 0..columns {
                let coord = NodeCoord::new(x, y);
                let (walkable, penalty) = match classify(coord) {
                    NodeKind::Walkable { penalty } => (true, penalty),
                    NodeKind::Blocked => (false, 0),
                };
                nodes.push(Node {
                    coord,
                    world_position: centre_of(origin, cell_size, coord),
                    walkable,
                    penalty,
                });
            }
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            origin,
            nodes,
        })
    }

    /// Builds a grid from a text layout.
    ///
    /// `.` is walkable, `#` is blocked and `1`..`9` are walkable with that
    /// penalty. The first line describes the top row of the arena.
    pub fn from_rows<S>(layout: &[S], cell_size: f32, origin: Vec2) -> Result<Self, GridError>
    where
        S: AsRef<str>,
    {
        let lines: Vec<Vec<char>> = layout
            .iter()
            .map(|line| line.as_ref().trim_end().chars().collect())
            .collect();
        let width = lines.first().map_or(0, Vec::len);

        let mut kinds = Vec::with_capacity(width * lines.len());
        for (row, line) in lines.iter().enumerate() {
            if line.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: line.len(),
                });
            }
            for (column, glyph) in line.iter().copied().enumerate() {
                let kind = NodeKind::from_glyph(glyph).ok_or(GridError::UnknownGlyph {
                    glyph,
                    row,
                    column,
                })?;
                kinds.push(kind);
            }
        }

        let columns = u32::try_from(width).unwrap_or(u32::MAX);
        let rows = u32::try_from(lines.len()).unwrap_or(u32::MAX);
        Self::from_fn(columns, rows, cell_size, origin, |coord| {
            let line = (rows - 1 - coord.y()) as usize;
            kinds[line * width + coord.x() as usize]
        })
    }

    /// Number of node columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of node rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Edge length of a node in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space position of the grid's lower-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// World-space extent covered by the grid.
    #[must_use]
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.columns as f32 * self.cell_size,
            self.rows as f32 * self.cell_size,
        )
    }

    /// Reports whether `position` lies inside the grid's world-space extent.
    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        let far = self.origin + self.world_size();
        position.is_finite()
            && position.x >= self.origin.x
            && position.y >= self.origin.y
            && position.x <= far.x
            && position.y <= far.y
    }

    /// Clamps `position` into the grid's world-space extent.
    #[must_use]
    pub fn clamp_position(&self, position: Vec2) -> Vec2 {
        position.clamp(self.origin, self.origin + self.world_size())
    }

    /// Moves from `from` toward `to` without ending on a blocked node.
    ///
    /// The move is split into sub-steps of at most half a cell so thin walls
    /// cannot be skipped. A sub-step whose node is blocked slides along the x
    /// axis, then the y axis, and otherwise stops. A unit that already stands
    /// on a blocked node moves freely until it leaves.
    #[must_use]
    pub fn slide(&self, from: Vec2, to: Vec2) -> Vec2 {
        let to = self.clamp_position(to);
        if !from.is_finite() || !to.is_finite() {
            return self.clamp_position(from);
        }

        let delta = to - from;
        let steps = (delta.length() / (self.cell_size * 0.5)).ceil().max(1.0) as u32;
        let step = delta / steps as f32;
        let mut position = from;
        for _ in 0..steps {
            position = self.slide_step(position, position + step);
        }
        position
    }

    fn slide_step(&self, from: Vec2, to: Vec2) -> Vec2 {
        let to = self.clamp_position(to);
        if self.node_at(to).walkable() || !self.node_at(from).walkable() {
            return to;
        }

        let along_x = Vec2::new(to.x, from.y);
        if self.node_at(along_x).walkable() {
            return along_x;
        }
        let along_y = Vec2::new(from.x, to.y);
        if self.node_at(along_y).walkable() {
            return along_y;
        }
        from
    }

    /// Returns the node stored at `coord`, if it lies within the grid.
    #[must_use]
    pub fn node(&self, coord: NodeCoord) -> Option<&Node> {
        self.index(coord).and_then(|index| self.nodes.get(index))
    }

    /// Returns the node containing `position`.
    ///
    /// Positions outside the grid, including non-finite ones, clamp to the
    /// nearest boundary node.
    #[must_use]
    pub fn node_at(&self, position: Vec2) -> &Node {
        let coord = self.coord_at(position);
        let index = coord.y() as usize * self.columns as usize + coord.x() as usize;
        &self.nodes[index]
    }

    /// Coordinate of the node containing `position`, clamped to the grid.
    #[must_use]
    pub fn coord_at(&self, position: Vec2) -> NodeCoord {
        let local = (position - self.origin) / self.cell_size;
        NodeCoord::new(
            clamp_axis(local.x, self.columns),
            clamp_axis(local.y, self.rows),
        )
    }

    /// Reports whether `coord` lies within the grid and can be entered.
    #[must_use]
    pub fn is_walkable(&self, coord: NodeCoord) -> bool {
        self.node(coord).is_some_and(Node::walkable)
    }

    /// Number of walkable nodes in the grid.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.walkable).count()
    }

    /// Dense row-major index of `coord`, if it lies within the grid.
    #[must_use]
    pub fn index(&self, coord: NodeCoord) -> Option<usize> {
        if coord.x() >= self.columns || coord.y() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(coord.y()).ok()?;
        let column = usize::try_from(coord.x()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a grid holds at least one node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Neighbouring coordinates in a fixed order: the four cardinal
    /// directions followed by the four diagonals.
    pub fn neighbours(&self, coord: NodeCoord) -> impl Iterator<Item = Neighbour> + '_ {
        const OFFSETS: [(i64, i64, bool); 8] = [
            (0, 1, false),
            (1, 0, false),
            (0, -1, false),
            (-1, 0, false),
            (1, 1, true),
            (1, -1, true),
            (-1, -1, true),
            (-1, 1, true),
        ];

        OFFSETS.into_iter().filter_map(move |(dx, dy, diagonal)| {
            let x = i64::from(coord.x()) + dx;
            let y = i64::from(coord.y()) + dy;
            if x < 0 || y < 0 || x >= i64::from(self.columns) || y >= i64::from(self.rows) {
                return None;
            }
            Some(Neighbour {
                coord: NodeCoord::new(x as u32, y as u32),
                diagonal,
            })
        })
    }

    /// Closest walkable node to `coord`, searching outward ring by ring.
    ///
    /// Within a ring the candidate with the smallest Euclidean distance wins;
    /// remaining ties prefer the lower row, then the lower column.
    #[must_use]
    pub fn nearest_walkable(&self, coord: NodeCoord) -> Option<NodeCoord> {
        if self.is_walkable(coord) {
            return Some(coord);
        }

        let max_radius = self.columns.max(self.rows);
        for radius in 1..=max_radius {
            let radius = i64::from(radius);
            let mut best: Option<(i64, NodeCoord)> = None;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let x = i64::from(coord.x()) + dx;
                    let y = i64::from(coord.y()) + dy;
                    if x < 0 || y < 0 {
                        continue;
                    }
                    let candidate = NodeCoord::new(x as u32, y as u32);
                    if !self.is_walkable(candidate) {
                        continue;
                    }
                    let distance = dx * dx + dy * dy;
                    let better = best.map_or(true, |(best_distance, best_coord)| {
                        (distance, candidate.y(), candidate.x())
                            < (best_distance, best_coord.y(), best_coord.x())
                    });
                    if better {
                        best = Some((distance, candidate));
                    }
                }
            }
            if let Some((_, found)) = best {
                return Some(found);
            }
        }

        None
    }
}

/// Adjacent coordinate yielded by [`WalkabilityGrid::neighbours`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbour {
    /// Coordinate of the neighbouring node.
    pub coord: NodeCoord,
    /// Whether the step to the neighbour is diagonal.
    pub diagonal: bool,
}

fn centre_of(origin: Vec2, cell_size: f32, coord: NodeCoord) -> Vec2 {
    origin
        + Vec2::new(
            (coord.x() as f32 + 0.5) * cell_size,
            (coord.y() as f32 + 0.5) * cell_size,
        )
}

fn clamp_axis(local: f32, count: u32) -> u32 {
    let floored = local.floor() as i64;
    floored.clamp(0, i64::from(count) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(columns: u32, rows: u32) -> WalkabilityGrid {
        WalkabilityGrid::from_fn(columns, rows, 1.0, Vec2::splat(-0.5), |_| NodeKind::OPEN)
            .expect("valid grid")
    }

    #[test]
    fn node_centres_follow_origin_and_cell_size() {
        let grid = WalkabilityGrid::from_fn(3, 2, 2.0, Vec2::new(10.0, 20.0), |_| NodeKind::OPEN)
            .expect("valid grid");

        let node = grid.node(NodeCoord::new(2, 1)).expect("node exists");
        assert_eq!(node.world_position(), Vec2::new(15.0, 23.0));
        assert_eq!(grid.world_size(), Vec2::new(6.0, 4.0));
    }

    #[test]
    fn node_at_finds_containing_node() {
        let grid = unit_grid(10, 10);
        assert_eq!(grid.coord_at(Vec2::new(3.2, 4.4)), NodeCoord::new(3, 4));
        assert_eq!(grid.coord_at(Vec2::new(2.6, 0.0)), NodeCoord::new(3, 0));
    }

    #[test]
    fn node_at_clamps_out_of_bounds_positions() {
        let grid = unit_grid(4, 3);
        assert_eq!(grid.node_at(Vec2::new(-50.0, 1.0)).coord(), NodeCoord::new(0, 1));
        assert_eq!(grid.node_at(Vec2::new(99.0, 99.0)).coord(), NodeCoord::new(3, 2));
        assert_eq!(
            grid.node_at(Vec2::new(f32::NAN, f32::INFINITY)).coord(),
            NodeCoord::new(0, 2)
        );
    }

    #[test]
    fn slide_stops_at_walls_and_follows_open_axis() {
        let grid = WalkabilityGrid::from_rows(&["....", "##..", "...."], 1.0, Vec2::ZERO)
            .expect("layout");

        let stopped = grid.slide(Vec2::new(1.5, 0.5), Vec2::new(1.5, 2.5));
        assert_eq!(stopped, Vec2::new(1.5, 0.5));

        let slid = grid.slide(Vec2::new(1.5, 0.5), Vec2::new(2.5, 1.5));
        assert!(grid.node_at(slid).walkable());
        assert!(slid.x > 1.5);

        let escaped = grid.slide(Vec2::new(0.5, 1.5), Vec2::new(0.5, 2.5));
        assert_eq!(escaped, Vec2::new(0.5, 2.5));
    }

    #[test]
    fn slide_cannot_skip_a_thin_wall() {
        let grid = WalkabilityGrid::from_rows(&["..#.."], 1.0, Vec2::ZERO).expect("layout");
        let end = grid.slide(Vec2::new(0.5, 0.5), Vec2::new(4.5, 0.5));
        assert_eq!(grid.coord_at(end), NodeCoord::new(1, 0));
    }

    #[test]
    fn nodes_compare_by_coordinate_only() {
        let left = WalkabilityGrid::from_fn(2, 2, 1.0, Vec2::ZERO, |_| NodeKind::OPEN)
            .expect("valid grid");
        let right = WalkabilityGrid::from_fn(2, 2, 5.0, Vec2::splat(100.0), |_| NodeKind::Blocked)
            .expect("valid grid");

        let a = left.node(NodeCoord::new(1, 1)).expect("node");
        let b = right.node(NodeCoord::new(1, 1)).expect("node");
        assert_ne!(a.world_position(), b.world_position());
        assert_eq!(a, b);
        assert_ne!(a, left.node(NodeCoord::new(0, 1)).expect("node"));
    }

    #[test]
    fn text_layout_reads_top_row_first() {
        let grid = WalkabilityGrid::from_rows(&["#..", "..3"], 1.0, Vec2::ZERO).expect("layout");

        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);
        assert!(!grid.is_walkable(NodeCoord::new(0, 1)));
        assert!(grid.is_walkable(NodeCoord::new(0, 0)));
        assert_eq!(grid.node(NodeCoord::new(2, 0)).map(Node::penalty), Some(3));
        assert_eq!(grid.walkable_count(), 5);
    }

    #[test]
    fn text_layout_rejects_bad_input() {
        assert_eq!(
            WalkabilityGrid::from_rows(&["..", "."], 1.0, Vec2::ZERO).unwrap_err(),
            GridError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            WalkabilityGrid::from_rows(&[".x"], 1.0, Vec2::ZERO).unwrap_err(),
            GridError::UnknownGlyph {
                glyph: 'x',
                row: 0,
                column: 1
            }
        );
        let empty: [&str; 0] = [];
        assert!(matches!(
            WalkabilityGrid::from_rows(&empty, 1.0, Vec2::ZERO),
            Err(GridError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn invalid_cell_size_is_rejected() {
        let result = WalkabilityGrid::from_fn(2, 2, 0.0, Vec2::ZERO, |_| NodeKind::OPEN);
        assert_eq!(result.unwrap_err(), GridError::InvalidCellSize(0.0));
    }

    #[test]
    fn corner_node_has_three_neighbours() {
        let grid = unit_grid(3, 3);
        let neighbours: Vec<_> = grid.neighbours(NodeCoord::new(0, 0)).collect();
        assert_eq!(
            neighbours,
            vec![
                Neighbour {
                    coord: NodeCoord::new(0, 1),
                    diagonal: false
                },
                Neighbour {
                    coord: NodeCoord::new(1, 0),
                    diagonal: false
                },
                Neighbour {
                    coord: NodeCoord::new(1, 1),
                    diagonal: true
                },
            ]
        );
    }

    #[test]
    fn nearest_walkable_searches_outward() {
        let grid = WalkabilityGrid::from_rows(&["....", "###.", "###."], 1.0, Vec2::ZERO)
            .expect("layout");

        assert_eq!(
            grid.nearest_walkable(NodeCoord::new(0, 0)),
            Some(NodeCoord::new(0, 2))
        );
        assert_eq!(
            grid.nearest_walkable(NodeCoord::new(2, 0)),
            Some(NodeCoord::new(3, 0))
        );

        let walled = WalkabilityGrid::from_rows(&["##"], 1.0, Vec2::ZERO).expect("layout");
        assert_eq!(walled.nearest_walkable(NodeCoord::new(0, 0)), None);
    }
}
