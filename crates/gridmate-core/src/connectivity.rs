//! Connectivity engine: island maintenance and path-to-king reachability.
//!
//! Islands are maximal 4-connected components of cells owned by one
//! player; they partition all owned cells of a game. Maintenance is
//! incremental: a touched-region flood fill rediscovers only the
//! components affected by a mutation instead of rescanning the board.
//!
//! Path-to-king is a separate, transient BFS: it is queried against
//! candidate cells that have not been committed to the board yet, so it
//! cannot rely on island membership.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::ids::{IslandId, PieceId, PlayerId};
use crate::piece::Piece;

/// A maximal connected component of cells owned by one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Island {
    pub id: IslandId,
    pub owner: PlayerId,
    pub cells: HashSet<Position>,
    /// True iff a member cell hosts this owner's king.
    pub has_king: bool,
}

/// Owns all islands of a game and keeps them consistent with the board.
#[derive(Debug, Clone, Default)]
pub struct IslandMap {
    islands: HashMap<IslandId, Island>,
    next_id: u64,
}

impl IslandMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Island> {
        self.islands.values()
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Re-discovers components after the cells at `seeds` were written.
    ///
    /// Flood fills from each seed over same-owner cells; any existing
    /// islands the component touches are merged into one new island.
    pub fn absorb(
        &mut self,
        board: &mut Board,
        pieces: &HashMap<PieceId, Piece>,
        seeds: &[Position],
    ) {
        let mut created: HashSet<IslandId> = HashSet::new();

        for &seed in seeds {
            let Some(cell) = board.get(seed) else { continue };
            if let Some(island) = cell.island {
                if created.contains(&island) {
                    // Already swept into an island built by this call.
                    continue;
                }
            }
            let owner = cell.owner;
            let component = flood(board, seed, owner);

            // Merge every pre-existing island the component touches.
            for pos in &component {
                if let Some(old) = board.get(*pos).and_then(|c| c.island) {
                    self.islands.remove(&old);
                }
            }

            let id = self.commit(board, pieces, owner, component);
            created.insert(id);
        }
    }

    /// Re-discovers components after member cells of `affected` islands
    /// were removed from the board. A removed cell may disconnect an
    /// island into several; flood fill from each remnant rediscovers
    /// the resulting components.
    pub fn rebuild(
        &mut self,
        board: &mut Board,
        pieces: &HashMap<PieceId, Piece>,
        affected: &[IslandId],
    ) {
        for &id in affected {
            let Some(island) = self.islands.remove(&id) else { continue };
            let mut remnants: HashSet<Position> = island
                .cells
                .into_iter()
                .filter(|pos| {
                    board
                        .get(*pos)
                        .is_some_and(|c| c.owner == island.owner && c.island == Some(id))
                })
                .collect();

            while let Some(&start) = remnants.iter().next() {
                let component = flood(board, start, island.owner);
                for pos in &component {
                    remnants.remove(pos);
                }
                self.commit(board, pieces, island.owner, component);
            }
        }
    }

    /// Rebuilds every island of one owner from the current board.
    ///
    /// Used after bulk mutations (row clears, pause forfeits) where
    /// tracking individual touched components isn't worth it.
    pub fn recompute_owner(
        &mut self,
        board: &mut Board,
        pieces: &HashMap<PieceId, Piece>,
        owner: PlayerId,
    ) {
        self.islands.retain(|_, island| island.owner != owner);
        let seeds: Vec<Position> = board
            .positions()
            .filter(|pos| board.owner_at(*pos) == Some(owner))
            .collect();
        for &pos in &seeds {
            if let Some(cell) = board.get_mut(pos) {
                cell.island = None;
            }
        }
        let mut done: HashSet<Position> = HashSet::new();
        for &seed in &seeds {
            if done.contains(&seed) {
                continue;
            }
            let component = flood(board, seed, owner);
            done.extend(component.iter().copied());
            self.commit(board, pieces, owner, component);
        }
    }

    /// Applies a board-expansion offset to every island's member set.
    pub fn shift_all(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for island in self.islands.values_mut() {
            island.cells = island.cells.iter().map(|p| p.offset(dx, dy)).collect();
        }
    }

    fn commit(
        &mut self,
        board: &mut Board,
        pieces: &HashMap<PieceId, Piece>,
        owner: PlayerId,
        cells: HashSet<Position>,
    ) -> IslandId {
        self.next_id += 1;
        let id = IslandId(self.next_id);
        let has_king = cells.iter().any(|pos| {
            board
                .get(*pos)
                .and_then(|c| c.piece)
                .and_then(|pid| pieces.get(&pid))
                .is_some_and(|p| p.is_king())
        });
        for pos in &cells {
            if let Some(cell) = board.get_mut(*pos) {
                cell.island = Some(id);
            }
        }
        self.islands.insert(
            id,
            Island {
                id,
                owner,
                cells,
                has_king,
            },
        );
        id
    }
}

/// Flood fill over same-owner cells, starting at `start`.
fn flood(board: &Board, start: Position, owner: PlayerId) -> HashSet<Position> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    if board.owner_at(start) == Some(owner) {
        seen.insert(start);
        queue.push_back(start);
    }
    while let Some(pos) = queue.pop_front() {
        for next in pos.neighbors() {
            if !seen.contains(&next) && board.owner_at(next) == Some(owner) {
                seen.insert(next);
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Breadth-first search from `start` over cells owned by `owner`,
/// succeeding iff it reaches `king_pos`.
///
/// `overlay` names candidate cells treated as owned even though they are
/// not committed to the board yet (tetromino placement, purchases).
/// Invalid or negative coordinates simply fail the search.
pub fn has_path_to_king(
    board: &Board,
    owner: PlayerId,
    king_pos: Position,
    start: Position,
    overlay: &HashSet<Position>,
) -> bool {
    let passable =
        |pos: Position| overlay.contains(&pos) || board.owner_at(pos) == Some(owner);
    if !passable(start) {
        return false;
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        if pos == king_pos {
            return true;
        }
        for next in pos.neighbors() {
            if !seen.contains(&next) && passable(next) {
                seen.insert(next);
                queue.push_back(next);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Cell, CellOrigin};
    use crate::piece::PieceKind;

    fn owned(board: &mut Board, owner: u64, x: i32, y: i32) {
        board
            .set(
                Position::new(x, y),
                Cell::new(PlayerId(owner), CellOrigin::Tetromino),
            )
            .unwrap();
    }

    #[test]
    fn test_absorb_builds_single_island() {
        let mut board = Board::new(10, 10);
        let pieces = HashMap::new();
        let mut islands = IslandMap::new();

        owned(&mut board, 1, 2, 2);
        owned(&mut board, 1, 3, 2);
        owned(&mut board, 1, 3, 3);
        islands.absorb(
            &mut board,
            &pieces,
            &[Position::new(2, 2), Position::new(3, 2), Position::new(3, 3)],
        );

        assert_eq!(islands.len(), 1);
        let island = islands.iter().next().unwrap();
        assert_eq!(island.cells.len(), 3);
        assert_eq!(island.owner, PlayerId(1));
    }

    #[test]
    fn test_absorb_merges_touching_islands() {
        let mut board = Board::new(10, 10);
        let pieces = HashMap::new();
        let mut islands = IslandMap::new();

        owned(&mut board, 1, 0, 0);
        islands.absorb(&mut board, &pieces, &[Position::new(0, 0)]);
        owned(&mut board, 1, 2, 0);
        islands.absorb(&mut board, &pieces, &[Position::new(2, 0)]);
        assert_eq!(islands.len(), 2);

        // Bridge the gap; the two islands merge into one.
        owned(&mut board, 1, 1, 0);
        islands.absorb(&mut board, &pieces, &[Position::new(1, 0)]);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands.iter().next().unwrap().cells.len(), 3);
    }

    #[test]
    fn test_islands_never_span_two_owners() {
        let mut board = Board::new(10, 10);
        let pieces = HashMap::new();
        let mut islands = IslandMap::new();

        owned(&mut board, 1, 4, 4);
        owned(&mut board, 2, 5, 4);
        islands.absorb(&mut board, &pieces, &[Position::new(4, 4)]);
        islands.absorb(&mut board, &pieces, &[Position::new(5, 4)]);

        assert_eq!(islands.len(), 2);
        for island in islands.iter() {
            assert_eq!(island.cells.len(), 1);
        }
    }

    #[test]
    fn test_rebuild_splits_disconnected_island() {
        let mut board = Board::new(10, 10);
        let pieces = HashMap::new();
        let mut islands = IslandMap::new();

        for x in 0..5 {
            owned(&mut board, 1, x, 0);
        }
        islands.absorb(
            &mut board,
            &pieces,
            &(0..5).map(|x| Position::new(x, 0)).collect::<Vec<_>>(),
        );
        assert_eq!(islands.len(), 1);
        let id = islands.iter().next().unwrap().id;

        // Knock out the middle cell; the line splits in two.
        board.remove(Position::new(2, 0));
        islands.rebuild(&mut board, &pieces, &[id]);

        assert_eq!(islands.len(), 2);
        let mut sizes: Vec<usize> = islands.iter().map(|i| i.cells.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn test_has_king_tracks_king_cell() {
        let mut board = Board::new(10, 10);
        let mut pieces = HashMap::new();
        let mut islands = IslandMap::new();

        let king = Piece::new(PieceId(1), PieceKind::King, PlayerId(1), Position::new(1, 1));
        pieces.insert(king.id, king);
        owned(&mut board, 1, 1, 1);
        board.get_mut(Position::new(1, 1)).unwrap().piece = Some(PieceId(1));
        owned(&mut board, 1, 5, 5);

        islands.absorb(&mut board, &pieces, &[Position::new(1, 1)]);
        islands.absorb(&mut board, &pieces, &[Position::new(5, 5)]);

        let with_king: Vec<bool> = islands.iter().map(|i| i.has_king).collect();
        assert_eq!(with_king.iter().filter(|k| **k).count(), 1);
    }

    #[test]
    fn test_path_to_king_follows_owned_cells_only() {
        let mut board = Board::new(10, 10);
        let king_pos = Position::new(0, 0);
        owned(&mut board, 1, 0, 0);
        owned(&mut board, 1, 1, 0);
        owned(&mut board, 2, 2, 0); // opponent cell breaks the chain
        owned(&mut board, 1, 3, 0);

        let overlay = HashSet::new();
        assert!(has_path_to_king(&board, PlayerId(1), king_pos, Position::new(1, 0), &overlay));
        assert!(!has_path_to_king(&board, PlayerId(1), king_pos, Position::new(3, 0), &overlay));
    }

    #[test]
    fn test_path_to_king_uses_candidate_overlay() {
        let mut board = Board::new(10, 10);
        let king_pos = Position::new(0, 0);
        owned(&mut board, 1, 0, 0);

        // (2,0) only reaches the king through the uncommitted (1,0).
        let overlay: HashSet<Position> =
            [Position::new(1, 0), Position::new(2, 0)].into_iter().collect();
        assert!(has_path_to_king(&board, PlayerId(1), king_pos, Position::new(2, 0), &overlay));
    }

    #[test]
    fn test_path_from_invalid_coordinates_is_false() {
        let board = Board::new(10, 10);
        let overlay = HashSet::new();
        assert!(!has_path_to_king(
            &board,
            PlayerId(1),
            Position::new(0, 0),
            Position::new(-3, -7),
            &overlay
        ));
    }
}
