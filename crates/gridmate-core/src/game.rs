//! The `Game` aggregate: one fully-serialized unit of mutable state.
//!
//! All mutation is synchronous and validate-then-commit: every check a
//! request must pass happens before the first write, so a rejected
//! operation leaves the game exactly as it was. Time-dependent rules
//! (cooldowns, pause timeouts) compare caller-supplied monotonic
//! instants against stored timestamps; the core never reads a clock.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::board::{Board, Cell, CellOrigin, Position};
use crate::chess;
use crate::config::{Difficulty, GameSettings};
use crate::connectivity::{self, IslandMap};
use crate::economy::Ledger;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::ids::{GameId, PieceId, PlayerId};
use crate::piece::{Piece, PieceKind};
use crate::player::{HomeZone, Player};
use crate::rows;
use crate::snapshot::{CellSnapshot, GameSnapshot, IslandSnapshot, PlayerSnapshot};
use crate::tetromino::TetrominoKind;
use crate::turns::TurnPhase;

/// Cumulative forward distance at which a pawn promotes to a knight.
const PAWN_PROMOTION_DISTANCE: u32 = 8;

/// Margin between a home zone and the board edge.
const ZONE_MARGIN: i32 = 2;

/// Horizontal gap between neighboring home zones.
const ZONE_GAP: i32 = 4;

/// Selects the piece a move request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceSelector {
    ById(PieceId),
    FromSquare(Position),
}

/// A chess move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub piece: PieceSelector,
    pub to: Position,
}

/// Result of a successful chess move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub piece: PieceId,
    pub captured: Option<Piece>,
    pub promoted: bool,
}

/// Result of a tetromino placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Placed {
        cells: Vec<Position>,
        cleared_rows: Vec<i32>,
    },
    /// Adjacency held but no path to the king existed: the piece
    /// explodes harmlessly. The move is consumed; nothing is written.
    Exploded,
}

/// Result of a successful piece purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub piece: PieceId,
    pub pos: Position,
}

/// One game instance.
pub struct Game {
    id: GameId,
    settings: GameSettings,
    board: Board,
    players: HashMap<PlayerId, Player>,
    pieces: HashMap<PieceId, Piece>,
    islands: IslandMap,
    ledger: Ledger,
    events: Vec<GameEvent>,
    ended: bool,
    winner: Option<PlayerId>,
    created_at: Instant,
    next_piece_id: u64,
    next_color: u8,
    /// Cursor for the next home-zone slot; shifted with the board.
    next_zone_x: i32,
}

impl Game {
    pub fn new(id: GameId, settings: GameSettings, created_at: Instant) -> Self {
        let board = Board::new(settings.board_width, settings.board_height);
        Self {
            id,
            settings,
            board,
            players: HashMap::new(),
            pieces: HashMap::new(),
            islands: IslandMap::new(),
            ledger: Ledger::new(),
            events: Vec::new(),
            ended: false,
            winner: None,
            created_at,
            next_piece_id: 0,
            next_color: 0,
            next_zone_x: ZONE_MARGIN,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn islands(&self) -> &IslandMap {
        &self.islands
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Takes all events queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------

    /// Adds a player, allocating and seeding a home zone.
    pub fn add_player(&mut self, player_id: PlayerId, username: &str) -> Result<&Player, GameError> {
        self.ensure_active()?;
        if self.players.contains_key(&player_id) {
            return Err(GameError::Forbidden("player already joined".into()));
        }
        if self.players.len() >= self.settings.max_players {
            return Err(GameError::Forbidden("game is full".into()));
        }

        let zone = self.allocate_zone();
        let zone_center_y = zone.y + zone.height / 2;
        let forward = if self.board.height() / 2 <= zone_center_y {
            (0, -1)
        } else {
            (0, 1)
        };

        let color = self.next_color;
        self.next_color += 1;
        let player = Player::new(
            player_id,
            username.to_string(),
            color,
            zone,
            forward,
            self.settings.default_difficulty,
        );
        self.players.insert(player_id, player);

        for pos in zone.cells() {
            self.board.set(pos, Cell::new(player_id, CellOrigin::HomeZone))?;
        }
        self.seed_home_pieces(player_id)?;
        let seeds: Vec<Position> = zone.cells().collect();
        self.islands.absorb(&mut self.board, &self.pieces, &seeds);

        tracing::info!(game = %self.id, player = %player_id, username, "player joined");
        Ok(self
            .players
            .get(&player_id)
            .expect("player was just inserted"))
    }

    pub fn set_player_difficulty(
        &mut self,
        player_id: PlayerId,
        difficulty: Difficulty,
    ) -> Result<(), GameError> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        player.turns.set_difficulty(difficulty);
        Ok(())
    }

    /// Picks the next free home-zone slot, growing the board when the
    /// strip is full.
    fn allocate_zone(&mut self) -> HomeZone {
        let w = self.settings.home_zone_width;
        let h = self.settings.home_zone_height;

        let needed = self.next_zone_x + w + ZONE_MARGIN;
        if needed > self.board.width() {
            // Expansion is symmetric and shifts the cursor too, so grow
            // by twice the deficit, rounded up to the growth step.
            let deficit = needed - self.board.width();
            let step = self.settings.growth_step;
            let add = (2 * deficit + step - 1) / step * step;
            let (dx, dy) = self.board.expand(add, 0);
            self.apply_offset(dx, dy);
        }

        let zone = HomeZone {
            x: self.next_zone_x,
            y: self.board.height() - h - ZONE_MARGIN,
            width: w,
            height: h,
        };
        self.next_zone_x += w + ZONE_GAP;
        zone
    }

    /// Seeds the standard 16-piece set into a player's home zone: a
    /// pawn row on the side facing the board center, the back rank
    /// behind it.
    fn seed_home_pieces(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        let (home, forward) = {
            let p = self
                .players
                .get(&player_id)
                .ok_or(GameError::PlayerNotFound(player_id))?;
            (p.home, p.forward)
        };
        let (pawn_y, back_y) = if forward.1 <= 0 {
            (home.y, home.y + home.height - 1)
        } else {
            (home.y + home.height - 1, home.y)
        };
        let back_rank = PieceKind::back_rank();
        for dx in 0..home.width {
            self.spawn_piece(player_id, PieceKind::Pawn, Position::new(home.x + dx, pawn_y))?;
            let kind = back_rank[dx as usize % back_rank.len()];
            self.spawn_piece(player_id, kind, Position::new(home.x + dx, back_y))?;
        }
        Ok(())
    }

    fn spawn_piece(
        &mut self,
        owner: PlayerId,
        kind: PieceKind,
        pos: Position,
    ) -> Result<PieceId, GameError> {
        self.next_piece_id += 1;
        let id = PieceId(self.next_piece_id);
        self.pieces.insert(id, Piece::new(id, kind, owner, pos));
        let cell = self
            .board
            .get_mut(pos)
            .ok_or(GameError::OutOfBounds(pos.x, pos.y))?;
        cell.piece = Some(id);
        if let Some(player) = self.players.get_mut(&owner) {
            player.pieces.push(id);
        }
        Ok(id)
    }

    // -----------------------------------------------------------------
    // Chess moves
    // -----------------------------------------------------------------

    /// Validates and executes a chess move.
    pub fn move_piece(
        &mut self,
        player_id: PlayerId,
        req: MoveRequest,
        now: Instant,
    ) -> Result<MoveOutcome, GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.is_paused() {
            return Err(GameError::Forbidden("player is paused".into()));
        }
        let forward = player.forward;
        player.turns.check(TurnPhase::AwaitingChess, now)?;
        if self.king_pos(player_id).is_none() {
            return Err(GameError::Forbidden("player has no surviving king".into()));
        }

        let piece_id = match req.piece {
            PieceSelector::ById(id) => {
                if !self.pieces.contains_key(&id) {
                    return Err(GameError::PieceNotFound(id));
                }
                id
            }
            PieceSelector::FromSquare(pos) => self
                .board
                .get(pos)
                .and_then(|c| c.piece)
                .ok_or_else(|| GameError::InvalidMove(format!("no piece at {pos}")))?,
        };
        let piece = self
            .pieces
            .get(&piece_id)
            .ok_or(GameError::PieceNotFound(piece_id))?;
        if piece.owner != player_id {
            return Err(GameError::InvalidMove("you do not own that piece".into()));
        }
        let from = piece.pos;
        let to = req.to;

        let captured_id = chess::validate_move(&self.board, &self.pieces, piece, to)?;
        if let Some(cid) = captured_id {
            let target_owner = self
                .pieces
                .get(&cid)
                .ok_or(GameError::PieceNotFound(cid))?
                .owner;
            if self
                .players
                .get(&target_owner)
                .is_some_and(|p| p.is_paused())
            {
                return Err(GameError::Forbidden(
                    "cannot capture pieces of a paused player".into(),
                ));
            }
        }

        // ---- commit ----
        let mut captured_piece = None;
        let mut victim_for_settlement = None;
        if let Some(cid) = captured_id {
            let target = self
                .pieces
                .remove(&cid)
                .ok_or(GameError::PieceNotFound(cid))?;
            if let Some(owner) = self.players.get_mut(&target.owner) {
                owner.pieces.retain(|p| *p != cid);
            }
            if let Some(cell) = self.board.get_mut(to) {
                cell.piece = None;
            }
            if let Some(p) = self.players.get_mut(&player_id) {
                p.score += target.kind.capture_value();
            }
            if target.is_king() {
                victim_for_settlement = Some(target.owner);
            }
            captured_piece = Some(target);
        }

        if let Some(cell) = self.board.get_mut(from) {
            cell.piece = None;
        }
        self.claim_destination(player_id, piece_id, to)?;

        let mut promoted_now = false;
        if let Some(piece) = self.pieces.get_mut(&piece_id) {
            piece.pos = to;
            piece.move_count += 1;
            if piece.kind == PieceKind::Pawn {
                let step = ((to.x - from.x).signum(), (to.y - from.y).signum());
                if step == forward {
                    piece.forward_progress += 1;
                }
                if !piece.promoted && piece.forward_progress >= PAWN_PROMOTION_DISTANCE {
                    piece.kind = PieceKind::Knight;
                    piece.promoted = true;
                    promoted_now = true;
                    self.events.push(GameEvent::PawnPromoted {
                        player: player_id,
                        piece: piece_id,
                    });
                    tracing::debug!(player = %player_id, piece = %piece_id, "pawn promoted to knight");
                }
            }
        }

        if let Some(victim) = victim_for_settlement {
            self.settle_king_capture(player_id, victim, now);
        }
        if let Some(p) = self.players.get_mut(&player_id) {
            p.turns.record(TurnPhase::AwaitingTetromino, now);
        }

        Ok(MoveOutcome {
            piece: piece_id,
            captured: captured_piece,
            promoted: promoted_now,
        })
    }

    /// Moving onto a cell claims it for the piece's owner; arriving on
    /// unowned ground creates a generic cell. Either way the cell
    /// invariant holds: a cell hosting a piece is owned by its owner.
    fn claim_destination(
        &mut self,
        player_id: PlayerId,
        piece_id: PieceId,
        to: Position,
    ) -> Result<(), GameError> {
        match self.board.get(to).cloned() {
            Some(cell) if cell.owner != player_id => {
                let old_island = cell.island;
                if let Some(c) = self.board.get_mut(to) {
                    c.owner = player_id;
                    c.piece = Some(piece_id);
                }
                if let Some(id) = old_island {
                    self.islands.rebuild(&mut self.board, &self.pieces, &[id]);
                }
                self.islands.absorb(&mut self.board, &self.pieces, &[to]);
            }
            Some(_) => {
                if let Some(c) = self.board.get_mut(to) {
                    c.piece = Some(piece_id);
                }
            }
            None => {
                let mut cell = Cell::new(player_id, CellOrigin::Generic);
                cell.piece = Some(piece_id);
                self.board.set(to, cell)?;
                self.islands.absorb(&mut self.board, &self.pieces, &[to]);
            }
        }
        Ok(())
    }

    /// Consumes the chess phase when no legal move exists.
    pub fn skip_chess_move(&mut self, player_id: PlayerId, now: Instant) -> Result<(), GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.is_paused() {
            return Err(GameError::Forbidden("player is paused".into()));
        }
        player.turns.check(TurnPhase::AwaitingChess, now)?;
        if self.has_available_move(player_id) {
            return Err(GameError::InvalidMove(
                "legal chess moves are available".into(),
            ));
        }
        if let Some(p) = self.players.get_mut(&player_id) {
            p.turns.record(TurnPhase::AwaitingTetromino, now);
        }
        Ok(())
    }

    /// King-capture settlement: all surviving material and half the
    /// victim's cumulative purchase fees go to the captor.
    fn settle_king_capture(&mut self, captor: PlayerId, victim: PlayerId, now: Instant) {
        let transferred: Vec<PieceId> = self
            .players
            .get(&victim)
            .map(|p| p.pieces.clone())
            .unwrap_or_default();
        for id in &transferred {
            if let Some(piece) = self.pieces.get_mut(id) {
                piece.owner = captor;
                if piece.kind == PieceKind::Pawn {
                    piece.move_count = 0;
                    piece.forward_progress = 0;
                }
                let pos = piece.pos;
                if let Some(cell) = self.board.get_mut(pos) {
                    cell.owner = captor;
                }
            }
        }
        if let Some(v) = self.players.get_mut(&victim) {
            v.pieces.clear();
        }
        if let Some(c) = self.players.get_mut(&captor) {
            c.pieces.extend(transferred.iter().copied());
        }

        // The transfer base is what the victim actually paid in
        // purchases, per the ledger. Fees received from earlier
        // captures never feed later transfers.
        let amount = self.ledger.purchases_by(victim) / 2;
        let at = self.elapsed_ms(now);
        self.ledger.record_fee_transfer(victim, captor, amount, at);

        self.events.push(GameEvent::KingCaptured { captor, victim });
        self.events.push(GameEvent::PiecesTransferred {
            from: victim,
            to: captor,
            count: transferred.len(),
        });
        self.events.push(GameEvent::FeesTransferred {
            from: victim,
            to: captor,
            amount,
        });
        tracing::info!(
            game = %self.id,
            %captor,
            %victim,
            pieces = transferred.len(),
            fees = amount,
            "king captured"
        );

        self.islands
            .recompute_owner(&mut self.board, &self.pieces, victim);
        self.islands
            .recompute_owner(&mut self.board, &self.pieces, captor);
        self.check_winner();
    }

    fn check_winner(&mut self) {
        if self.ended {
            return;
        }
        let alive: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| {
                p.pieces
                    .iter()
                    .any(|id| self.pieces.get(id).is_some_and(|pc| pc.is_king()))
            })
            .map(|p| p.id)
            .collect();
        if self.players.len() > 1 && alive.len() == 1 {
            self.ended = true;
            self.winner = Some(alive[0]);
            self.events.push(GameEvent::GameWinner { winner: alive[0] });
            tracing::info!(game = %self.id, winner = %alive[0], "game over");
        }
    }

    // -----------------------------------------------------------------
    // Tetromino placement
    // -----------------------------------------------------------------

    /// Validates and resolves a tetromino placement.
    pub fn place_tetromino(
        &mut self,
        player_id: PlayerId,
        kind: TetrominoKind,
        rotation: u8,
        x: i32,
        y: i32,
        now: Instant,
    ) -> Result<Placement, GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.is_paused() {
            return Err(GameError::Forbidden("player is paused".into()));
        }
        player.turns.check(TurnPhase::AwaitingTetromino, now)?;
        let king_pos = self
            .king_pos(player_id)
            .ok_or_else(|| GameError::Forbidden("player has no surviving king".into()))?;

        let cells = kind.cells(rotation, Position::new(x, y));
        for &pos in &cells {
            self.board.require_in_bounds(pos)?;
            if self.board.get(pos).is_some() {
                return Err(GameError::StateConflict(pos));
            }
        }

        let candidate: HashSet<Position> = cells.iter().copied().collect();
        let adjacent = cells.iter().any(|pos| {
            pos.neighbors()
                .iter()
                .any(|n| !candidate.contains(n) && self.board.owner_at(*n) == Some(player_id))
        });
        if !adjacent {
            return Err(GameError::NoConnectivity(
                "no 4-adjacent cell you own".into(),
            ));
        }

        let reachable = cells
            .iter()
            .any(|&pos| connectivity::has_path_to_king(&self.board, player_id, king_pos, pos, &candidate));
        if !reachable {
            // Adjacency without a route to the king: the piece explodes
            // harmlessly. A successful no-op, not an error.
            tracing::debug!(game = %self.id, player = %player_id, ?kind, "tetromino exploded");
            let next = self.evaluate_next_phase(player_id);
            if let Some(p) = self.players.get_mut(&player_id) {
                p.turns.record(next, now);
            }
            return Ok(Placement::Exploded);
        }

        // ---- commit ----
        for &pos in &cells {
            self.board.set(pos, Cell::new(player_id, CellOrigin::Tetromino))?;
        }
        self.islands.absorb(&mut self.board, &self.pieces, &cells);
        let cleared_rows = self.clear_rows();

        let next = self.evaluate_next_phase(player_id);
        if let Some(p) = self.players.get_mut(&player_id) {
            p.turns.record(next, now);
        }
        Ok(Placement::Placed {
            cells,
            cleared_rows,
        })
    }

    /// After a placement, a player owes a chess move only if one is
    /// actually available; otherwise they keep placing blocks.
    fn evaluate_next_phase(&self, player_id: PlayerId) -> TurnPhase {
        if self.has_available_move(player_id) {
            TurnPhase::AwaitingChess
        } else {
            TurnPhase::AwaitingTetromino
        }
    }

    /// A move counts as available only if the player could actually
    /// play it. Destinations holding a paused player's piece are
    /// discounted: the pause shield would reject the capture.
    fn has_available_move(&self, player_id: PlayerId) -> bool {
        let Some(player) = self.players.get(&player_id) else {
            return false;
        };
        player.pieces.iter().any(|id| {
            self.pieces.get(id).is_some_and(|piece| {
                chess::legal_destinations(&self.board, &self.pieces, piece, false)
                    .into_iter()
                    .any(|to| !self.capture_shielded(to))
            })
        })
    }

    /// True when the cell holds a piece whose owner is paused.
    fn capture_shielded(&self, pos: Position) -> bool {
        self.board
            .get(pos)
            .and_then(|cell| cell.piece)
            .and_then(|id| self.pieces.get(&id))
            .and_then(|piece| self.players.get(&piece.owner))
            .is_some_and(|owner| owner.is_paused())
    }

    /// Runs the row-clearing engine and reconciles pieces and islands.
    fn clear_rows(&mut self) -> Vec<i32> {
        let zones: Vec<(HomeZone, bool)> = self
            .players
            .values()
            .filter(|p| !p.zone_released)
            .map(|p| (p.home, !p.pieces.is_empty() || p.is_paused()))
            .collect();
        let is_safe =
            move |pos: Position| zones.iter().any(|(zone, shielded)| *shielded && zone.contains(pos));

        let outcome = rows::sweep_rows(&mut self.board, self.settings.row_clear_threshold, &is_safe);

        let mut king_removed = false;
        for pid in &outcome.detached {
            if let Some(piece) = self.pieces.remove(pid) {
                if piece.is_king() {
                    king_removed = true;
                }
                if let Some(owner) = self.players.get_mut(&piece.owner) {
                    owner.pieces.retain(|p| p != pid);
                }
            }
        }
        for (pid, new_pos) in &outcome.moved {
            if let Some(piece) = self.pieces.get_mut(pid) {
                piece.pos = *new_pos;
            }
        }
        for owner in &outcome.touched_owners {
            self.islands
                .recompute_owner(&mut self.board, &self.pieces, *owner);
        }
        for y in &outcome.cleared {
            self.events.push(GameEvent::RowCleared { y: *y });
        }
        if king_removed {
            self.check_winner();
        }
        outcome.cleared
    }

    // -----------------------------------------------------------------
    // Purchases
    // -----------------------------------------------------------------

    /// Buys a piece and seats it in the player's home zone.
    pub fn purchase_piece(
        &mut self,
        player_id: PlayerId,
        kind: PieceKind,
        amount_paid: u64,
        now: Instant,
    ) -> Result<PurchaseOutcome, GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.is_paused() {
            return Err(GameError::Forbidden("player is paused".into()));
        }

        let Some(price) = kind.price() else {
            self.purchase_failed(player_id, kind, "kings are never for sale");
            return Err(GameError::InvalidPieceType);
        };
        if self.king_pos(player_id).is_none() {
            self.purchase_failed(player_id, kind, "player has no surviving king");
            return Err(GameError::Forbidden("player has no surviving king".into()));
        }
        if amount_paid < price {
            self.purchase_failed(player_id, kind, &format!("price is {price}"));
            return Err(GameError::InsufficientPayment {
                required: price,
                paid: amount_paid,
            });
        }

        if self.free_reachable_home_cell(player_id).is_none() {
            self.extend_home_zone(player_id)?;
        }
        let Some(seat) = self.free_reachable_home_cell(player_id) else {
            self.purchase_failed(player_id, kind, "home zone has no reachable free cell");
            return Err(GameError::NoConnectivity(
                "home zone has no reachable free cell".into(),
            ));
        };

        self.next_piece_id += 1;
        let id = PieceId(self.next_piece_id);
        self.pieces
            .insert(id, Piece::new(id, kind, player_id, seat));
        if let Some(cell) = self.board.get_mut(seat) {
            cell.piece = Some(id);
        }
        let at = self.elapsed_ms(now);
        self.ledger.record_purchase(player_id, amount_paid, at);
        if let Some(p) = self.players.get_mut(&player_id) {
            p.pieces.push(id);
            p.purchase_total += amount_paid;
        }
        self.events.push(GameEvent::PiecePurchased {
            player: player_id,
            piece: id,
            kind,
            pos: seat,
        });
        tracing::debug!(game = %self.id, player = %player_id, ?kind, paid = amount_paid, "piece purchased");
        Ok(PurchaseOutcome { piece: id, pos: seat })
    }

    fn purchase_failed(&mut self, player: PlayerId, kind: PieceKind, reason: &str) {
        self.events.push(GameEvent::PiecePurchaseFailed {
            player,
            kind,
            reason: reason.to_string(),
        });
    }

    /// A free home-zone cell with a path to the king, if any.
    fn free_reachable_home_cell(&self, player_id: PlayerId) -> Option<Position> {
        let player = self.players.get(&player_id)?;
        let king_pos = self.king_pos(player_id)?;
        let overlay = HashSet::new();
        player.home.cells().find(|&pos| {
            self.board
                .get(pos)
                .is_some_and(|c| c.owner == player_id && c.piece.is_none())
                && connectivity::has_path_to_king(&self.board, player_id, king_pos, pos, &overlay)
        })
    }

    /// Grows a full home zone by one row behind the back rank,
    /// expanding the board first if the new row would fall off it.
    fn extend_home_zone(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        {
            let player = self
                .players
                .get_mut(&player_id)
                .ok_or(GameError::PlayerNotFound(player_id))?;
            let forward = player.forward;
            player.home.extend_back(forward);
        }
        let home = self
            .players
            .get(&player_id)
            .map(|p| p.home)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if home.y < 0
            || home.x < 0
            || home.y + home.height > self.board.height()
            || home.x + home.width > self.board.width()
        {
            let step = self.settings.growth_step;
            let (dx, dy) = self.board.expand(step, step);
            self.apply_offset(dx, dy);
        }
        let home = self
            .players
            .get(&player_id)
            .map(|p| p.home)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        let new_cells: Vec<Position> = home
            .cells()
            .filter(|p| self.board.get(*p).is_none())
            .collect();
        for &pos in &new_cells {
            self.board.set(pos, Cell::new(player_id, CellOrigin::HomeZone))?;
        }
        self.islands
            .absorb(&mut self.board, &self.pieces, &new_cells);
        tracing::debug!(game = %self.id, player = %player_id, "home zone extended");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Pause / resume / background sweep
    // -----------------------------------------------------------------

    /// Marks a player paused. While paused their pieces cannot be
    /// captured and their home zone cannot be cleared.
    pub fn pause_player(&mut self, player_id: PlayerId, now: Instant) -> Result<(), GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.paused_at.is_none() {
            player.paused_at = Some(now);
            self.events.push(GameEvent::PlayerPaused { player: player_id });
            tracing::debug!(game = %self.id, player = %player_id, "player paused");
        }
        Ok(())
    }

    pub fn resume_player(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if player.paused_at.take().is_some() {
            self.events.push(GameEvent::PlayerResumed { player: player_id });
            tracing::debug!(game = %self.id, player = %player_id, "player resumed");
        }
        Ok(())
    }

    /// Background sweep: pause timeouts and home-zone degradation.
    /// Driven by the registry on a periodic trigger, under the same
    /// per-game serialization as every other operation.
    pub fn sweep(&mut self, now: Instant) {
        if self.ended {
            return;
        }

        let expired: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| {
                p.paused_at
                    .is_some_and(|at| now.saturating_duration_since(at) > self.settings.max_pause)
            })
            .map(|p| p.id)
            .collect();
        for id in expired {
            if let Some(p) = self.players.get_mut(&id) {
                p.paused_at = None;
            }
            self.events.push(GameEvent::PlayerPausedTimeout { player: id });
            tracing::info!(game = %self.id, player = %id, "pause timeout, forfeiting primary island");
            self.apply_pause_penalty(id);
        }

        let degraded: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.zone_released && p.pieces.is_empty())
            .map(|p| p.id)
            .collect();
        for id in degraded {
            let Some(home) = self.players.get(&id).map(|p| p.home) else {
                continue;
            };
            for pos in home.cells() {
                if self.board.owner_at(pos) == Some(id) {
                    self.board.remove(pos);
                }
            }
            if let Some(p) = self.players.get_mut(&id) {
                p.zone_released = true;
            }
            self.islands.recompute_owner(&mut self.board, &self.pieces, id);
            self.events.push(GameEvent::HomeZoneDegraded { player: id });
            tracing::info!(game = %self.id, player = %id, "home zone degraded");
        }
    }

    /// Pause-timeout penalty: the island carrying the king loses every
    /// cell outside the home zone, and stranded pieces return home (or
    /// are lost when the zone is full).
    fn apply_pause_penalty(&mut self, player_id: PlayerId) {
        let Some(home) = self.players.get(&player_id).map(|p| p.home) else {
            return;
        };

        let king_island_cells: Vec<Position> = self
            .islands
            .iter()
            .find(|i| i.owner == player_id && i.has_king)
            .map(|i| i.cells.iter().copied().collect())
            .unwrap_or_default();
        for pos in king_island_cells {
            if !home.contains(pos) {
                self.board.remove(pos);
            }
        }

        let stranded: Vec<PieceId> = self
            .players
            .get(&player_id)
            .map(|p| {
                p.pieces
                    .iter()
                    .copied()
                    .filter(|pid| {
                        self.pieces
                            .get(pid)
                            .is_some_and(|piece| !home.contains(piece.pos))
                    })
                    .collect()
            })
            .unwrap_or_default();
        for pid in stranded {
            let Some(pos) = self.pieces.get(&pid).map(|p| p.pos) else {
                continue;
            };
            if let Some(cell) = self.board.get_mut(pos) {
                if cell.piece == Some(pid) {
                    cell.piece = None;
                }
            }
            let seat = home.cells().find(|&s| {
                self.board
                    .get(s)
                    .is_some_and(|c| c.owner == player_id && c.piece.is_none())
            });
            match seat {
                Some(s) => {
                    if let Some(piece) = self.pieces.get_mut(&pid) {
                        piece.pos = s;
                    }
                    if let Some(cell) = self.board.get_mut(s) {
                        cell.piece = Some(pid);
                    }
                }
                None => {
                    // Home zone full: the piece is lost.
                    self.pieces.remove(&pid);
                    if let Some(p) = self.players.get_mut(&player_id) {
                        p.pieces.retain(|x| *x != pid);
                    }
                }
            }
        }

        self.islands
            .recompute_owner(&mut self.board, &self.pieces, player_id);
        self.check_winner();
    }

    // -----------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------

    /// Point-in-time view for the transport layer. Deterministically
    /// ordered so identical states snapshot identically.
    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        let mut cells: Vec<CellSnapshot> = self
            .board
            .positions()
            .filter_map(|pos| {
                self.board.get(pos).map(|c| CellSnapshot {
                    pos,
                    owner: c.owner,
                    origin: c.origin,
                    piece: c.piece,
                    island: c.island,
                })
            })
            .collect();
        cells.sort_by_key(|c| (c.pos.y, c.pos.x));

        let mut players: Vec<PlayerSnapshot> = self
            .players
            .values()
            .map(|p| {
                let cooldown_remaining_ms = match p.turns.last_move_at {
                    Some(last) => (last + p.turns.min_interval)
                        .saturating_duration_since(now)
                        .as_millis() as u64,
                    None => 0,
                };
                PlayerSnapshot {
                    id: p.id,
                    username: p.username.clone(),
                    color: p.color,
                    home: p.home,
                    score: p.score,
                    purchase_total: p.purchase_total,
                    paused: p.is_paused(),
                    phase: p.turns.phase,
                    cooldown_remaining_ms,
                }
            })
            .collect();
        players.sort_by_key(|p| p.id.0);

        let mut pieces: Vec<Piece> = self.pieces.values().cloned().collect();
        pieces.sort_by_key(|p| p.id.0);

        let mut islands: Vec<IslandSnapshot> = self
            .islands
            .iter()
            .map(|i| IslandSnapshot {
                id: i.id,
                owner: i.owner,
                size: i.cells.len(),
                has_king: i.has_king,
            })
            .collect();
        islands.sort_by_key(|i| i.id.0);

        GameSnapshot {
            game_id: self.id,
            width: self.board.width(),
            height: self.board.height(),
            cells,
            players,
            pieces,
            islands,
            ended: self.ended,
            winner: self.winner,
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn ensure_active(&self) -> Result<(), GameError> {
        if self.ended {
            Err(GameError::Forbidden("game has ended".into()))
        } else {
            Ok(())
        }
    }

    fn king_pos(&self, player_id: PlayerId) -> Option<Position> {
        let player = self.players.get(&player_id)?;
        player.pieces.iter().find_map(|id| {
            self.pieces
                .get(id)
                .filter(|p| p.is_king())
                .map(|p| p.pos)
        })
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.created_at).as_millis() as u64
    }

    /// Applies a board-expansion offset to everything that carries
    /// coordinates, keeping expansion atomic across the data model.
    fn apply_offset(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for piece in self.pieces.values_mut() {
            piece.pos = piece.pos.offset(dx, dy);
        }
        for player in self.players.values_mut() {
            player.home.shift(dx, dy);
        }
        self.islands.shift_all(dx, dy);
        self.next_zone_x += dx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn game() -> Game {
        Game::new(GameId(1), GameSettings::default(), Instant::now())
    }

    fn piece_at(g: &Game, x: i32, y: i32) -> PieceId {
        g.board()
            .get(Position::new(x, y))
            .and_then(|c| c.piece)
            .unwrap()
    }

    fn teleport(g: &mut Game, id: PieceId, to: Position) {
        let (from, owner) = {
            let p = g.pieces.get(&id).unwrap();
            (p.pos, p.owner)
        };
        g.board.get_mut(from).unwrap().piece = None;
        let mut cell = Cell::new(owner, CellOrigin::Generic);
        cell.piece = Some(id);
        g.board.set(to, cell).unwrap();
        g.pieces.get_mut(&id).unwrap().pos = to;
    }

    fn remove_piece(g: &mut Game, id: PieceId) {
        if let Some(piece) = g.pieces.remove(&id) {
            if let Some(cell) = g.board.get_mut(piece.pos) {
                cell.piece = None;
            }
            if let Some(owner) = g.players.get_mut(&piece.owner) {
                owner.pieces.retain(|x| *x != id);
            }
        }
    }

    fn force_chess_phase(g: &mut Game, id: PlayerId) {
        let turns = &mut g.players.get_mut(&id).unwrap().turns;
        turns.phase = TurnPhase::AwaitingChess;
        turns.last_move_at = None;
    }

    #[test]
    fn test_add_player_seeds_full_chess_set() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let p = g.player(PlayerId(1)).unwrap();
        assert_eq!(p.pieces.len(), 16);
        assert_eq!(p.home, HomeZone { x: 2, y: 28, width: 8, height: 2 });
        assert_eq!(p.forward, (0, -1));

        // Pawns fill the row facing the board center.
        for x in 2..10 {
            let id = piece_at(&g, x, 28);
            assert_eq!(g.piece(id).unwrap().kind, PieceKind::Pawn);
        }
        let back: Vec<PieceKind> = (2..10)
            .map(|x| g.piece(piece_at(&g, x, 29)).unwrap().kind)
            .collect();
        assert_eq!(back, PieceKind::back_rank().to_vec());

        // The zone seeds as one island holding the king.
        assert_eq!(g.islands().len(), 1);
        assert!(g.islands().iter().all(|i| i.has_king));
    }

    #[test]
    fn test_seeding_layout_for_a_relocated_zone() {
        let mut g = game();
        let zone = HomeZone { x: 10, y: 20, width: 8, height: 2 };
        let player = Player::new(
            PlayerId(7),
            "kim".into(),
            0,
            zone,
            (0, -1),
            Difficulty::Medium,
        );
        g.players.insert(PlayerId(7), player);
        for pos in zone.cells() {
            g.board
                .set(pos, Cell::new(PlayerId(7), CellOrigin::HomeZone))
                .unwrap();
        }
        g.seed_home_pieces(PlayerId(7)).unwrap();

        for x in 10..18 {
            assert_eq!(g.piece(piece_at(&g, x, 20)).unwrap().kind, PieceKind::Pawn);
        }
        let majors: Vec<PieceKind> = (10..18)
            .map(|x| g.piece(piece_at(&g, x, 21)).unwrap().kind)
            .collect();
        assert_eq!(majors, PieceKind::back_rank().to_vec());
        let ids: HashSet<PieceId> = g
            .player(PlayerId(7))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let err = g.add_player(PlayerId(1), "ada").unwrap_err();
        assert!(matches!(err, GameError::Forbidden(_)));
    }

    #[test]
    fn test_third_join_expands_board_and_shifts_everything() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        assert_eq!(g.board().width(), 32);

        g.add_player(PlayerId(3), "eve").unwrap();
        assert_eq!(g.board().width(), 48);

        // Existing zones, pieces and islands all moved by the offset.
        let p1 = g.player(PlayerId(1)).unwrap();
        assert_eq!(p1.home.x, 10);
        let pawn = piece_at(&g, 10, 28);
        assert_eq!(g.piece(pawn).unwrap().kind, PieceKind::Pawn);
        assert_eq!(g.islands().len(), 3);
        for island in g.islands().iter() {
            for pos in &island.cells {
                assert_eq!(g.board().get(*pos).map(|c| c.owner), Some(island.owner));
            }
        }
    }

    #[test]
    fn test_turn_cycle_and_cooldown() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let now = Instant::now();

        // A chess move before any placement is the wrong phase.
        let req = MoveRequest {
            piece: PieceSelector::FromSquare(Position::new(2, 28)),
            to: Position::new(2, 27),
        };
        assert!(matches!(
            g.move_piece(PlayerId(1), req, now),
            Err(GameError::InvalidMove(_))
        ));

        let placed = g
            .place_tetromino(PlayerId(1), TetrominoKind::O, 0, 2, 26, now)
            .unwrap();
        assert!(matches!(placed, Placement::Placed { .. }));
        assert_eq!(
            g.player(PlayerId(1)).unwrap().turns.phase,
            TurnPhase::AwaitingChess
        );

        // The follow-up chess move is rate limited until the cooldown
        // elapses.
        let soon = now + Duration::from_millis(1);
        assert!(matches!(
            g.move_piece(PlayerId(1), req, soon),
            Err(GameError::RateLimited { .. })
        ));
        let later = now + Difficulty::Medium.move_interval();
        let outcome = g.move_piece(PlayerId(1), req, later).unwrap();
        assert!(outcome.captured.is_none());
        assert_eq!(g.piece(outcome.piece).unwrap().pos, Position::new(2, 27));
        assert_eq!(
            g.player(PlayerId(1)).unwrap().turns.phase,
            TurnPhase::AwaitingTetromino
        );
    }

    #[test]
    fn test_isolated_placement_rejected() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let err = g
            .place_tetromino(PlayerId(1), TetrominoKind::O, 0, 20, 10, Instant::now())
            .unwrap_err();
        assert!(matches!(err, GameError::NoConnectivity(_)));
    }

    #[test]
    fn test_placement_on_occupied_cell_conflicts() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let err = g
            .place_tetromino(PlayerId(1), TetrominoKind::O, 0, 2, 27, Instant::now())
            .unwrap_err();
        assert_eq!(err, GameError::StateConflict(Position::new(2, 28)));
    }

    #[test]
    fn test_unreachable_placement_explodes_and_consumes_move() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let now = Instant::now();

        // An owned cell with no route back to the king.
        g.board
            .set(Position::new(20, 10), Cell::new(PlayerId(1), CellOrigin::Generic))
            .unwrap();

        let placed = g
            .place_tetromino(PlayerId(1), TetrominoKind::O, 0, 20, 8, now)
            .unwrap();
        assert_eq!(placed, Placement::Exploded);
        // Nothing was written...
        assert!(g.board().get(Position::new(20, 8)).is_none());
        assert!(g.board().get(Position::new(21, 9)).is_none());
        // ...but the move was spent.
        assert!(matches!(
            g.place_tetromino(PlayerId(1), TetrominoKind::O, 0, 2, 26, now),
            Err(GameError::InvalidMove(_)) | Err(GameError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_king_capture_settles_material_and_fees() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        let now = Instant::now();

        // Buy the queen first so it seats in the extended back row,
        // then open a file to the enemy king and park a rook on it.
        g.purchase_piece(PlayerId(2), PieceKind::Queen, 9, now).unwrap();
        let blocking_pawn = piece_at(&g, 18, 28);
        remove_piece(&mut g, blocking_pawn);
        let rook = g
            .player(PlayerId(1))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .find(|id| g.piece(*id).unwrap().kind == PieceKind::Rook)
            .unwrap();
        teleport(&mut g, rook, Position::new(18, 25));
        force_chess_phase(&mut g, PlayerId(1));

        let outcome = g
            .move_piece(
                PlayerId(1),
                MoveRequest {
                    piece: PieceSelector::ById(rook),
                    to: Position::new(18, 29),
                },
                now,
            )
            .unwrap();
        assert_eq!(outcome.captured.map(|p| p.kind), Some(PieceKind::King));

        // Material transfer: 16 original + 15 surviving enemy pieces
        // (the purchased queen included).
        let p1 = g.player(PlayerId(1)).unwrap();
        let p2 = g.player(PlayerId(2)).unwrap();
        assert_eq!(p1.pieces.len(), 31);
        assert!(p2.pieces.is_empty());
        assert_eq!(p1.score, 10);

        // Half the victim's purchase fees move over via the ledger,
        // rounded down; purchase totals only ever record what a player
        // paid themselves.
        assert_eq!(p1.purchase_total, 0);
        assert_eq!(p2.purchase_total, 9);
        assert_eq!(g.ledger().transfers_to(PlayerId(1)), 4);

        // Transferred pieces and their cells now belong to the captor.
        for id in &g.player(PlayerId(1)).unwrap().pieces.clone() {
            let piece = g.piece(*id).unwrap();
            assert_eq!(piece.owner, PlayerId(1));
            assert_eq!(g.board().get(piece.pos).map(|c| c.owner), Some(PlayerId(1)));
        }

        // Last king standing wins; the game refuses further moves.
        assert!(g.is_ended());
        assert_eq!(g.winner(), Some(PlayerId(1)));
        let events = g.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::PiecesTransferred { count: 15, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::FeesTransferred { amount: 4, .. }
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::GameWinner { winner } if *winner == PlayerId(1))));
        assert!(matches!(
            g.place_tetromino(PlayerId(1), TetrominoKind::I, 0, 2, 26, now),
            Err(GameError::Forbidden(_))
        ));
    }

    #[test]
    fn test_fee_transfer_base_ignores_fees_received_earlier() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        g.add_player(PlayerId(3), "eve").unwrap();
        let now = Instant::now();

        // Only the third player ever buys anything.
        g.purchase_piece(PlayerId(3), PieceKind::Queen, 9, now).unwrap();

        // Second player takes the third king: half those fees move over.
        let blocking_pawn = piece_at(&g, 38, 28);
        remove_piece(&mut g, blocking_pawn);
        let rook2 = g
            .player(PlayerId(2))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .find(|id| g.piece(*id).unwrap().kind == PieceKind::Rook)
            .unwrap();
        teleport(&mut g, rook2, Position::new(38, 25));
        force_chess_phase(&mut g, PlayerId(2));
        g.move_piece(
            PlayerId(2),
            MoveRequest {
                piece: PieceSelector::ById(rook2),
                to: Position::new(38, 29),
            },
            now,
        )
        .unwrap();
        assert_eq!(g.ledger().transfers_to(PlayerId(2)), 4);
        assert!(!g.is_ended());

        // First player then takes the second king. The second player
        // never purchased anything, so nothing transfers even though
        // they just received fees themselves.
        let blocking_pawn = piece_at(&g, 26, 28);
        remove_piece(&mut g, blocking_pawn);
        let rook1 = g
            .player(PlayerId(1))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .find(|id| g.piece(*id).unwrap().kind == PieceKind::Rook)
            .unwrap();
        teleport(&mut g, rook1, Position::new(26, 25));
        force_chess_phase(&mut g, PlayerId(1));
        g.move_piece(
            PlayerId(1),
            MoveRequest {
                piece: PieceSelector::ById(rook1),
                to: Position::new(26, 29),
            },
            now,
        )
        .unwrap();

        assert_eq!(g.ledger().transfers_to(PlayerId(1)), 0);
        assert!(g.is_ended());
        assert_eq!(g.winner(), Some(PlayerId(1)));
    }

    #[test]
    fn test_skip_allowed_when_only_moves_capture_paused_pieces() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        let now = Instant::now();

        // Strip the first player down to a lone king and ring it with
        // the opponent's pawns so every move is a capture.
        let king = g
            .player(PlayerId(1))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .find(|id| g.piece(*id).unwrap().is_king())
            .unwrap();
        for id in g.player(PlayerId(1)).unwrap().pieces.clone() {
            if id != king {
                remove_piece(&mut g, id);
            }
        }
        let king_pos = g.piece(king).unwrap().pos;
        let ring: Vec<Position> = (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(|(dx, dy)| king_pos.offset(dx, dy))
            .collect();
        let pawns: Vec<PieceId> = g
            .player(PlayerId(2))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .filter(|id| g.piece(*id).unwrap().kind == PieceKind::Pawn)
            .take(8)
            .collect();
        for (pawn, pos) in pawns.into_iter().zip(ring.iter().copied()) {
            teleport(&mut g, pawn, pos);
        }
        force_chess_phase(&mut g, PlayerId(1));

        // While the opponent is active those captures count, so the
        // skip is refused.
        assert!(matches!(
            g.skip_chess_move(PlayerId(1), now),
            Err(GameError::InvalidMove(_))
        ));

        g.pause_player(PlayerId(2), now).unwrap();

        // Every remaining move would capture a shielded piece.
        let err = g
            .move_piece(
                PlayerId(1),
                MoveRequest {
                    piece: PieceSelector::ById(king),
                    to: ring[0],
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::Forbidden(_)));

        // The chess phase can be passed instead of wedging the player.
        g.skip_chess_move(PlayerId(1), now).unwrap();
        assert_eq!(
            g.player(PlayerId(1)).unwrap().turns.phase,
            TurnPhase::AwaitingTetromino
        );
    }

    #[test]
    fn test_pawn_promotes_to_knight_once() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let pawn = piece_at(&g, 2, 28);
        g.players.get_mut(&PlayerId(1)).unwrap().turns.min_interval = Duration::ZERO;

        let mut now = Instant::now();
        for step in 0..8 {
            g.players.get_mut(&PlayerId(1)).unwrap().turns.phase = TurnPhase::AwaitingChess;
            g.move_piece(
                PlayerId(1),
                MoveRequest {
                    piece: PieceSelector::ById(pawn),
                    to: Position::new(2, 27 - step),
                },
                now,
            )
            .unwrap();
            now += Duration::from_millis(1);
        }

        let piece = g.piece(pawn).unwrap();
        assert_eq!(piece.kind, PieceKind::Knight);
        assert!(piece.promoted);
        assert_eq!(piece.forward_progress, 8);
        let events = g.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::PawnPromoted { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_purchase_prices_and_zone_growth() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let now = Instant::now();

        assert!(matches!(
            g.purchase_piece(PlayerId(1), PieceKind::King, 100, now),
            Err(GameError::InvalidPieceType)
        ));
        assert_eq!(
            g.purchase_piece(PlayerId(1), PieceKind::Queen, 8, now),
            Err(GameError::InsufficientPayment { required: 9, paid: 8 })
        );

        // The seeded zone is full, so a paid purchase grows it by a row
        // behind the back rank.
        let outcome = g.purchase_piece(PlayerId(1), PieceKind::Knight, 3, now).unwrap();
        let p = g.player(PlayerId(1)).unwrap();
        assert_eq!(g.piece(outcome.piece).unwrap().kind, PieceKind::Knight);
        assert_eq!(p.home.height, 3);
        assert!(p.home.contains(outcome.pos));
        assert_eq!(p.purchase_total, 3);
        assert_eq!(p.pieces.len(), 17);
        assert_eq!(g.ledger().purchases_by(PlayerId(1)), 3);

        let events = g.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::PiecePurchaseFailed { .. }))
                .count(),
            2
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PiecePurchased { .. })));
    }

    #[test]
    fn test_paused_player_is_shielded() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        let now = Instant::now();
        g.pause_player(PlayerId(2), now).unwrap();

        // Paused players cannot act.
        assert!(matches!(
            g.place_tetromino(PlayerId(2), TetrominoKind::I, 0, 14, 26, now),
            Err(GameError::Forbidden(_))
        ));

        // Their pieces cannot be captured.
        let rook = g
            .player(PlayerId(1))
            .unwrap()
            .pieces
            .iter()
            .copied()
            .find(|id| g.piece(*id).unwrap().kind == PieceKind::Rook)
            .unwrap();
        teleport(&mut g, rook, Position::new(18, 25));
        force_chess_phase(&mut g, PlayerId(1));
        let err = g
            .move_piece(
                PlayerId(1),
                MoveRequest {
                    piece: PieceSelector::ById(rook),
                    to: Position::new(18, 28),
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::Forbidden(_)));

        // After resuming, the same capture goes through.
        g.resume_player(PlayerId(2)).unwrap();
        let outcome = g
            .move_piece(
                PlayerId(1),
                MoveRequest {
                    piece: PieceSelector::ById(rook),
                    to: Position::new(18, 28),
                },
                now,
            )
            .unwrap();
        assert_eq!(outcome.captured.map(|p| p.kind), Some(PieceKind::Pawn));
    }

    #[test]
    fn test_pause_timeout_forfeits_island_overhang() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        let now = Instant::now();

        // Grow p2's king island one cell beyond the home zone.
        g.board
            .set(Position::new(14, 27), Cell::new(PlayerId(2), CellOrigin::Generic))
            .unwrap();
        g.islands
            .absorb(&mut g.board, &g.pieces, &[Position::new(14, 27)]);

        g.pause_player(PlayerId(2), now).unwrap();
        g.sweep(now + Duration::from_secs(301));

        let p2 = g.player(PlayerId(2)).unwrap();
        assert!(!p2.is_paused());
        // The overhang cell was forfeited; the zone itself survived.
        assert!(g.board().get(Position::new(14, 27)).is_none());
        assert!(g.board().get(Position::new(14, 28)).is_some());
        assert_eq!(p2.pieces.len(), 16);
        let events = g.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerPausedTimeout { player } if *player == PlayerId(2))));
    }

    #[test]
    fn test_sweep_degrades_emptied_home_zone_once() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        g.add_player(PlayerId(2), "bob").unwrap();
        let now = Instant::now();

        for id in g.player(PlayerId(2)).unwrap().pieces.clone() {
            remove_piece(&mut g, id);
        }
        g.sweep(now);

        assert!(g.player(PlayerId(2)).unwrap().zone_released);
        assert!(g.board().get(Position::new(14, 28)).is_none());
        assert!(g.board().get(Position::new(21, 29)).is_none());

        g.sweep(now + Duration::from_secs(1));
        let events = g.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::HomeZoneDegraded { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_clear_rows_reconciles_pieces_and_islands() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();

        // A detached strip of eight cells reaches the threshold. The
        // seeded home rows also hold eight filled cells each, but they
        // shield pieces and stay put.
        let strip: Vec<Position> = (0..8).map(|x| Position::new(x, 10)).collect();
        for &pos in &strip {
            g.board
                .set(pos, Cell::new(PlayerId(1), CellOrigin::Tetromino))
                .unwrap();
        }
        g.islands.absorb(&mut g.board, &g.pieces, &strip);
        assert_eq!(g.islands().len(), 2);

        let cleared = g.clear_rows();
        assert_eq!(cleared, vec![10]);
        for &pos in &strip {
            assert!(g.board().get(pos).is_none());
        }
        assert!(g.board().get(Position::new(2, 28)).is_some());
        assert_eq!(g.islands().len(), 1);
    }

    #[test]
    fn test_snapshot_is_ordered_and_serializable() {
        let mut g = game();
        g.add_player(PlayerId(1), "ada").unwrap();
        let now = Instant::now();

        let snap = g.snapshot(now);
        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.pieces.len(), 16);
        assert_eq!(snap.cells.len(), 16);
        assert_eq!(snap.players[0].phase, TurnPhase::AwaitingTetromino);
        assert_eq!(snap.players[0].cooldown_remaining_ms, 0);
        assert!(snap.cells.windows(2).all(|w| {
            (w[0].pos.y, w[0].pos.x) < (w[1].pos.y, w[1].pos.x)
        }));

        let json = serde_json::to_string(&snap).unwrap();
        let decoded: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, decoded);
    }
}
