//! Game actor: an isolated Tokio task that owns one game instance.
//!
//! Each game runs in its own task, communicating with the outside world
//! through an mpsc channel. This serializes all mutation of a game —
//! no locks, no shared mutable state, just message passing. Events the
//! engine queues during a command are drained afterwards and forwarded
//! to the registry-wide event channel for broadcast.

use std::time::{Duration, Instant};

use gridmate_core::{
    Difficulty, Game, GameError, GameEvent, GameId, GameSettings, GameSnapshot, HomeZone,
    MoveOutcome, MoveRequest, PieceKind, Placement, PlayerId, PurchaseOutcome, TetrominoKind,
};
use tokio::sync::{mpsc, oneshot};

use crate::RegistryError;

/// Channel carrying drained game events to whoever broadcasts them.
pub type EventSender = mpsc::UnboundedSender<(GameId, GameEvent)>;

/// Commands sent to a game actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/reply: the caller
/// sends the command and awaits the response on that channel.
pub(crate) enum GameCommand {
    Join {
        player: PlayerId,
        username: String,
        reply: oneshot::Sender<Result<JoinOutcome, GameError>>,
    },
    Move {
        player: PlayerId,
        request: MoveRequest,
        reply: oneshot::Sender<Result<MoveOutcome, GameError>>,
    },
    SkipMove {
        player: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Place {
        player: PlayerId,
        kind: TetrominoKind,
        rotation: u8,
        x: i32,
        y: i32,
        reply: oneshot::Sender<Result<Placement, GameError>>,
    },
    Purchase {
        player: PlayerId,
        kind: PieceKind,
        amount: u64,
        reply: oneshot::Sender<Result<PurchaseOutcome, GameError>>,
    },
    Pause {
        player: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Resume {
        player: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    SetDifficulty {
        player: PlayerId,
        difficulty: Difficulty,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Status {
        reply: oneshot::Sender<GameStatus>,
    },
    /// Periodic background pass (pause timeouts, zone degradation).
    /// Fire-and-forget; results surface as events.
    Sweep,
    Shutdown,
}

impl GameCommand {
    /// Player-originated commands count as activity; background
    /// housekeeping and read-only polls do not.
    fn is_player_command(&self) -> bool {
        !matches!(
            self,
            Self::Snapshot { .. } | Self::Status { .. } | Self::Sweep | Self::Shutdown
        )
    }
}

/// What a successful join hands back to the caller: the seat a new
/// player was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub player: PlayerId,
    pub color: u8,
    pub home: HomeZone,
}

/// A snapshot of game metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct GameStatus {
    pub game_id: GameId,
    pub player_count: usize,
    pub ended: bool,
    pub winner: Option<PlayerId>,
    /// Time since the last player-originated command.
    pub idle: Duration,
}

/// Handle to a running game actor. Cheap to clone — just an
/// `mpsc::Sender` wrapper. The `GameRegistry` holds one per game.
#[derive(Clone)]
pub struct GameHandle {
    game_id: GameId,
    sender: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub async fn join(&self, player: PlayerId, username: &str) -> Result<JoinOutcome, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Join {
            player,
            username: username.to_string(),
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn move_piece(
        &self,
        player: PlayerId,
        request: MoveRequest,
    ) -> Result<MoveOutcome, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Move {
            player,
            request,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn skip_move(&self, player: PlayerId) -> Result<(), RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::SkipMove {
            player,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn place_tetromino(
        &self,
        player: PlayerId,
        kind: TetrominoKind,
        rotation: u8,
        x: i32,
        y: i32,
    ) -> Result<Placement, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Place {
            player,
            kind,
            rotation,
            x,
            y,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn purchase_piece(
        &self,
        player: PlayerId,
        kind: PieceKind,
        amount: u64,
    ) -> Result<PurchaseOutcome, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Purchase {
            player,
            kind,
            amount,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn pause(&self, player: PlayerId) -> Result<(), RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Pause {
            player,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn resume(&self, player: PlayerId) -> Result<(), RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Resume {
            player,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn set_difficulty(
        &self,
        player: PlayerId,
        difficulty: Difficulty,
    ) -> Result<(), RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::SetDifficulty {
            player,
            difficulty,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?.map_err(RegistryError::Game)
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Snapshot { reply: reply_tx }).await?;
        self.recv(reply_rx).await
    }

    pub async fn status(&self) -> Result<GameStatus, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GameCommand::Status { reply: reply_tx }).await?;
        self.recv(reply_rx).await
    }

    /// Triggers a background sweep (fire-and-forget).
    pub async fn sweep(&self) -> Result<(), RegistryError> {
        self.send(GameCommand::Sweep).await
    }

    /// Tells the game actor to shut down.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        self.send(GameCommand::Shutdown).await
    }

    async fn send(&self, cmd: GameCommand) -> Result<(), RegistryError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RegistryError::Unavailable(self.game_id))
    }

    async fn recv<T>(&self, rx: oneshot::Receiver<T>) -> Result<T, RegistryError> {
        rx.await.map_err(|_| RegistryError::Unavailable(self.game_id))
    }
}

/// The internal game actor. Runs inside a Tokio task.
struct GameActor {
    game: Game,
    receiver: mpsc::Receiver<GameCommand>,
    events: EventSender,
    /// When the last player-originated command arrived; drives idle
    /// archiving in the registry.
    last_activity: Instant,
}

impl GameActor {
    async fn run(mut self) {
        let game_id = self.game.id();
        tracing::info!(game = %game_id, "game actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let now = Instant::now();
            if cmd.is_player_command() {
                self.last_activity = now;
            }
            match cmd {
                GameCommand::Join {
                    player,
                    username,
                    reply,
                } => {
                    let result = self.game.add_player(player, &username).map(|p| JoinOutcome {
                        player: p.id,
                        color: p.color,
                        home: p.home,
                    });
                    let _ = reply.send(result);
                }
                GameCommand::Move {
                    player,
                    request,
                    reply,
                } => {
                    let _ = reply.send(self.game.move_piece(player, request, now));
                }
                GameCommand::SkipMove { player, reply } => {
                    let _ = reply.send(self.game.skip_chess_move(player, now));
                }
                GameCommand::Place {
                    player,
                    kind,
                    rotation,
                    x,
                    y,
                    reply,
                } => {
                    let _ =
                        reply.send(self.game.place_tetromino(player, kind, rotation, x, y, now));
                }
                GameCommand::Purchase {
                    player,
                    kind,
                    amount,
                    reply,
                } => {
                    let _ = reply.send(self.game.purchase_piece(player, kind, amount, now));
                }
                GameCommand::Pause { player, reply } => {
                    let _ = reply.send(self.game.pause_player(player, now));
                }
                GameCommand::Resume { player, reply } => {
                    let _ = reply.send(self.game.resume_player(player));
                }
                GameCommand::SetDifficulty {
                    player,
                    difficulty,
                    reply,
                } => {
                    let _ = reply.send(self.game.set_player_difficulty(player, difficulty));
                }
                GameCommand::Snapshot { reply } => {
                    let _ = reply.send(self.game.snapshot(now));
                }
                GameCommand::Status { reply } => {
                    let _ = reply.send(GameStatus {
                        game_id,
                        player_count: self.game.player_count(),
                        ended: self.game.is_ended(),
                        winner: self.game.winner(),
                        idle: now.saturating_duration_since(self.last_activity),
                    });
                }
                GameCommand::Sweep => {
                    self.game.sweep(now);
                }
                GameCommand::Shutdown => {
                    tracing::info!(game = %game_id, "game shutting down");
                    break;
                }
            }
            self.forward_events(game_id);
        }

        tracing::info!(game = %game_id, "game actor stopped");
    }

    /// Drains events queued by the last command and pushes them to the
    /// broadcast channel. Dropped receivers are fine — nobody is
    /// listening yet, or the server is shutting down.
    fn forward_events(&mut self, game_id: GameId) {
        for event in self.game.drain_events() {
            let _ = self.events.send((game_id, event));
        }
    }
}

/// Spawns a new game actor task and returns a handle to it.
///
/// `channel_size` bounds the command channel; when it fills up,
/// senders wait, which backpressures a flooding client.
pub(crate) fn spawn_game(
    game_id: GameId,
    settings: GameSettings,
    events: EventSender,
    channel_size: usize,
) -> GameHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let now = Instant::now();
    let actor = GameActor {
        game: Game::new(game_id, settings, now),
        receiver: rx,
        events,
        last_activity: now,
    };
    tokio::spawn(actor.run());

    GameHandle {
        game_id,
        sender: tx,
    }
}
