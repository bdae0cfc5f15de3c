//! Gameplay events emitted by the simulation.
//!
//! Systems push [`GameEvent`]s onto the [`EventBus`] while a tick runs;
//! presentation, audio and metrics collectors drain them afterwards.

use serde::{Deserialize, Serialize};

use crate::math::Vec2Fixed;
use crate::state::EntityId;

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEvent {
    /// A projectile left a weapon.
    BulletFired {
        /// New bullet id.
        bullet_id: EntityId,
        /// Player or enemy that fired it.
        owner_id: EntityId,
        /// Muzzle position.
        pos: Vec2Fixed,
    },
    /// A bullet damaged a player.
    HitPlayer {
        /// Bullet id.
        bullet_id: EntityId,
        /// Player hit.
        player_id: EntityId,
        /// Damage dealt.
        damage: i32,
    },
    /// A bullet damaged an enemy.
    HitEnemy {
        /// Bullet id.
        bullet_id: EntityId,
        /// Enemy hit.
        enemy_id: EntityId,
        /// Damage dealt.
        damage: i32,
    },
    /// A breakable tile lost hit points but survived.
    TileDamaged {
        /// Tile column.
        col: i32,
        /// Tile row.
        row: i32,
        /// Hit points left.
        remaining_hp: i32,
    },
    /// A breakable tile was destroyed.
    TileDestroyed {
        /// Tile column.
        col: i32,
        /// Tile row.
        row: i32,
    },
    /// A breakable tile was placed at runtime.
    TileCreated {
        /// Tile column.
        col: i32,
        /// Tile row.
        row: i32,
        /// Hit points of the new tile.
        hp: i32,
    },
    /// A co-op player went down.
    PlayerDowned {
        /// Player id.
        player_id: EntityId,
        /// Where they fell.
        pos: Vec2Fixed,
    },
    /// A teammate started reviving a downed player.
    ReviveStart {
        /// Downed player.
        target_id: EntityId,
        /// Teammate holding revive.
        reviver_id: EntityId,
    },
    /// A revive finished.
    ReviveComplete {
        /// Revived player.
        target_id: EntityId,
        /// Teammate who revived them.
        reviver_id: EntityId,
    },
    /// A revive in progress was interrupted.
    ReviveCancelled {
        /// Downed player.
        target_id: EntityId,
    },
    /// A downed player's bleed-out timer ran out.
    PlayerBledOut {
        /// Player id.
        player_id: EntityId,
    },
    /// A dead player came back at a spawn point.
    PlayerRespawned {
        /// Player id.
        player_id: EntityId,
        /// Spawn position.
        pos: Vec2Fixed,
    },
    /// A player joined a running match.
    PlayerJoined {
        /// Player id.
        player_id: EntityId,
        /// Assigned slot.
        slot: usize,
        /// Spawn position.
        pos: Vec2Fixed,
    },
    /// An enemy entered the arena.
    EnemySpawned {
        /// Enemy id.
        enemy_id: EntityId,
        /// Spawn position.
        pos: Vec2Fixed,
    },
    /// An enemy was killed.
    EnemyKilled {
        /// Enemy id.
        enemy_id: EntityId,
        /// Owner of the killing bullet.
        killer_owner_id: EntityId,
    },
}

/// Double-buffered event queue.
///
/// Systems call [`EventBus::emit`]; consumers call [`EventBus::drain`] once
/// per tick and get everything emitted since the previous drain, in order.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    write: Vec<GameEvent>,
    read: Vec<GameEvent>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event.
    pub fn emit(&mut self, event: GameEvent) {
        self.write.push(event);
    }

    /// Take all queued events. The returned slice is valid until the next
    /// call that mutates the bus.
    pub fn drain(&mut self) -> &[GameEvent] {
        std::mem::swap(&mut self.write, &mut self.read);
        self.write.clear();
        &self.read
    }

    /// Discard all queued events.
    pub fn clear(&mut self) {
        self.write.clear();
    }

    /// Events queued since the last drain.
    #[must_use]
    pub fn pending(&self) -> &[GameEvent] {
        &self.write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destroyed(col: i32) -> GameEvent {
        GameEvent::TileDestroyed { col, row: 0 }
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut bus = EventBus::new();
        bus.emit(destroyed(1));
        bus.emit(destroyed(2));
        bus.emit(destroyed(3));
        assert_eq!(bus.drain(), &[destroyed(1), destroyed(2), destroyed(3)]);
    }

    #[test]
    fn test_drain_empties_bus() {
        let mut bus = EventBus::new();
        bus.emit(destroyed(1));
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.drain().is_empty());
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn test_events_after_drain_go_to_next_batch() {
        let mut bus = EventBus::new();
        bus.emit(destroyed(1));
        let _ = bus.drain();
        bus.emit(destroyed(2));
        assert_eq!(bus.pending(), &[destroyed(2)]);
        assert_eq!(bus.drain(), &[destroyed(2)]);
    }

    #[test]
    fn test_clear_discards_pending() {
        let mut bus = EventBus::new();
        bus.emit(destroyed(1));
        bus.clear();
        assert!(bus.drain().is_empty());
    }
}
