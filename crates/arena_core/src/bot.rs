//! Layered steering AI for bot-controlled players.
//!
//! Each bot slot keeps a [`BotMemory`] record. Every tick [`steer`] reads
//! the game state, picks a goal (revive, chase-and-shoot or wander) and
//! blends it with three reactive layers:
//!
//! - **Dodge**: sidestep hostile bullets whose path crosses the bot
//! - **Avoid**: push away from nearby engaged enemies
//! - **Repulse**: keep spacing from living teammates
//!
//! A stuck detector rotates the blended vector along walls, and the result
//! is clamped to the personality's move scale. Goal movement follows a
//! cached A* path whenever the target is out of sight.
//!
//! Bots draw from their own [`SeededRng`], so adding or removing bots never
//! shifts the simulation's random stream.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, ratio, Fixed, Vec2Fixed, PI};
use crate::pathfinding::PathScratch;
use crate::rng::SeededRng;
use crate::state::{GameState, Mode, PlayerIntent};

/// Downed allies farther than this are approached, not revived.
const REVIVE_RANGE: i32 = 200;
/// Sideways component added to approach directions.
const WOBBLE: Fixed = Fixed::from_bits(644_245_094); // 0.15
/// Ticks between aim jitter refreshes.
const JITTER_REFRESH_TICKS: i32 = 15;

const REPULSE_RADIUS: i32 = 90;
const REPULSE_STRENGTH: Fixed = Fixed::from_bits(2_576_980_378); // 0.6
const REPULSE_WEIGHT: Fixed = Fixed::from_bits(3_435_973_837); // 0.8

/// Hostile bullets farther than this are ignored by the dodge layer.
const DODGE_SCAN_RADIUS: i32 = 180;

/// Moved less than this over a check window counts as stuck.
const STUCK_THRESHOLD: i32 = 3;
const STUCK_CHECK_INTERVAL: i32 = 10;
/// Stuck ticks before the slide direction flips.
const STUCK_SLIDE_TICKS: i32 = 30;

/// Re-path once the goal has moved this far since the last search.
const REPATH_DISTANCE: i32 = 48;
const REPATH_INTERVAL: i32 = 30;
/// A waypoint this close counts as passed.
const WAYPOINT_REACH: i32 = 8;

/// Mixed into the match seed so bot draws differ from the simulation's.
const BOT_SEED_SALT: u32 = 0x9e37_79b9;

fn lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    a + (b - a) * t
}

/// Per-tick tuning derived from a bot's boldness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTuning {
    /// Cap on the output move vector length.
    pub move_scale: Fixed,
    /// Closer than this the bot strafes instead of approaching.
    pub standoff: Fixed,
    /// Minimum aim alignment (dot product) before firing.
    pub aim_threshold: Fixed,
    /// Aligned ticks required before the first shot.
    pub reaction_ticks: i32,
    /// Maximum aim jitter in radians.
    pub jitter: Fixed,
    /// Half-width of the corridor a bullet must cross to trigger a dodge.
    pub dodge_corridor: Fixed,
    /// Dodge push for a bullet heading dead center.
    pub dodge_strength: Fixed,
    /// Enemies closer than this push the bot away.
    pub avoid_radius: Fixed,
    /// Avoid push at zero distance.
    pub avoid_strength: Fixed,
    /// Blend weight of the dodge layer.
    pub dodge_weight: Fixed,
    /// Blend weight of the avoid layer.
    pub avoid_weight: Fixed,
}

impl BotTuning {
    /// Interpolate from the cautious profile (0) to the bold profile (1).
    #[must_use]
    pub fn from_boldness(boldness: Fixed) -> Self {
        let t = boldness.clamp(Fixed::ZERO, Fixed::ONE);
        let l = |a: Fixed, b: Fixed| lerp(a, b, t);
        let n = |v: i32| Fixed::from_num(v);

        Self {
            move_scale: l(ratio(55, 100), ratio(78, 100)),
            standoff: l(n(160), n(80)),
            aim_threshold: l(ratio(92, 100), ratio(78, 100)),
            reaction_ticks: l(n(14), n(4)).to_num::<i32>(),
            jitter: l(n(12), n(5)) * PI / n(180),
            dodge_corridor: l(n(55), n(28)),
            dodge_strength: l(ratio(3, 2), ratio(7, 10)),
            avoid_radius: l(n(130), n(80)),
            avoid_strength: l(ratio(6, 5), ratio(1, 2)),
            dodge_weight: l(ratio(14, 5), ratio(6, 5)),
            avoid_weight: l(n(2), ratio(4, 5)),
        }
    }
}

/// Persistent per-slot bot state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMemory {
    /// Personality in `[0, 1]`; 0 is cautious, 1 is bold.
    #[serde(with = "fixed_serde")]
    pub boldness: Fixed,
    /// Current aim offset in radians.
    #[serde(with = "fixed_serde")]
    pub aim_jitter: Fixed,
    /// Ticks until the jitter is redrawn.
    pub jitter_timer: i32,
    /// Aligned ticks left before the bot may fire.
    pub shoot_delay: i32,
    /// Position at the last stuck check.
    pub last_pos: Vec2Fixed,
    /// Ticks since the stuck detector last reset.
    pub stuck_ticks: i32,
    /// Which perpendicular to slide along: `1` or `-1`.
    pub slide_sign: i32,
    /// Cached waypoints toward the goal.
    pub path: Vec<Vec2Fixed>,
    /// Next waypoint to follow.
    pub path_index: usize,
    /// Goal position when the path was computed.
    pub path_goal: Option<Vec2Fixed>,
    /// Ticks until a forced re-path.
    pub repath_timer: i32,
}

impl BotMemory {
    /// Fresh memory with a given personality.
    #[must_use]
    pub fn new(boldness: Fixed, slide_sign: i32) -> Self {
        Self {
            boldness,
            aim_jitter: Fixed::ZERO,
            jitter_timer: 0,
            shoot_delay: 0,
            last_pos: Vec2Fixed::ZERO,
            stuck_ticks: 0,
            slide_sign: if slide_sign < 0 { -1 } else { 1 },
            path: Vec::new(),
            path_index: 0,
            path_goal: None,
            repath_timer: 0,
        }
    }

    /// Fresh memory with a random personality.
    pub fn random(rng: &mut SeededRng) -> Self {
        let boldness = rng.next();
        let slide_sign = if rng.next_int(0, 1) == 0 { 1 } else { -1 };
        Self::new(boldness, slide_sign)
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.path_index = 0;
        self.path_goal = None;
    }
}

/// Drives every bot slot of one match.
#[derive(Debug, Clone)]
pub struct BotBrain {
    memories: Vec<BotMemory>,
    rng: SeededRng,
    scratch: PathScratch,
}

impl BotBrain {
    /// Create a brain for a match started with `seed`.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            memories: Vec::new(),
            rng: SeededRng::new(seed ^ BOT_SEED_SALT),
            scratch: PathScratch::new(),
        }
    }

    fn ensure_memory(&mut self, slot: usize) {
        while self.memories.len() <= slot {
            let memory = BotMemory::random(&mut self.rng);
            self.memories.push(memory);
        }
    }

    /// Memory of `slot`, if it has been polled.
    #[must_use]
    pub fn memory(&self, slot: usize) -> Option<&BotMemory> {
        self.memories.get(slot)
    }

    /// Override the personality of `slot`.
    pub fn set_boldness(&mut self, slot: usize, boldness: Fixed) {
        self.ensure_memory(slot);
        self.memories[slot].boldness = boldness.clamp(Fixed::ZERO, Fixed::ONE);
    }

    /// Intent for the player in `slot` this tick.
    pub fn intent(&mut self, state: &GameState, slot: usize) -> PlayerIntent {
        if slot >= state.players.len() {
            return PlayerIntent::NEUTRAL;
        }
        self.ensure_memory(slot);
        let memory = &mut self.memories[slot];
        let tuning = BotTuning::from_boldness(memory.boldness);
        steer(state, slot, memory, &tuning, &mut self.rng, &mut self.scratch)
    }

    /// Intents for every player slot, in slot order.
    pub fn intents(&mut self, state: &GameState) -> Vec<PlayerIntent> {
        (0..state.players.len())
            .map(|slot| self.intent(state, slot))
            .collect()
    }
}

/// A goal choice before the reactive layers are blended in.
struct Goal {
    move_dir: Vec2Fixed,
    aim: Vec2Fixed,
    shoot: bool,
    revive: bool,
}

impl Goal {
    fn idle() -> Self {
        Self {
            move_dir: Vec2Fixed::ZERO,
            aim: Vec2Fixed::UNIT_X,
            shoot: false,
            revive: false,
        }
    }
}

fn dir_to(from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed {
    (to - from).normalize_or(Vec2Fixed::UNIT_X)
}

fn wobble(dir: Vec2Fixed) -> Vec2Fixed {
    (dir + dir.perp().scale(WOBBLE)).normalize_or(dir)
}

/// Compute the intent of the bot in `slot`, updating its memory.
pub fn steer(
    state: &GameState,
    slot: usize,
    memory: &mut BotMemory,
    tuning: &BotTuning,
    rng: &mut SeededRng,
    scratch: &mut PathScratch,
) -> PlayerIntent {
    let Some(player) = state.players.get(slot) else {
        return PlayerIntent::NEUTRAL;
    };
    if !player.is_present() {
        return PlayerIntent::NEUTRAL;
    }

    memory.jitter_timer -= 1;
    if memory.jitter_timer <= 0 {
        memory.aim_jitter = (rng.next() * Fixed::from_num(2) - Fixed::ONE) * tuning.jitter;
        memory.jitter_timer = JITTER_REFRESH_TICKS;
    }

    if player.downed {
        return match nearest_other_player(state, slot) {
            Some(ally) => {
                let dir = dir_to(player.pos, ally);
                PlayerIntent {
                    move_dir: dir.scale(tuning.move_scale),
                    aim: dir,
                    shoot: false,
                    revive: false,
                }
            }
            None => PlayerIntent::NEUTRAL,
        };
    }

    let goal = match state.match_state.mode {
        Mode::Coop => coop_goal(state, slot, memory, tuning, scratch),
        Mode::Pvp => pvp_goal(state, slot, memory, tuning, scratch),
    };

    let pos = player.pos;
    let mut m = goal.move_dir
        + bullet_dodge(state, slot, tuning).scale(tuning.dodge_weight)
        + enemy_avoidance(state, pos, tuning).scale(tuning.avoid_weight)
        + ally_repulsion(state, slot).scale(REPULSE_WEIGHT);

    let threshold = Fixed::from_num(STUCK_THRESHOLD);
    let moved_sq = pos.distance_squared(memory.last_pos);
    memory.stuck_ticks += 1;
    if memory.stuck_ticks % STUCK_CHECK_INTERVAL == 0 {
        if moved_sq < threshold * threshold {
            if memory.stuck_ticks > STUCK_SLIDE_TICKS {
                memory.slide_sign = -memory.slide_sign;
                memory.stuck_ticks = 1;
            }
        } else {
            memory.stuck_ticks = 0;
        }
        memory.last_pos = pos;
    }
    if memory.stuck_ticks >= STUCK_CHECK_INTERVAL {
        let slide = m.perp().scale(Fixed::from_num(memory.slide_sign));
        m = slide.scale(ratio(4, 5)) + m.scale(ratio(1, 5));
    }

    PlayerIntent {
        move_dir: m.clamp_length(tuning.move_scale),
        aim: goal.aim,
        shoot: goal.shoot,
        revive: goal.revive,
    }
}

fn coop_goal(
    state: &GameState,
    slot: usize,
    memory: &mut BotMemory,
    tuning: &BotTuning,
    scratch: &mut PathScratch,
) -> Goal {
    let pos = state.players[slot].pos;

    if let Some(downed) = nearest_downed_ally(state, slot) {
        let range = Fixed::from_num(REVIVE_RANGE);
        let dir = dir_to(pos, downed);
        if pos.distance_squared(downed) <= range * range {
            if !in_danger(state, pos, tuning) {
                memory.clear_path();
                return Goal {
                    move_dir: dir.scale(tuning.move_scale),
                    aim: dir,
                    shoot: false,
                    revive: true,
                };
            }
        } else {
            let heading = navigate(state, pos, downed, memory, scratch);
            return Goal {
                move_dir: wobble(heading).scale(tuning.move_scale),
                aim: dir,
                shoot: false,
                revive: false,
            };
        }
    }

    match nearest_engaged_enemy(state, pos) {
        Some(enemy) => chase_and_shoot(state, pos, enemy, memory, tuning, scratch),
        None => wander(memory, tuning),
    }
}

fn pvp_goal(
    state: &GameState,
    slot: usize,
    memory: &mut BotMemory,
    tuning: &BotTuning,
    scratch: &mut PathScratch,
) -> Goal {
    let pos = state.players[slot].pos;
    match nearest_other_player(state, slot) {
        Some(target) => chase_and_shoot(state, pos, target, memory, tuning, scratch),
        None => wander(memory, tuning),
    }
}

fn chase_and_shoot(
    state: &GameState,
    pos: Vec2Fixed,
    target: Vec2Fixed,
    memory: &mut BotMemory,
    tuning: &BotTuning,
    scratch: &mut PathScratch,
) -> Goal {
    let dir = dir_to(pos, target);
    let aim = dir.rotate(memory.aim_jitter);
    let visible = state.tiles.has_line_of_sight(pos, target);

    let mut shoot = false;
    if visible && dir.dot(aim) >= tuning.aim_threshold {
        if memory.shoot_delay <= 0 {
            shoot = true;
        } else {
            memory.shoot_delay -= 1;
        }
    } else {
        memory.shoot_delay = tuning.reaction_ticks;
    }

    let move_dir = if visible && pos.distance_squared(target) < tuning.standoff * tuning.standoff
    {
        memory.clear_path();
        dir.perp().scale(tuning.move_scale)
    } else {
        let heading = navigate(state, pos, target, memory, scratch);
        wobble(heading).scale(tuning.move_scale)
    };

    Goal {
        move_dir,
        aim,
        shoot,
        revive: false,
    }
}

fn wander(memory: &BotMemory, tuning: &BotTuning) -> Goal {
    let m = Vec2Fixed::from_angle(memory.aim_jitter * Fixed::from_num(5))
        .scale(tuning.move_scale * ratio(2, 5));
    Goal {
        move_dir: m,
        aim: m.normalize_or(Vec2Fixed::UNIT_X),
        ..Goal::idle()
    }
}

/// Unit heading toward `goal`: straight when visible, otherwise along the
/// cached path.
fn navigate(
    state: &GameState,
    pos: Vec2Fixed,
    goal: Vec2Fixed,
    memory: &mut BotMemory,
    scratch: &mut PathScratch,
) -> Vec2Fixed {
    let tiles = &state.tiles;
    if tiles.has_line_of_sight(pos, goal) {
        memory.clear_path();
        return dir_to(pos, goal);
    }

    memory.repath_timer -= 1;
    let repath_distance = Fixed::from_num(REPATH_DISTANCE);
    let goal_moved = memory
        .path_goal
        .map_or(true, |g| g.distance_squared(goal) > repath_distance * repath_distance);
    if memory.path_index >= memory.path.len() || goal_moved || memory.repath_timer <= 0 {
        memory.clear_path();
        memory.repath_timer = REPATH_INTERVAL;
        match scratch.find_path(tiles, pos, goal) {
            Some(path) => {
                memory.path = path;
                memory.path_goal = Some(goal);
            }
            None => tracing::trace!("Bot found no path to goal"),
        }
    }

    let reach = Fixed::from_num(WAYPOINT_REACH);
    while memory.path_index < memory.path.len()
        && memory.path[memory.path_index].distance_squared(pos) <= reach * reach
    {
        memory.path_index += 1;
    }

    match memory.path.get(memory.path_index) {
        Some(&waypoint) => dir_to(pos, waypoint),
        None => dir_to(pos, goal),
    }
}

/// True when an engaged enemy is inside the avoid radius.
fn in_danger(state: &GameState, pos: Vec2Fixed, tuning: &BotTuning) -> bool {
    let r2 = tuning.avoid_radius * tuning.avoid_radius;
    state
        .enemies
        .iter()
        .any(|e| e.is_engaged() && e.pos.distance_squared(pos) < r2)
}

fn bullet_dodge(state: &GameState, slot: usize, tuning: &BotTuning) -> Vec2Fixed {
    let me = &state.players[slot];
    let scan = Fixed::from_num(DODGE_SCAN_RADIUS);
    let pvp = state.match_state.mode == Mode::Pvp;
    let mut dodge = Vec2Fixed::ZERO;

    for bullet in state.bullets.iter().filter(|b| b.active) {
        let hostile = bullet.from_enemy || (pvp && bullet.owner_id != me.id);
        if !hostile {
            continue;
        }
        let to_self = me.pos - bullet.pos;
        if to_self.length_squared() > scan * scan {
            continue;
        }
        let dir = bullet.vel.normalize();
        if dir == Vec2Fixed::ZERO || to_self.dot(dir) <= Fixed::ZERO {
            continue;
        }
        let cross = to_self.cross(dir);
        let off_axis = cross.abs();
        if off_axis > tuning.dodge_corridor {
            continue;
        }
        let urgency = tuning.dodge_strength * (Fixed::ONE - off_axis / tuning.dodge_corridor);
        // Push toward the side of the bullet's line the bot already is on.
        let sign = if cross > Fixed::ZERO {
            -Fixed::ONE
        } else {
            Fixed::ONE
        };
        dodge += dir.perp().scale(sign * urgency);
    }
    dodge
}

fn enemy_avoidance(state: &GameState, pos: Vec2Fixed, tuning: &BotTuning) -> Vec2Fixed {
    let radius = tuning.avoid_radius;
    let mut push = Vec2Fixed::ZERO;
    for enemy in state.enemies.iter().filter(|e| e.is_engaged()) {
        let away = pos - enemy.pos;
        let d2 = away.length_squared();
        if d2 >= radius * radius || d2 == Fixed::ZERO {
            continue;
        }
        let dist = away.length();
        let strength = tuning.avoid_strength * (Fixed::ONE - dist / radius);
        push += away.scale(strength / dist);
    }
    push
}

fn ally_repulsion(state: &GameState, slot: usize) -> Vec2Fixed {
    let me = &state.players[slot];
    let radius = Fixed::from_num(REPULSE_RADIUS);
    let mut push = Vec2Fixed::ZERO;
    for (i, other) in state.players.iter().enumerate() {
        if i == slot || !other.alive || other.downed {
            continue;
        }
        let away = me.pos - other.pos;
        let d2 = away.length_squared();
        if d2 >= radius * radius || d2 == Fixed::ZERO {
            continue;
        }
        let dist = away.length();
        let strength = REPULSE_STRENGTH * (Fixed::ONE - dist / radius);
        push += away.scale(strength / dist);
    }
    push
}

fn nearest_position(
    candidates: impl Iterator<Item = Vec2Fixed>,
    from: Vec2Fixed,
) -> Option<Vec2Fixed> {
    let mut best: Option<(Vec2Fixed, Fixed)> = None;
    for pos in candidates {
        let d2 = pos.distance_squared(from);
        if best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((pos, d2));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Nearest other living, non-downed player.
fn nearest_other_player(state: &GameState, slot: usize) -> Option<Vec2Fixed> {
    let from = state.players[slot].pos;
    let others = state
        .players
        .iter()
        .enumerate()
        .filter(|&(i, p)| i != slot && p.alive && !p.downed)
        .map(|(_, p)| p.pos);
    nearest_position(others, from)
}

fn nearest_downed_ally(state: &GameState, slot: usize) -> Option<Vec2Fixed> {
    let from = state.players[slot].pos;
    let downed = state
        .players
        .iter()
        .enumerate()
        .filter(|&(i, p)| i != slot && p.downed)
        .map(|(_, p)| p.pos);
    nearest_position(downed, from)
}

fn nearest_engaged_enemy(state: &GameState, from: Vec2Fixed) -> Option<Vec2Fixed> {
    let enemies = state
        .enemies
        .iter()
        .filter(|e| e.is_engaged())
        .map(|e| e.pos);
    nearest_position(enemies, from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Tile;
    use crate::state::open_state;

    fn engage_enemy(state: &mut GameState, slot: usize, x: i32, y: i32) {
        let enemy = &mut state.enemies[slot];
        enemy.id = 100 + u32::try_from(slot).unwrap();
        enemy.active = true;
        enemy.hp = 2;
        enemy.pos = Vec2Fixed::from_int(x, y);
        enemy.spawn_timer = 0;
    }

    fn wall_at_col(state: &mut GameState, col: i32, rows: std::ops::Range<i32>) {
        for row in rows {
            state.tiles.set(col, row, Tile::SOLID);
        }
    }

    fn brain_with_boldness(boldness: Fixed) -> BotBrain {
        let mut brain = BotBrain::new(7);
        for slot in 0..4 {
            brain.set_boldness(slot, boldness);
        }
        brain
    }

    #[test]
    fn test_tuning_endpoints() {
        let cautious = BotTuning::from_boldness(Fixed::ZERO);
        let bold = BotTuning::from_boldness(Fixed::ONE);
        assert_eq!(cautious.move_scale, ratio(55, 100));
        assert_eq!(cautious.standoff, Fixed::from_num(160));
        assert_eq!(cautious.reaction_ticks, 14);
        assert_eq!(bold.reaction_ticks, 4);
        assert_eq!(bold.standoff, Fixed::from_num(80));
        assert!(bold.move_scale > cautious.move_scale);
        assert!(bold.aim_threshold < cautious.aim_threshold);
        assert!(bold.jitter < cautious.jitter);
    }

    #[test]
    fn test_dead_player_is_neutral() {
        let mut state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        state.players[0].alive = false;
        state.players[0].respawn_timer = 20;
        let mut brain = BotBrain::new(1);
        assert_eq!(brain.intent(&state, 0), PlayerIntent::NEUTRAL);
        assert_eq!(brain.intent(&state, 9), PlayerIntent::NEUTRAL);
    }

    #[test]
    fn test_clear_shot_eventually_fires() {
        let state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        let mut brain = BotBrain::new(3);
        let fired = (0..30).any(|_| brain.intent(&state, 0).shoot);
        assert!(fired);
    }

    #[test]
    fn test_pvp_aims_at_nearest_other_player() {
        let mut state = open_state(Mode::Pvp, &[(300, 300), (600, 300), (300, 420)]);
        let mut brain = BotBrain::new(3);
        let aim = brain.intent(&state, 0).aim;
        assert!(aim.y > aim.x.abs());

        // Downed players are not targets.
        state.players[2].alive = false;
        state.players[2].downed = true;
        let aim = brain.intent(&state, 0).aim;
        assert!(aim.x > aim.y.abs());
    }

    #[test]
    fn test_wall_blocks_fire() {
        let mut state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        wall_at_col(&mut state, 20, 0..60);
        let mut brain = BotBrain::new(3);
        let fired = (0..60).any(|_| brain.intent(&state, 0).shoot);
        assert!(!fired);
    }

    #[test]
    fn test_reaction_delay_after_losing_alignment() {
        let mut state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        let mut brain = brain_with_boldness(Fixed::ZERO);
        assert!(brain.intent(&state, 0).shoot);

        // Losing sight resets the delay; the first shots after it come late.
        wall_at_col(&mut state, 20, 0..60);
        assert!(!brain.intent(&state, 0).shoot);
        assert_eq!(brain.memory(0).unwrap().shoot_delay, 14);

        for row in 0..60 {
            state.tiles.set(20, row, Tile::EMPTY);
        }
        let first_shot = (1..=20).find(|_| brain.intent(&state, 0).shoot);
        assert_eq!(first_shot, Some(15));
    }

    #[test]
    fn test_downed_ally_in_range_requests_revive() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (400, 300)]);
        state.players[1].alive = false;
        state.players[1].downed = true;
        state.players[1].downed_timer = 300;
        let mut brain = BotBrain::new(5);
        let intent = brain.intent(&state, 0);
        assert!(intent.revive);
        assert!(intent.move_dir.x > Fixed::ZERO);
    }

    #[test]
    fn test_danger_overrides_revive() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (400, 300)]);
        state.players[1].alive = false;
        state.players[1].downed = true;
        engage_enemy(&mut state, 0, 320, 300);
        let mut brain = BotBrain::new(5);
        assert!(!brain.intent(&state, 0).revive);
    }

    #[test]
    fn test_downed_bot_crawls_to_ally() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (300, 500)]);
        state.players[0].alive = false;
        state.players[0].downed = true;
        let mut brain = brain_with_boldness(Fixed::ONE);
        let intent = brain.intent(&state, 0);
        assert!(!intent.revive && !intent.shoot);
        assert!(intent.move_dir.y > Fixed::ZERO);
        assert_eq!(intent.move_dir.x, Fixed::ZERO);
    }

    #[test]
    fn test_move_never_exceeds_scale() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (320, 300), (300, 330)]);
        engage_enemy(&mut state, 0, 340, 310);
        engage_enemy(&mut state, 1, 280, 280);
        state.bullets[0].active = true;
        state.bullets[0].from_enemy = true;
        state.bullets[0].pos = Vec2Fixed::from_int(200, 302);
        state.bullets[0].vel = Vec2Fixed::from_int(300, 0);

        for boldness in [Fixed::ZERO, ratio(1, 2), Fixed::ONE] {
            let mut brain = brain_with_boldness(boldness);
            let cap = BotTuning::from_boldness(boldness).move_scale + ratio(1, 1000);
            for _ in 0..60 {
                for slot in 0..3 {
                    let intent = brain.intent(&state, slot);
                    assert!(intent.move_dir.length() <= cap);
                }
            }
        }
    }

    #[test]
    fn test_dodge_is_perpendicular_to_incoming_bullet() {
        let mut state = open_state(Mode::Coop, &[(300, 300)]);
        state.bullets[0].active = true;
        state.bullets[0].from_enemy = true;
        state.bullets[0].pos = Vec2Fixed::from_int(200, 290);
        state.bullets[0].vel = Vec2Fixed::from_int(350, 0);
        let tuning = BotTuning::from_boldness(Fixed::ZERO);

        let dodge = bullet_dodge(&state, 0, &tuning);
        assert_eq!(dodge.x, Fixed::ZERO);
        assert!(dodge.y > Fixed::ZERO);

        // Moving away: ignored.
        state.bullets[0].vel = Vec2Fixed::from_int(-350, 0);
        assert_eq!(bullet_dodge(&state, 0, &tuning), Vec2Fixed::ZERO);

        // Friendly co-op fire: ignored.
        state.bullets[0].vel = Vec2Fixed::from_int(350, 0);
        state.bullets[0].from_enemy = false;
        assert_eq!(bullet_dodge(&state, 0, &tuning), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_avoidance_and_repulsion_push_away() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (340, 300)]);
        engage_enemy(&mut state, 0, 300, 360);
        let tuning = BotTuning::from_boldness(Fixed::ZERO);

        let avoid = enemy_avoidance(&state, state.players[0].pos, &tuning);
        assert!(avoid.y < Fixed::ZERO);
        let repulse = ally_repulsion(&state, 0);
        assert!(repulse.x < Fixed::ZERO);

        // Telegraphing enemies are not a threat yet.
        state.enemies[0].spawn_timer = 10;
        assert_eq!(enemy_avoidance(&state, state.players[0].pos, &tuning), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_paths_around_wall_when_out_of_sight() {
        let mut state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        wall_at_col(&mut state, 20, 10..50);
        let mut brain = BotBrain::new(11);
        brain.intent(&state, 0);
        let memory = brain.memory(0).unwrap();
        assert!(!memory.path.is_empty());
        assert_eq!(memory.path_goal, Some(Vec2Fixed::from_int(400, 300)));

        // Clear the wall: the path is dropped.
        for row in 10..50 {
            state.tiles.set(20, row, Tile::EMPTY);
        }
        brain.intent(&state, 0);
        assert!(brain.memory(0).unwrap().path.is_empty());
    }

    #[test]
    fn test_stuck_bot_flips_slide() {
        let state = open_state(Mode::Pvp, &[(100, 300), (400, 300)]);
        let mut memory = BotMemory::new(ratio(1, 2), 1);
        let tuning = BotTuning::from_boldness(memory.boldness);
        let mut rng = SeededRng::new(2);
        let mut scratch = PathScratch::new();

        for _ in 0..20 {
            steer(&state, 0, &mut memory, &tuning, &mut rng, &mut scratch);
        }
        assert!(memory.stuck_ticks >= STUCK_CHECK_INTERVAL);
        assert_eq!(memory.slide_sign, 1);

        for _ in 0..30 {
            steer(&state, 0, &mut memory, &tuning, &mut rng, &mut scratch);
        }
        assert_eq!(memory.slide_sign, -1);
    }

    #[test]
    fn test_wander_without_targets() {
        let state = open_state(Mode::Coop, &[(300, 300)]);
        let mut brain = brain_with_boldness(Fixed::ONE);
        let intent = brain.intent(&state, 0);
        assert!(!intent.shoot);
        let cap = BotTuning::from_boldness(Fixed::ONE).move_scale * ratio(2, 5) + ratio(1, 1000);
        assert!(intent.move_dir.length() <= cap);
        assert!(intent.move_dir.length() > Fixed::ZERO);
    }

    #[test]
    fn test_same_seed_same_intents() {
        let mut state = open_state(Mode::Coop, &[(300, 300), (500, 400)]);
        engage_enemy(&mut state, 0, 600, 200);
        let mut a = BotBrain::new(42);
        let mut b = BotBrain::new(42);
        for _ in 0..50 {
            assert_eq!(a.intents(&state), b.intents(&state));
        }
    }
}
