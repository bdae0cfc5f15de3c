//! End-of-match rules.

use crate::config::SimConfig;
use crate::state::{GameState, Mode};

/// Set `game_over` when the mode's end condition holds.
///
/// Co-op ends once no shared lives remain and nobody is alive or downed.
/// PvP ends when the tick counter reaches the match duration.
pub fn mode_rules_system(state: &mut GameState, config: &SimConfig) {
    let over = match state.match_state.mode {
        Mode::Coop => {
            state.match_state.shared_lives <= 0 && !state.players.iter().any(|p| p.is_present())
        }
        Mode::Pvp => state.match_state.tick >= config.pvp_match_duration,
    };
    if over && !state.match_state.game_over {
        state.match_state.game_over = true;
        tracing::info!(
            tick = state.match_state.tick,
            mode = ?state.match_state.mode,
            score = state.match_state.score,
            "Match over"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::open_state;

    #[test]
    fn test_coop_ends_when_everyone_is_out() {
        let config = SimConfig::default();
        let mut state = open_state(Mode::Coop, &[(100, 100)]);
        state.match_state.shared_lives = 0;
        mode_rules_system(&mut state, &config);
        assert!(!state.match_state.game_over);

        state.players[0].alive = false;
        state.players[0].downed = true;
        mode_rules_system(&mut state, &config);
        assert!(!state.match_state.game_over);

        state.players[0].downed = false;
        mode_rules_system(&mut state, &config);
        assert!(state.match_state.game_over);
    }

    #[test]
    fn test_pvp_ends_at_duration() {
        let config = SimConfig::default();
        let mut state = open_state(Mode::Pvp, &[(100, 100)]);
        state.match_state.tick = 10_799;
        mode_rules_system(&mut state, &config);
        assert!(!state.match_state.game_over);
        state.match_state.tick = 10_800;
        mode_rules_system(&mut state, &config);
        assert!(state.match_state.game_over);
    }
}
