//! Interactive headless runner.
//!
//! Reads [`Command`]s as JSON lines and answers with [`Response`] lines.
//! Slots are bot-driven until the controller sends an `intent` for them;
//! a manual slot keeps its last intent until it is released.

use std::io::{self, BufRead, Write};

use arena_core::bot::BotBrain;
use arena_core::math::{Fixed, Vec2Fixed};
use arena_core::simulation::Simulation;
use arena_core::state::{Mode, PlayerIntent};

use crate::game_runner::setup_match;
use crate::metrics::MatchOutcome;
use crate::protocol::{Command, MatchView, Response, PROTOCOL_VERSION};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every `tick` command (vs only on query).
    pub auto_state_output: bool,
    /// Scenario to load on startup (built-in name or RON path).
    pub scenario: Option<String>,
    /// Match seed.
    pub seed: u32,
}

/// Headless runner for controller-driven matches.
#[derive(Debug)]
pub struct HeadlessRunner {
    config: HeadlessConfig,
    sim: Simulation,
    bots: BotBrain,
    manual: Vec<Option<PlayerIntent>>,
    kinds: Vec<String>,
    game_over_sent: bool,
}

impl HeadlessRunner {
    /// Create a runner, loading the configured scenario.
    ///
    /// # Errors
    ///
    /// Fails if the scenario cannot be loaded or played.
    pub fn with_config(config: HeadlessConfig) -> Result<Self, ScenarioError> {
        let scenario = match &config.scenario {
            Some(name) => Scenario::resolve(name)?,
            None => Scenario::default(),
        };
        let (sim, bots) = setup_match(&scenario, config.seed)?;
        let kinds = sim.catalogs().enemies.iter().map(|e| e.id.clone()).collect();
        Ok(Self {
            config,
            sim,
            bots,
            manual: Vec::new(),
            kinds,
            game_over_sent: false,
        })
    }

    /// The running match.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run the command loop over stdin and stdout until `quit` or EOF.
    ///
    /// # Errors
    ///
    /// Fails on IO errors.
    pub fn run(self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Run the command loop over any line reader and writer.
    ///
    /// # Errors
    ///
    /// Fails on IO errors.
    pub fn serve<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> io::Result<()> {
        output.write_all(self.ready().to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(Command::Quit) => {
                    output.write_all(Response::Bye.to_json_line().as_bytes())?;
                    output.flush()?;
                    return Ok(());
                }
                Ok(cmd) => self.handle(cmd),
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in responses {
                output.write_all(response.to_json_line().as_bytes())?;
            }
            output.flush()?;
        }
        tracing::debug!("Input closed");
        Ok(())
    }

    fn ready(&self) -> Response {
        let state = self.sim.state();
        Response::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick: state.match_state.tick,
            mode: format!("{:?}", state.match_state.mode),
            map: state.match_state.map_id.clone(),
            players: state.players.len(),
        }
    }

    fn view(&self) -> MatchView {
        let manual: Vec<bool> = self.manual.iter().map(Option::is_some).collect();
        MatchView::from_state(self.sim.state(), &self.kinds, &manual, self.sim.state_hash())
    }

    /// Execute one command and return the responses to send.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        match self.execute(cmd) {
            Ok(responses) => responses,
            Err(e) => vec![Response::error(e.to_string(), Some(name))],
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Vec<Response>, ScenarioError> {
        let name = cmd.name();
        let response = match cmd {
            Command::Tick { count } => return Ok(self.tick(count)),
            Command::Query => Response::State(self.view()),
            Command::Intent {
                slot,
                move_x,
                move_y,
                aim_x,
                aim_y,
                shoot,
                revive,
            } => {
                if slot >= self.sim.state().players.len() {
                    return Err(arena_core::error::GameError::InvalidSlot(slot).into());
                }
                let intent = PlayerIntent {
                    move_dir: stick(move_x, move_y)?,
                    aim: stick(aim_x, aim_y)?,
                    shoot,
                    revive,
                };
                if self.manual.len() <= slot {
                    self.manual.resize(slot + 1, None);
                }
                self.manual[slot] = Some(intent);
                Response::ack(name)
            }
            Command::Release { slot } => {
                if let Some(manual) = self.manual.get_mut(slot) {
                    *manual = None;
                }
                Response::ack(name)
            }
            Command::Join => {
                let player_id = self.sim.add_player()?;
                Response::Joined {
                    slot: self.sim.state().players.len() - 1,
                    player_id,
                }
            }
            Command::Spawn { kind, x, y } => {
                let pos = Vec2Fixed::new(coordinate(x)?, coordinate(y)?);
                let enemy_id = self.sim.spawn_enemy(&kind, pos, false)?;
                Response::Spawned { enemy_id }
            }
            Command::Hash => Response::StateHash {
                tick: self.sim.current_tick(),
                hash: self.sim.state_hash(),
            },
            Command::LoadScenario { scenario, seed } => {
                let config = HeadlessConfig {
                    scenario: Some(scenario),
                    seed,
                    ..self.config.clone()
                };
                *self = Self::with_config(config)?;
                self.ready()
            }
            Command::Quit => Response::Bye,
        };
        Ok(vec![response])
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let mut events = Vec::new();
        for _ in 0..count {
            if self.sim.is_game_over() {
                break;
            }
            let mut intents = self.bots.intents(self.sim.state());
            for (intent, manual) in intents.iter_mut().zip(&self.manual) {
                if let Some(manual) = manual {
                    *intent = *manual;
                }
            }
            self.sim.tick(&intents);
            events.extend_from_slice(self.sim.drain_events());
        }

        let mut responses = vec![Response::Ticked {
            tick: self.sim.current_tick(),
            events,
        }];
        if self.config.auto_state_output {
            responses.push(Response::State(self.view()));
        }
        if self.sim.is_game_over() && !self.game_over_sent {
            self.game_over_sent = true;
            let state = self.sim.state();
            responses.push(Response::GameOver {
                outcome: match state.match_state.mode {
                    Mode::Coop => MatchOutcome::TeamWiped,
                    Mode::Pvp => MatchOutcome::TimeUp,
                },
                ticks: state.match_state.tick,
                score: state.match_state.score,
                kills: state.players.iter().map(|p| p.kills).collect(),
            });
        }
        responses
    }
}

fn coordinate(value: f64) -> Result<Fixed, ScenarioError> {
    Fixed::checked_from_num(value).ok_or_else(|| {
        ScenarioError::Game(arena_core::error::GameError::InvalidState(format!(
            "Coordinate out of range: {value}"
        )))
    })
}

/// Stick input, each axis clamped to `[-1, 1]`.
fn stick(x: f64, y: f64) -> Result<Vec2Fixed, ScenarioError> {
    let axis = |v: f64| coordinate(v).map(|v| v.clamp(-Fixed::ONE, Fixed::ONE));
    Ok(Vec2Fixed::new(axis(x)?, axis(y)?))
}
