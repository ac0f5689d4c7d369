//! Capture the flag.
//!
//! Each flag is at its base, carried by one enemy player, or dropped with a
//! return timer. Enemies on foot pick flags up by touch, teammates return
//! dropped flags by touch, and a carrier scores by reaching their own base
//! while their own flag is home.

use crate::game::{FlagState, GameState, Player};
use log::info;
use shared::{FLAG_RETURN_TIME, FLAG_TOUCH_RADIUS};

impl GameState {
    /// Drops any flag carried by `id` where the player stands.
    pub fn drop_flag(&mut self, id: usize) {
        let position = self.players[id].position;
        for flag in self.flags.iter_mut() {
            if flag.carrier() == Some(id) {
                flag.position = position;
                flag.state = FlagState::Dropped {
                    return_timer: FLAG_RETURN_TIME,
                };
                info!("Team {} flag dropped by player {}", flag.team, id);
            }
        }
    }

    pub fn update_flags(&mut self, dt: f32) {
        for team in 0..self.flags.len() {
            match self.flags[team].state {
                FlagState::Carried { carrier } => self.update_carried(team, carrier),
                FlagState::Dropped { return_timer } => {
                    let remaining = return_timer - dt;
                    if remaining <= 0.0 {
                        self.flags[team].return_to_base();
                        info!("Team {} flag returned", team);
                    } else {
                        self.flags[team].state = FlagState::Dropped {
                            return_timer: remaining,
                        };
                        self.touch_flag(team);
                    }
                }
                FlagState::AtBase => self.touch_flag(team),
            }
        }
    }

    fn update_carried(&mut self, team: usize, carrier: usize) {
        let player = &self.players[carrier];
        if !player.is_alive() {
            self.drop_flag(carrier);
            return;
        }
        self.flags[team].position = player.position;

        let home = player.team as usize;
        let home_flag = &self.flags[home];
        if home_flag.state == FlagState::AtBase
            && player.position.distance(home_flag.base) < FLAG_TOUCH_RADIUS
        {
            self.scores[home] = self.scores[home].saturating_add(1);
            self.flags[team].return_to_base();
            info!(
                "Player {} captured the team {} flag (score {}-{})",
                carrier, team, self.scores[0], self.scores[1]
            );
        }
    }

    fn touch_flag(&mut self, team: usize) {
        let flag = &self.flags[team];
        let in_reach = |p: &&Player| {
            p.is_alive() && p.vehicle.is_none() && p.position.distance(flag.position) < FLAG_TOUCH_RADIUS
        };

        if matches!(flag.state, FlagState::Dropped { .. })
            && self
                .players
                .iter()
                .filter(in_reach)
                .any(|p| p.team as usize == team)
        {
            self.flags[team].return_to_base();
            info!("Team {} flag returned by a teammate", team);
            return;
        }

        let taker = self
            .players
            .iter()
            .enumerate()
            .find(|(_, p)| in_reach(p) && p.team as usize != team)
            .map(|(id, _)| id);

        if let Some(id) = taker {
            let flag = &mut self.flags[team];
            flag.state = FlagState::Carried { carrier: id };
            flag.position = self.players[id].position;
            info!("Player {} took the team {} flag", id, team);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GameMap;
    use shared::{PlayerClass, Vec3, VehicleType};

    const NORTH: Vec3 = Vec3::new(0.0, 0.1, -20.0);
    const SOUTH: Vec3 = Vec3::new(0.0, 0.1, 20.0);

    /// Returns the state with one player per team, both standing in the open.
    fn field() -> (GameState, usize, usize) {
        let mut map = GameMap::new();
        map.set_flag_base(0, NORTH);
        map.set_flag_base(1, SOUTH);
        let mut state = GameState::new(map, Some(21));
        let north = state.add_player("north", false, PlayerClass::Assault).unwrap();
        let south = state.add_player("south", false, PlayerClass::Assault).unwrap();
        state.players[north].position = Vec3::new(-10.0, 0.0, 0.0);
        state.players[south].position = Vec3::new(10.0, 0.0, 0.0);
        (state, north, south)
    }

    fn assert_exclusive(state: &GameState) {
        for flag in &state.flags {
            match flag.state {
                FlagState::AtBase => assert_eq!(flag.position, flag.base),
                FlagState::Carried { carrier } => {
                    assert!(state.players[carrier].is_alive());
                    assert_ne!(state.players[carrier].team, flag.team);
                }
                FlagState::Dropped { return_timer } => assert!(return_timer > 0.0),
            }
        }
    }

    #[test]
    fn test_capture_round_trip() {
        let (mut state, north, _) = field();

        // North player raids the south base
        state.players[north].position = SOUTH;
        state.update_flags(0.1);
        assert_eq!(state.flags[1].state, FlagState::Carried { carrier: north });
        assert_exclusive(&state);

        state.players[north].position = Vec3::new(0.0, 0.0, 0.0);
        state.update_flags(0.1);
        assert_eq!(state.flags[1].position, Vec3::new(0.0, 0.0, 0.0));

        state.players[north].position = NORTH;
        state.update_flags(0.1);
        assert_eq!(state.scores, [1, 0]);
        assert_eq!(state.flags[1].state, FlagState::AtBase);
        assert_eq!(state.flags[1].position, SOUTH);
        assert_exclusive(&state);
    }

    #[test]
    fn test_no_capture_while_home_flag_is_away() {
        let (mut state, north, south) = field();
        state.players[north].position = SOUTH;
        state.players[south].position = NORTH;
        state.update_flags(0.1);
        assert_eq!(state.flags[0].carrier(), Some(south));
        assert_eq!(state.flags[1].carrier(), Some(north));

        state.players[north].position = NORTH;
        state.update_flags(0.1);
        assert_eq!(state.scores, [0, 0]);
        assert_exclusive(&state);
    }

    #[test]
    fn test_own_flag_is_not_taken() {
        let (mut state, north, _) = field();
        state.players[north].position = NORTH;
        state.update_flags(0.1);
        assert_eq!(state.flags[0].state, FlagState::AtBase);
    }

    #[test]
    fn test_carrier_death_drops_then_times_out() {
        let (mut state, north, south) = field();
        state.players[north].position = SOUTH;
        state.update_flags(0.1);
        let drop_point = Vec3::new(3.0, 0.0, 5.0);
        state.players[north].position = drop_point;

        state.kill(north, south);
        assert_eq!(
            state.flags[1].state,
            FlagState::Dropped {
                return_timer: FLAG_RETURN_TIME
            }
        );
        assert_eq!(state.flags[1].position, drop_point);

        state.players[south].position = Vec3::new(40.0, 0.0, 40.0);
        state.update_flags(FLAG_RETURN_TIME - 1.0);
        assert!(matches!(state.flags[1].state, FlagState::Dropped { .. }));
        assert_exclusive(&state);
        state.update_flags(1.5);
        assert_eq!(state.flags[1].state, FlagState::AtBase);
        assert_eq!(state.flags[1].position, SOUTH);
    }

    #[test]
    fn test_teammate_returns_dropped_flag() {
        let (mut state, north, south) = field();
        state.players[north].position = SOUTH;
        state.update_flags(0.1);
        state.players[north].position = Vec3::new(0.0, 0.0, 5.0);
        state.remove_player(north);
        assert!(matches!(state.flags[1].state, FlagState::Dropped { .. }));

        state.players[south].position = Vec3::new(0.5, 0.0, 5.0);
        state.update_flags(0.1);
        assert_eq!(state.flags[1].state, FlagState::AtBase);
    }

    #[test]
    fn test_enemy_recovers_dropped_flag() {
        let (mut state, north, south) = field();
        let raider = state.add_player("raider", false, PlayerClass::Assault).unwrap();
        assert_eq!(state.players[raider].team, 0);
        state.players[raider].position = Vec3::new(-30.0, 0.0, 0.0);

        state.players[north].position = SOUTH;
        state.update_flags(0.1);
        state.kill(north, south);

        state.players[raider].position = state.flags[1].position;
        state.update_flags(0.1);
        assert_eq!(state.flags[1].carrier(), Some(raider));
        assert_exclusive(&state);
    }

    #[test]
    fn test_drivers_cannot_take_flags() {
        let mut map = GameMap::new();
        map.set_flag_base(0, NORTH);
        map.set_flag_base(1, SOUTH);
        map.add_vehicle_spawn(VehicleType::Jeep, SOUTH, 0.0);
        let mut state = GameState::new(map, Some(8));
        let id = state.add_player("driver", false, PlayerClass::Assault).unwrap();
        state.players[id].position = SOUTH;
        assert!(state.enter_vehicle(id));

        state.update_flags(0.1);
        assert_eq!(state.flags[1].state, FlagState::AtBase);
    }
}
