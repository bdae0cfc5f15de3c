//! Bullet flight.

use crate::math::Fixed;
use crate::state::BulletState;

/// Integrate active bullets and expire them when their ttl runs out.
pub fn bullet_system(bullets: &mut [BulletState], dt: Fixed) {
    for bullet in bullets.iter_mut().filter(|b| b.active) {
        bullet.pos += bullet.vel.scale(dt);
        bullet.ttl -= 1;
        if bullet.ttl <= 0 {
            bullet.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;

    #[test]
    fn test_bullet_expires() {
        let mut bullets = vec![BulletState {
            active: true,
            ttl: 2,
            vel: Vec2Fixed::from_int(60, 0),
            ..BulletState::default()
        }];
        bullet_system(&mut bullets, Fixed::ONE);
        assert!(bullets[0].active);
        assert_eq!(bullets[0].pos, Vec2Fixed::from_int(60, 0));
        bullet_system(&mut bullets, Fixed::ONE);
        assert!(!bullets[0].active);
    }

    #[test]
    fn test_inactive_bullets_untouched() {
        let mut bullets = vec![BulletState {
            ttl: 5,
            vel: Vec2Fixed::from_int(60, 0),
            ..BulletState::default()
        }];
        bullet_system(&mut bullets, Fixed::ONE);
        assert_eq!(bullets[0].ttl, 5);
        assert_eq!(bullets[0].pos, Vec2Fixed::ZERO);
    }
}
