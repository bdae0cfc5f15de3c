//! Fixed-point math utilities for deterministic simulation.
//!
//! All game simulation uses fixed-point arithmetic to ensure
//! deterministic behavior across platforms. Floating-point
//! operations can produce different results on different CPUs.
//!
//! Square roots are exact integer square roots over the raw bits and
//! trigonometry is a range-reduced Taylor series, so every client
//! computes the same bits for the same input.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// π.
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// π / 2.
pub const FRAC_PI_2: Fixed = Fixed::from_bits(6_746_518_852);

/// 2π.
pub const TAU: Fixed = Fixed::from_bits(26_986_075_409);

/// √2, the diagonal step cost on the tile grid.
pub const SQRT_2: Fixed = Fixed::from_bits(6_074_001_000);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Builds `numerator / denominator` without going through floats.
///
/// Used for balance constants such as `0.55` (`ratio(55, 100)`).
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> Fixed {
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Converts whole degrees to radians.
#[must_use]
pub fn degrees(deg: i32) -> Fixed {
    PI * Fixed::from_num(deg) / Fixed::from_num(180)
}

/// Integer square root by Newton's method (floor of the exact root).
fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let shift = (128 - n.leading_zeros()) / 2 + 1;
    let mut x = 1u128 << shift;
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Square root of a fixed-point number. Non-positive input yields zero.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    // bits = v * 2^32, so sqrt(bits * 2^32) = sqrt(v) * 2^32.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let root = isqrt_u128((value.to_bits() as u128) << 32) as i64;
    Fixed::from_bits(root)
}

/// Sine of an angle in radians.
#[must_use]
pub fn sin(angle: Fixed) -> Fixed {
    // Wrap into [-π, π).
    let mut x = (angle + PI) % TAU;
    if x < Fixed::ZERO {
        x += TAU;
    }
    x -= PI;

    // Reflect into [-π/2, π/2] where the series converges quickly.
    if x > FRAC_PI_2 {
        x = PI - x;
    } else if x < -FRAC_PI_2 {
        x = -PI - x;
    }

    let x2 = x * x;
    let one = Fixed::ONE;
    let mut acc = one - x2 / Fixed::from_num(110);
    acc = one - x2 / Fixed::from_num(72) * acc;
    acc = one - x2 / Fixed::from_num(42) * acc;
    acc = one - x2 / Fixed::from_num(20) * acc;
    acc = one - x2 / Fixed::from_num(6) * acc;
    x * acc
}

/// Cosine of an angle in radians.
#[must_use]
pub fn cos(angle: Fixed) -> Fixed {
    sin(angle + FRAC_PI_2)
}

/// Sine and cosine of an angle in radians.
#[must_use]
pub fn sin_cos(angle: Fixed) -> (Fixed, Fixed) {
    (sin(angle), cos(angle))
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-number components.
    #[must_use]
    pub fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Unit vector pointing along +X, the fallback direction.
    pub const UNIT_X: Self = Self {
        x: Fixed::ONE,
        y: Fixed::ZERO,
    };

    /// Unit vector for an angle in radians.
    #[must_use]
    pub fn from_angle(angle: Fixed) -> Self {
        let (s, c) = sin_cos(angle);
        Self::new(c, s)
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> Fixed {
        self.x * other.y - self.y * other.x
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, s: Fixed) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Perpendicular vector `(-y, x)`.
    #[must_use]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotate counter-clockwise by an angle in radians.
    #[must_use]
    pub fn rotate(self, angle: Fixed) -> Self {
        if angle == Fixed::ZERO {
            return self;
        }
        let (s, c) = sin_cos(angle);
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Normalize vector using fixed-point math. The zero vector stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        self.normalize_or(Self::ZERO)
    }

    /// Normalize, returning `fallback` for a zero-length vector.
    #[must_use]
    pub fn normalize_or(self, fallback: Self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return fallback;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Clamp the length to at most `max`.
    #[must_use]
    pub fn clamp_length(self, max: Fixed) -> Self {
        let len = self.length();
        if len > max && len > Fixed::ZERO {
            self.scale(max / len)
        } else {
            self
        }
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::SubAssign for Vec2Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl std::ops::Mul<Fixed> for Vec2Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        self.scale(rhs)
    }
}
