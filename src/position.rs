use std::{fmt, str::FromStr};

/// Number of slots in a board vector: 24 points plus a bar at each end.
pub const BOARD_SIZE: usize = 26;

/// Checker counts per point from the perspective of the side on roll.
/// Positive counts are the side on roll, negative counts the opponent.
/// Index 0 and 25 are the bars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board(pub [i32; BOARD_SIZE]);

pub const START_POSITION: Board =
    Board([0, 2, 0, 0, 0, 0, -5, 0, -3, 0, 0, 0, 5, -5, 0, 0, 0, 3, 0, 5, 0, 0, 0, 0, -2, 0]);

impl Board {
    /// Mirror of the position as seen by the opponent.
    pub fn swap_sides(&self) -> Self {
        let mut swapped = [0; BOARD_SIZE];

        for (dst, src) in swapped.iter_mut().zip(self.0.iter().rev()) {
            *dst = -src;
        }

        Self(swapped)
    }

    /// (side on roll, opponent) pip counts.
    pub fn pip_count(&self) -> (u32, u32) {
        let mut xpip = 0;
        let mut opip = 0;

        for (i, &c) in self.0.iter().enumerate() {
            if c > 0 {
                xpip += (25 - i as u32) * c as u32;
            } else if c < 0 {
                opip += i as u32 * c.unsigned_abs();
            }
        }

        (xpip, opip)
    }

    /// True when enough checkers are still travelling that a one-sided rollout
    /// beats a database lookup. Only pips outside the home boards count.
    pub fn long_race(&self) -> bool {
        let mut xpip = 0;
        let mut opip = 0;

        for (i, &c) in self.0.iter().enumerate() {
            if c > 0 && i <= 18 {
                xpip += (25 - i as u32) * c as u32;
            } else if c < 0 && i > 6 {
                opip += i as u32 * c.unsigned_abs();
            }
        }

        xpip + opip > 20
    }

    pub fn checkers(&self) -> (u32, u32) {
        let x = self.0.iter().filter(|&&c| c > 0).map(|&c| c as u32).sum();
        let o = self.0.iter().filter(|&&c| c < 0).map(|&c| c.unsigned_abs()).sum();
        (x, o)
    }

    pub fn is_valid(&self) -> bool {
        let (x, o) = self.checkers();
        x <= 15 && o <= 15
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let counts = s
            .split_whitespace()
            .map(|x| x.parse::<i32>().map_err(|e| format!("bad checker count '{x}': {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        let counts: [i32; BOARD_SIZE] =
            counts.try_into().map_err(|v: Vec<i32>| format!("expected {BOARD_SIZE} points, got {}", v.len()))?;

        let board = Self(counts);

        if !board.is_valid() {
            return Err(format!("more than 15 checkers a side in '{s}'"));
        }

        Ok(board)
    }
}

/// Outcome probabilities: win, gammon win, backgammon win, gammon loss,
/// backgammon loss.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Probs(pub [f32; 5]);

impl Probs {
    pub fn new(p: [f32; 5]) -> Self {
        Self(p)
    }

    /// Cubeless money equity. Defined for any five reals.
    pub fn equity(&self) -> f32 {
        let [p0, p1, p2, p3, p4] = self.0;
        2.0 * p0 - 1.0 + p1 + p2 - p3 - p4
    }

    /// Weighted L1 distance, the win probability counting twice.
    pub fn eq_error(&self, other: &Self) -> f32 {
        let d: [f32; 5] = std::array::from_fn(|i| (self.0[i] - other.0[i]).abs());
        2.0 * d[0] + d[1] + d[2] + d[3] + d[4]
    }

    /// `(1 - a) * self + a * other`.
    pub fn blend(&self, other: &Self, a: f32) -> Self {
        let mut p = [0.0; 5];
        for (i, x) in p.iter_mut().enumerate() {
            *x = self.0[i] * (1.0 - a) + a * other.0[i];
        }
        Self(p)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self(self.0.map(|x| x * factor))
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut p = self.0;
        for (x, y) in p.iter_mut().zip(other.0) {
            *x += y;
        }
        Self(p)
    }

    pub fn formatted(&self, precision: usize, factor: f32) -> String {
        self.0.iter().map(|x| format!("{:.*}", precision, factor * x)).collect::<Vec<_>>().join(" ")
    }

    pub fn percentages(&self) -> String {
        self.0.iter().map(|x| format!("{:5.2}", 100.0 * x)).collect::<Vec<_>>().join(" ")
    }

    pub fn formatted_equity(&self) -> String {
        format!("{:.4} ({})", self.equity(), self.percentages())
    }
}

impl FromStr for Probs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        Self::from_fields(&fields)
    }
}

impl Probs {
    pub fn from_fields(fields: &[&str]) -> Result<Self, String> {
        if fields.len() != 5 {
            return Err(format!("expected 5 probabilities, got {}", fields.len()));
        }

        let mut p = [0.0; 5];
        for (x, field) in p.iter_mut().zip(fields) {
            *x = field.parse::<f32>().map_err(|e| format!("bad probability '{field}': {e}"))?;
        }

        Ok(Self(p))
    }
}
