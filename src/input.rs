use std::fmt;
use std::str::FromStr;

/// Value written into the input register once per frame.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[repr(u8)]
pub enum Direction {
    #[default]
    None = 0,
    Up = 1,
    Left = 2,
    Down = 3,
    Right = 4,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Direction::None),
            "up" => Ok(Direction::Up),
            "left" => Ok(Direction::Left),
            "down" => Ok(Direction::Down),
            "right" => Ok(Direction::Right),
            _ => Err(format!(
                "unknown direction `{s}`, expected one of none, up, left, down, right"
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Left => "left",
            Direction::Down => "down",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Arrow keys currently pressed. Any combination may be held at once.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct HeldKeys {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

impl HeldKeys {
    /// Collapse to a single direction: down, then left, then up, then right.
    pub fn direction(self) -> Direction {
        if self.down {
            Direction::Down
        } else if self.left {
            Direction::Left
        } else if self.up {
            Direction::Up
        } else if self.right {
            Direction::Right
        } else {
            Direction::None
        }
    }

    pub fn hold(&mut self, direction: Direction) {
        match direction {
            Direction::None => (),
            Direction::Up => self.up = true,
            Direction::Left => self.left = true,
            Direction::Down => self.down = true,
            Direction::Right => self.right = true,
        }
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }
}

impl FromIterator<Direction> for HeldKeys {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut keys = HeldKeys::default();
        for direction in iter {
            keys.hold(direction);
        }
        keys
    }
}
