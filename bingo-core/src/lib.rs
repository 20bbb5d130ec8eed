mod board;
mod game;

pub use board::BingoBoard;
pub use game::{BingoFinishedGame, BingoGame, BingoOngoingGame};

pub const MIN_BOARD_SIZE: u32 = 3;
pub const MAX_BOARD_SIZE: u32 = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BingoSettings {
    pub board_size: u32,
    pub lines_to_win: u32,
}

impl BingoSettings {
    pub fn is_valid(&self) -> bool {
        self.board_size >= MIN_BOARD_SIZE
            && self.board_size <= MAX_BOARD_SIZE
            && self.lines_to_win >= 1
            && self.lines_to_win <= self.max_lines()
    }

    /// Rows, columns and both diagonals.
    pub fn max_lines(&self) -> u32 {
        self.board_size * 2 + 2
    }

    pub fn cell_count(&self) -> usize {
        (self.board_size * self.board_size) as usize
    }
}

impl Default for BingoSettings {
    fn default() -> Self {
        BingoSettings {
            board_size: 5,
            lines_to_win: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BingoPlayer {
    First,
    Second,
}

impl BingoPlayer {
    pub fn opponent(&self) -> BingoPlayer {
        match self {
            BingoPlayer::First => BingoPlayer::Second,
            BingoPlayer::Second => BingoPlayer::First,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BingoAction {
    Call(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BingoGameResult {
    Win {
        winner: BingoPlayer,
        reason: BingoWinReason,
    },
    Draw,
}

impl BingoGameResult {
    pub fn winner(&self) -> Option<BingoPlayer> {
        match self {
            BingoGameResult::Win { winner, .. } => Some(*winner),
            BingoGameResult::Draw => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BingoWinReason {
    Lines,
    Resignation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidBoardReason {
    InvalidSettings,
    WrongLength { expected: usize, actual: usize },
    OutOfRange(u32),
    Duplicate(u32),
}

impl std::fmt::Display for InvalidBoardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidBoardReason::InvalidSettings => write!(f, "invalid board settings"),
            InvalidBoardReason::WrongLength { expected, actual } => {
                write!(f, "expected {} numbers, got {}", expected, actual)
            }
            InvalidBoardReason::OutOfRange(n) => write!(f, "number {} is out of range", n),
            InvalidBoardReason::Duplicate(n) => write!(f, "number {} appears twice", n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidActionReason {
    NumberOutOfRange(u32),
    NumberAlreadyCalled(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DoActionError {
    NotYourTurn,
    InvalidAction(InvalidActionReason),
}

impl std::fmt::Display for DoActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoActionError::NotYourTurn => write!(f, "not your turn"),
            DoActionError::InvalidAction(InvalidActionReason::NumberOutOfRange(n)) => {
                write!(f, "number {} is out of range", n)
            }
            DoActionError::InvalidAction(InvalidActionReason::NumberAlreadyCalled(n)) => {
                write!(f, "number {} was already called", n)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayError {
    InvalidSettings,
    InvalidCall { index: usize, error: DoActionError },
    EndedEarly { index: usize },
}
