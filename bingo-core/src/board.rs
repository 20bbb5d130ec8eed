use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::{BingoSettings, InvalidBoardReason, MAX_BOARD_SIZE, MIN_BOARD_SIZE};

/// A square grid of numbers stored row by row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BingoBoard {
    size: u32,
    numbers: Vec<u32>,
}

impl BingoBoard {
    pub fn new(size: u32, numbers: Vec<u32>) -> Result<Self, InvalidBoardReason> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(InvalidBoardReason::InvalidSettings);
        }
        let expected = (size * size) as usize;
        if numbers.len() != expected {
            return Err(InvalidBoardReason::WrongLength {
                expected,
                actual: numbers.len(),
            });
        }
        let mut seen = HashSet::with_capacity(expected);
        for &n in &numbers {
            if n == 0 || n as usize > expected {
                return Err(InvalidBoardReason::OutOfRange(n));
            }
            if !seen.insert(n) {
                return Err(InvalidBoardReason::Duplicate(n));
            }
        }
        Ok(BingoBoard { size, numbers })
    }

    pub fn for_settings(
        settings: &BingoSettings,
        numbers: Vec<u32>,
    ) -> Result<Self, InvalidBoardReason> {
        if !settings.is_valid() {
            return Err(InvalidBoardReason::InvalidSettings);
        }
        Self::new(settings.board_size, numbers)
    }

    /// Deals a shuffled board. Sizes outside the supported range are clamped.
    pub fn random(size: u32) -> Self {
        let size = size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        let mut numbers: Vec<u32> = (1..=size * size).collect();
        numbers.shuffle(&mut rand::rng());
        BingoBoard { size, numbers }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn into_numbers(self) -> Vec<u32> {
        self.numbers
    }

    pub fn number_at(&self, row: u32, col: u32) -> Option<u32> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.numbers.get((row * self.size + col) as usize).copied()
    }

    pub fn contains(&self, number: u32) -> bool {
        number >= 1 && number as usize <= self.numbers.len()
    }

    pub fn completed_lines(&self, called: &HashSet<u32>) -> u32 {
        let n = self.size;
        let is_marked = |row: u32, col: u32| {
            self.number_at(row, col)
                .is_some_and(|number| called.contains(&number))
        };

        let rows = (0..n)
            .filter(|&row| (0..n).all(|col| is_marked(row, col)))
            .count();
        let cols = (0..n)
            .filter(|&col| (0..n).all(|row| is_marked(row, col)))
            .count();
        let main_diagonal = (0..n).all(|i| is_marked(i, i));
        let anti_diagonal = (0..n).all(|i| is_marked(i, n - 1 - i));

        rows as u32 + cols as u32 + main_diagonal as u32 + anti_diagonal as u32
    }
}
