use std::collections::HashSet;

use crate::{
    BingoAction, BingoGameResult, BingoPlayer, BingoSettings, BingoWinReason, DoActionError,
    InvalidActionReason, InvalidBoardReason, ReplayError, board::BingoBoard,
};

#[derive(Clone, Debug)]
pub struct BingoOngoingGame {
    settings: BingoSettings,
    boards: (BingoBoard, BingoBoard),
    current_player: BingoPlayer,
    called: Vec<u32>,
    called_set: HashSet<u32>,
}

#[derive(Clone, Debug)]
pub struct BingoFinishedGame {
    settings: BingoSettings,
    boards: (BingoBoard, BingoBoard),
    called: Vec<u32>,
    called_set: HashSet<u32>,
    result: BingoGameResult,
}

#[derive(Clone, Debug)]
pub enum BingoGame {
    Ongoing(BingoOngoingGame),
    Finished(BingoFinishedGame),
}

impl BingoOngoingGame {
    pub fn new(
        settings: BingoSettings,
        first_board: BingoBoard,
        second_board: BingoBoard,
        starting_player: BingoPlayer,
    ) -> Result<Self, InvalidBoardReason> {
        if !settings.is_valid()
            || first_board.size() != settings.board_size
            || second_board.size() != settings.board_size
        {
            return Err(InvalidBoardReason::InvalidSettings);
        }
        Ok(BingoOngoingGame {
            settings,
            boards: (first_board, second_board),
            current_player: starting_player,
            called: Vec::new(),
            called_set: HashSet::new(),
        })
    }

    /// Rebuilds a game from an ordered list of `(caller, number)` calls.
    pub fn replay(
        settings: BingoSettings,
        first_board: BingoBoard,
        second_board: BingoBoard,
        starting_player: BingoPlayer,
        calls: &[(BingoPlayer, u32)],
    ) -> Result<BingoGame, ReplayError> {
        let mut game = BingoGame::Ongoing(
            Self::new(settings, first_board, second_board, starting_player)
                .map_err(|_| ReplayError::InvalidSettings)?,
        );
        for (index, (player, number)) in calls.iter().enumerate() {
            let BingoGame::Ongoing(ongoing) = &game else {
                return Err(ReplayError::EndedEarly { index });
            };
            game = ongoing
                .do_action(*player, BingoAction::Call(*number))
                .map_err(|error| ReplayError::InvalidCall { index, error })?;
        }
        Ok(game)
    }

    pub fn settings(&self) -> &BingoSettings {
        &self.settings
    }

    pub fn current_player(&self) -> BingoPlayer {
        self.current_player
    }

    pub fn called_numbers(&self) -> &[u32] {
        &self.called
    }

    pub fn board_of(&self, player: BingoPlayer) -> &BingoBoard {
        match player {
            BingoPlayer::First => &self.boards.0,
            BingoPlayer::Second => &self.boards.1,
        }
    }

    pub fn lines_of(&self, player: BingoPlayer) -> u32 {
        self.board_of(player).completed_lines(&self.called_set)
    }

    pub fn can_do_action(
        &self,
        player: BingoPlayer,
        action: &BingoAction,
    ) -> Result<(), DoActionError> {
        if player != self.current_player {
            return Err(DoActionError::NotYourTurn);
        }
        match action {
            BingoAction::Call(number) => {
                if *number == 0 || *number as usize > self.settings.cell_count() {
                    return Err(DoActionError::InvalidAction(
                        InvalidActionReason::NumberOutOfRange(*number),
                    ));
                }
                if self.called_set.contains(number) {
                    return Err(DoActionError::InvalidAction(
                        InvalidActionReason::NumberAlreadyCalled(*number),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn do_action(
        &self,
        player: BingoPlayer,
        action: BingoAction,
    ) -> Result<BingoGame, DoActionError> {
        self.can_do_action(player, &action)?;
        let mut new_state = self.clone();
        match action {
            BingoAction::Call(number) => {
                new_state.called.push(number);
                new_state.called_set.insert(number);
            }
        }

        match new_state.check_game_over() {
            Some(result) => Ok(BingoGame::Finished(new_state.finish(result))),
            None => {
                new_state.current_player = new_state.current_player.opponent();
                Ok(BingoGame::Ongoing(new_state))
            }
        }
    }

    pub fn resign(&self, player: BingoPlayer) -> BingoFinishedGame {
        self.clone().finish(BingoGameResult::Win {
            winner: player.opponent(),
            reason: BingoWinReason::Resignation,
        })
    }

    fn check_game_over(&self) -> Option<BingoGameResult> {
        let target = self.settings.lines_to_win;
        let first_done = self.lines_of(BingoPlayer::First) >= target;
        let second_done = self.lines_of(BingoPlayer::Second) >= target;
        match (first_done, second_done) {
            (true, true) => Some(BingoGameResult::Draw),
            (true, false) => Some(BingoGameResult::Win {
                winner: BingoPlayer::First,
                reason: BingoWinReason::Lines,
            }),
            (false, true) => Some(BingoGameResult::Win {
                winner: BingoPlayer::Second,
                reason: BingoWinReason::Lines,
            }),
            (false, false) => None,
        }
    }

    fn finish(self, result: BingoGameResult) -> BingoFinishedGame {
        BingoFinishedGame {
            settings: self.settings,
            boards: self.boards,
            called: self.called,
            called_set: self.called_set,
            result,
        }
    }
}

impl BingoFinishedGame {
    pub fn result(&self) -> &BingoGameResult {
        &self.result
    }

    pub fn settings(&self) -> &BingoSettings {
        &self.settings
    }

    pub fn called_numbers(&self) -> &[u32] {
        &self.called
    }

    pub fn lines_of(&self, player: BingoPlayer) -> u32 {
        let board = match player {
            BingoPlayer::First => &self.boards.0,
            BingoPlayer::Second => &self.boards.1,
        };
        board.completed_lines(&self.called_set)
    }
}

impl BingoGame {
    pub fn called_numbers(&self) -> &[u32] {
        match self {
            BingoGame::Ongoing(game) => game.called_numbers(),
            BingoGame::Finished(game) => game.called_numbers(),
        }
    }

    pub fn lines_of(&self, player: BingoPlayer) -> u32 {
        match self {
            BingoGame::Ongoing(game) => game.lines_of(player),
            BingoGame::Finished(game) => game.lines_of(player),
        }
    }
}
