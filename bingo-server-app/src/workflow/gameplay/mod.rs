use std::collections::HashSet;

use bingo_core::{BingoBoard, BingoGame, BingoOngoingGame, BingoPlayer, BingoSettings};

use crate::{
    domain::{
        UserId,
        r#match::{Board, Match, MatchRepository, Move},
    },
    workflow::account::PublicProfile,
};

pub mod call_number;
pub mod get;
pub mod list;
pub mod resign;
pub mod submit_board;

#[derive(Clone, Debug)]
pub struct MatchView {
    pub summary: Match,
    pub player1: PublicProfile,
    pub player2: PublicProfile,
    pub own_board: Option<Vec<u32>>,
    /// Revealed once the match is over.
    pub opponent_board: Option<Vec<u32>>,
    pub moves: Vec<Move>,
    pub player1_lines: u32,
    pub player2_lines: u32,
}

fn board_for(boards: &[Board], user_id: UserId) -> Option<&Board> {
    boards.iter().find(|b| b.user_id == user_id)
}

fn completed_lines(settings: &BingoSettings, board: Option<&Board>, called: &HashSet<u32>) -> u32 {
    board
        .and_then(|b| BingoBoard::for_settings(settings, b.numbers.clone()).ok())
        .map(|b| b.completed_lines(called))
        .unwrap_or(0)
}

/// Rebuilds the engine state of an in-progress match from its stored boards
/// and moves.
async fn load_game<M: MatchRepository + Sync>(
    match_repository: &M,
    settings: &BingoSettings,
    current: &Match,
) -> Result<BingoGame, String> {
    let boards = match_repository
        .get_boards(current.id)
        .await
        .map_err(|e| e.to_string())?;
    let moves = match_repository
        .get_moves(current.id)
        .await
        .map_err(|e| e.to_string())?;

    let mut dealt = Vec::with_capacity(2);
    for user_id in [current.player1_id, current.player2_id] {
        let board = board_for(&boards, user_id)
            .ok_or_else(|| format!("match {} is missing the board of {}", current.id, user_id))?;
        let board = BingoBoard::for_settings(settings, board.numbers.clone())
            .map_err(|e| format!("stored board of {} is invalid: {}", user_id, e))?;
        dealt.push(board);
    }
    let second_board = dealt.pop();
    let first_board = dealt.pop();
    let (Some(first_board), Some(second_board)) = (first_board, second_board) else {
        return Err(format!("match {} is missing boards", current.id));
    };

    let starter = moves
        .first()
        .map(|mv| mv.chosen_by_user_id)
        .or(current.current_turn_user_id)
        .and_then(|user_id| current.player_of(user_id))
        .ok_or_else(|| format!("match {} has no starting player", current.id))?;

    let mut calls: Vec<(BingoPlayer, u32)> = Vec::with_capacity(moves.len());
    for mv in &moves {
        let player = current
            .player_of(mv.chosen_by_user_id)
            .ok_or_else(|| format!("move {} was made by an outsider", mv.id))?;
        calls.push((player, mv.number));
    }

    BingoOngoingGame::replay(
        settings.clone(),
        first_board,
        second_board,
        starter,
        &calls,
    )
    .map_err(|e| format!("match {} does not replay: {:?}", current.id, e))
}
