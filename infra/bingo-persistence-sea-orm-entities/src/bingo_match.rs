use chrono::Utc;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub status: String,
    pub current_turn_user_id: Option<Uuid>,
    pub winner_user_id: Option<Uuid>,
    pub created_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Player1Id",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Player1,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Player2Id",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Player2,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CurrentTurnUserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    CurrentTurnUser,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::WinnerUserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    WinnerUser,
    #[sea_orm(has_many = "super::board::Entity")]
    Board,
    #[sea_orm(has_many = "super::match_move::Entity")]
    Move,
}

impl Related<super::board::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl Related<super::match_move::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Move.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
