use bingo_persistence_sea_orm::{create_db_pool, create_schema};
use sea_orm::DbErr;

#[tokio::main]
async fn main() -> Result<(), DbErr> {
    dotenvy::dotenv().ok();

    let pool = create_db_pool().await?;
    create_schema(&pool).await?;

    println!("Created database tables successfully");
    Ok(())
}
