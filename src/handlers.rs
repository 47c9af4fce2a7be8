pub mod auth;
pub mod health;
pub mod news;
pub mod players;
pub mod teams;
pub mod users;

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use tracing::trace;

use crate::error::Result;
use crate::extract::PageParams;
use crate::schemas::Pagination;

/// Runs `select` either in full or for the requested page.
pub(crate) async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    params: &PageParams,
) -> Result<(Vec<E::Model>, Option<Pagination>)>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let Some((page, limit)) = params.requested() else {
        return Ok((select.all(db).await?, None));
    };

    trace!("Fetching page {} with limit {}", page, limit);
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;
    Ok((items, Some(Pagination::new(page, limit, total))))
}
