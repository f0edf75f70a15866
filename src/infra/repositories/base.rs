//! Query helpers shared by every repository.
//!
//! Each repository keeps its queries as free functions generic over
//! `ConnectionTrait`, so the same code runs against the pool (the `*Store`
//! types) and inside a transaction (the `Tx*` repositories).

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};

use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

/// Fetch one page of `select` plus the total row count
pub(crate) async fn fetch_page<C, E>(
    conn: &C,
    select: Select<E>,
    params: &PaginationParams,
) -> AppResult<(Vec<E::Model>, u64)>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let paginator = select.paginate(conn, params.limit());
    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(params.page() - 1).await?;
    Ok((data, total))
}

/// Convert rows into domain values, failing on the first corrupt row
pub(crate) fn into_domain<M, T>(models: Vec<M>) -> AppResult<Vec<T>>
where
    T: TryFrom<M, Error = AppError>,
{
    models.into_iter().map(T::try_from).collect()
}

/// Convert an optional row
pub(crate) fn opt_into_domain<M, T>(model: Option<M>) -> AppResult<Option<T>>
where
    T: TryFrom<M, Error = AppError>,
{
    model.map(T::try_from).transpose()
}

/// Map a page of rows into domain values
pub(crate) fn page_into_domain<M, T>(page: (Vec<M>, u64)) -> AppResult<(Vec<T>, u64)>
where
    T: TryFrom<M, Error = AppError>,
{
    let (models, total) = page;
    Ok((into_domain(models)?, total))
}

/// Turn a database unique-violation into a Conflict for `entity`
pub(crate) fn unique_violation(entity: &str) -> impl Fn(sea_orm::DbErr) -> AppError + '_ {
    move |e| match e.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(entity),
        _ => AppError::from(e),
    }
}
