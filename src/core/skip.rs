use std::collections::HashSet;

use chrono::{Local, NaiveDate};

use crate::context::{Session, StaffRole};
use crate::core::db::{ResidentCommon, SkipCommon, Storer};
use crate::core::required;
use crate::error::Error;
use crate::models::resident::Resident;
use crate::models::skip::{Insert as SkipInsert, Skip};

/// Skips must be strictly in the future; today's delivery already went out.
pub async fn skip_delivery<S>(store: &mut S, session: &Session, flat_no: &str, item: &str, skip_date: NaiveDate) -> Result<(), Error>
where
    S: Storer,
{
    let session_flat = session.flat_no()?;
    if flat_no.trim() != session_flat {
        return Err(Error::Unauthorized(format!(
            "flat {} does not match the logged-in flat {}",
            flat_no.trim(),
            session_flat
        )));
    }
    let item = required("item", item)?.to_lowercase();
    let today = Local::now().date_naive();
    if skip_date <= today {
        return Err(Error::Validation("skip date must be a future date".into()));
    }
    SkipCommon::insert(
        store,
        SkipInsert {
            flat_no: session_flat.to_owned(),
            item,
            skip_date,
        },
    )
    .await
}

pub async fn skips_on<S>(store: &mut S, session: &Session, date: Option<NaiveDate>, item: &str) -> Result<Vec<Skip>, Error>
where
    S: Storer,
{
    session.require_role_or_admin(StaffRole::Delivery)?;
    let item = required("item", item)?.to_lowercase();
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    SkipCommon::on_date(store, date, &item).await
}

/// Today's delivery round: every approved resident whose flat has not
/// skipped the item today.
pub async fn delivery_list<S>(store: &mut S, session: &Session, item: &str) -> Result<Vec<Resident>, Error>
where
    S: Storer,
{
    session.require_role_or_admin(StaffRole::Delivery)?;
    let item = required("item", item)?.to_lowercase();
    let today = Local::now().date_naive();
    let skips = SkipCommon::on_date(store, today, &item).await?;
    let skipped: HashSet<&str> = skips.iter().map(|s| s.flat_no.as_str()).collect();
    let residents = ResidentCommon::approved(store).await?;
    Ok(residents.into_iter().filter(|r| !skipped.contains(r.flat_no.as_str())).collect())
}
