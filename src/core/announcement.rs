use crate::context::Session;
use crate::core::db::{AnnouncementCommon, Storer};
use crate::core::required;
use crate::error::Error;
use crate::models::announcement::Announcement;

pub async fn post<S>(store: &mut S, session: &Session, message: &str) -> Result<i32, Error>
where
    S: Storer,
{
    session.require_admin()?;
    let message = required("message", message)?;
    AnnouncementCommon::insert(store, &message).await
}

/// Newest first; open to every authenticated account.
pub async fn list<S>(store: &mut S) -> Result<Vec<Announcement>, Error>
where
    S: Storer,
{
    AnnouncementCommon::list(store).await
}

pub async fn delete<S>(store: &mut S, session: &Session, id: i32) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = AnnouncementCommon::delete(store, id).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("announcement {}", id)));
    }
    Ok(())
}
