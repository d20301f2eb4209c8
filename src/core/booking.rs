use chrono::{Local, NaiveDate};

use crate::context::Session;
use crate::core::db::{AmenityCommon, BookingCommon, Storer};
use crate::core::required;
use crate::error::Error;
use crate::models::booking::{Amenity, Booking, Decision, Insert as BookingInsert};

pub async fn list_amenities<S>(store: &mut S) -> Result<Vec<Amenity>, Error>
where
    S: Storer,
{
    AmenityCommon::list(store).await
}

/// Booking requests for past dates are rejected; today is allowed.
pub async fn book<S>(store: &mut S, session: &Session, amenity: &str, date: NaiveDate, time: &str) -> Result<i32, Error>
where
    S: Storer,
{
    let resident_id = session.resident_id()?;
    let amenity = required("amenity", amenity)?;
    let time = required("time", time)?;
    let today = Local::now().date_naive();
    if date < today {
        return Err(Error::Validation("that date has already passed, choose today or a future date".into()));
    }
    let known = AmenityCommon::list(store).await?;
    // store the canonical amenity name regardless of the caller's casing
    let amenity = known
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(&amenity))
        .map(|a| a.name.clone())
        .ok_or_else(|| Error::NotFound(format!("amenity {}", amenity)))?;
    BookingCommon::insert(
        store,
        BookingInsert {
            resident_id: resident_id.to_owned(),
            amenity,
            date,
            time,
        },
    )
    .await
}

pub async fn my_bookings<S>(store: &mut S, session: &Session) -> Result<Vec<Booking>, Error>
where
    S: Storer,
{
    let resident_id = session.resident_id()?;
    BookingCommon::by_resident(store, resident_id).await
}

pub async fn pending_bookings<S>(store: &mut S, session: &Session) -> Result<Vec<Booking>, Error>
where
    S: Storer,
{
    session.require_admin()?;
    BookingCommon::pending(store).await
}

/// One-shot decision: the guarded update only moves bookings out of
/// `pending`, so re-deciding is a conflict rather than a silent overwrite.
pub async fn decide<S>(store: &mut S, session: &Session, booking_id: i32, decision: Decision) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = BookingCommon::decide(store, booking_id, decision.as_str()).await?;
    if n == 0 {
        return match BookingCommon::get(store, booking_id).await? {
            Some(b) => Err(Error::Conflict(format!("booking {} was already {}", booking_id, b.status))),
            None => Err(Error::NotFound(format!("booking {}", booking_id))),
        };
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::mock::{resident_session, Mem};
    use chrono::Duration;

    fn admin() -> Session {
        Session::Admin { username: "admin".into() }
    }

    async fn seeded() -> Mem {
        let mem = Mem::new();
        let mut store = mem.store();
        for name in ["Clubhouse", "Tennis Court", "Gym"] {
            AmenityCommon::upsert(&mut store, name).await.unwrap();
        }
        mem
    }

    #[tokio::test]
    async fn past_date_is_rejected_and_nothing_is_stored() {
        let mem = seeded().await;
        let mut store = mem.store();
        let session = resident_session("A-101");
        let yesterday = Local::now().date_naive() - Duration::days(1);
        let err = book(&mut store, &session, "Gym", yesterday, "17:00").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(mem.state().bookings.is_empty());
    }

    #[tokio::test]
    async fn booking_today_or_later_starts_pending() {
        let mem = seeded().await;
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        let id = book(&mut store, &session, "Gym", today, "17:00").await.unwrap();
        let state = mem.state();
        assert_eq!(state.bookings[0].id, id);
        assert_eq!(state.bookings[0].status, "pending");

        let mine = my_bookings(&mut store, &session).await.unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn unknown_amenity_is_rejected() {
        let mem = seeded().await;
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        let err = book(&mut store, &session, "Sauna", today, "17:00").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn decision_is_one_shot() {
        let mem = seeded().await;
        let mut store = mem.store();
        let session = resident_session("A-101");
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let id = book(&mut store, &session, "Clubhouse", tomorrow, "5PM").await.unwrap();

        decide(&mut store, &admin(), id, Decision::Approved).await.unwrap();
        assert_eq!(mem.state().bookings[0].status, "approved");

        // second decision fails and leaves the first in place
        let err = decide(&mut store, &admin(), id, Decision::Rejected).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(mem.state().bookings[0].status, "approved");

        assert!(matches!(
            decide(&mut store, &admin(), 999, Decision::Approved).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn pending_listing_is_admin_only() {
        let mem = seeded().await;
        let mut store = mem.store();
        let session = resident_session("A-101");
        assert!(matches!(
            pending_bookings(&mut store, &session).await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(pending_bookings(&mut store, &admin()).await.unwrap().is_empty());
    }
}
