use chrono::{Local, NaiveDate};

use crate::context::Session;
use crate::core::db::{ComplaintCommon, Storer, TaskCommon, TxStorer};
use crate::core::required;
use crate::error::Error;
use crate::models::complaint::{Complaint, Insert as ComplaintInsert, Status};
use crate::models::task::Insert as TaskInsert;

/// Residents may only complain about their own flat, and only for today.
pub async fn raise_complaint<S>(
    store: &mut S,
    session: &Session,
    flat_no: &str,
    category: &str,
    description: &str,
    date: NaiveDate,
) -> Result<i32, Error>
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
    let category = required("category", category)?;
    let description = required("description", description)?;
    let today = Local::now().date_naive();
    if date != today {
        return Err(Error::Validation(format!("complaint date must be today ({})", today)));
    }
    ComplaintCommon::insert(
        store,
        ComplaintInsert {
            flat_no: session_flat.to_owned(),
            category,
            description,
            date,
        },
    )
    .await
}

pub async fn my_complaints<S>(store: &mut S, session: &Session) -> Result<Vec<Complaint>, Error>
where
    S: Storer,
{
    let flat_no = session.flat_no()?;
    ComplaintCommon::by_flat(store, flat_no).await
}

pub async fn complaints_on<S>(store: &mut S, session: &Session, date: NaiveDate) -> Result<Vec<Complaint>, Error>
where
    S: Storer,
{
    session.require_staff_or_admin()?;
    ComplaintCommon::on_date(store, date).await
}

pub async fn all_complaints<S>(store: &mut S, session: &Session) -> Result<Vec<Complaint>, Error>
where
    S: Storer,
{
    session.require_admin()?;
    ComplaintCommon::all(store).await
}

/// Creates the maintenance task and flips the complaint to Assigned in one
/// transaction; neither write lands without the other.
pub async fn assign<T>(
    mut tx: T,
    session: &Session,
    complaint_id: i32,
    assigned_to: &str,
    due_date: Option<NaiveDate>,
) -> Result<i32, Error>
where
    T: TxStorer,
{
    session.require_admin()?;
    let assigned_to = required("assignee", assigned_to)?;
    let complaint = ComplaintCommon::get(&mut tx, complaint_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("complaint {}", complaint_id)))?;
    let task_id = TaskCommon::insert(
        &mut tx,
        TaskInsert {
            flat_no: Some(complaint.flat_no.clone()),
            issue: complaint.description.clone(),
            assigned_to,
            due_date,
            source_complaint_id: Some(complaint.id),
            is_common: false,
        },
    )
    .await?;
    ComplaintCommon::set_status(&mut tx, complaint.id, Status::Assigned.as_str()).await?;
    tx.commit().await?;
    Ok(task_id)
}

pub async fn update_status<S>(store: &mut S, session: &Session, complaint_id: i32, status: Status) -> Result<(), Error>
where
    S: Storer,
{
    session.require_staff_or_admin()?;
    let n = ComplaintCommon::set_status(store, complaint_id, status.as_str()).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("complaint {}", complaint_id)));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::StaffRole;
    use crate::core::mock::{resident_session, Mem};
    use chrono::Duration;

    fn admin() -> Session {
        Session::Admin { username: "admin".into() }
    }

    #[tokio::test]
    async fn complaint_must_be_for_own_flat() {
        let mem = Mem::new();
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        let err = raise_complaint(&mut store, &session, "B-202", "plumbing", "leaking tap", today)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert!(mem.state().complaints.is_empty());
    }

    #[tokio::test]
    async fn complaint_date_must_be_today() {
        let mem = Mem::new();
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();

        for date in [today - Duration::days(1), today + Duration::days(1)] {
            let err = raise_complaint(&mut store, &session, "A-101", "plumbing", "leaking tap", date)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(mem.state().complaints.is_empty());

        let id = raise_complaint(&mut store, &session, "A-101", "plumbing", "leaking tap", today)
            .await
            .unwrap();
        let stored = &mem.state().complaints[0];
        assert_eq!(stored.id, id);
        assert_eq!(stored.status, Status::Pending.as_str());
    }

    #[tokio::test]
    async fn assignment_writes_task_and_status_together() {
        let mem = Mem::new();
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        let complaint_id = raise_complaint(&mut store, &session, "A-101", "electrical", "socket sparks", today)
            .await
            .unwrap();

        let due = today + Duration::days(3);
        let task_id = assign(mem.tx(), &admin(), complaint_id, "maintenance1", Some(due))
            .await
            .unwrap();

        let state = mem.state();
        let task = state.tasks.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(task.source_complaint_id, Some(complaint_id));
        assert_eq!(task.status, crate::models::task::Status::Pending.as_str());
        assert_eq!(task.flat_no.as_deref(), Some("A-101"));
        assert_eq!(task.due_date, Some(due));
        assert_eq!(state.complaints[0].status, Status::Assigned.as_str());
    }

    #[tokio::test]
    async fn failed_assignment_leaves_no_partial_writes() {
        let mem = Mem::new();
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        raise_complaint(&mut store, &session, "A-101", "electrical", "socket sparks", today)
            .await
            .unwrap();

        // unknown complaint id aborts before commit
        let err = assign(mem.tx(), &admin(), 999, "maintenance1", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let state = mem.state();
        assert!(state.tasks.is_empty());
        assert_eq!(state.complaints[0].status, Status::Pending.as_str());
    }

    #[tokio::test]
    async fn uncommitted_transaction_is_invisible() {
        let mem = Mem::new();
        let mut tx = mem.tx();
        TaskCommon::insert(
            &mut tx,
            TaskInsert {
                flat_no: Some("A-101".into()),
                issue: "test".into(),
                assigned_to: "maintenance1".into(),
                due_date: None,
                source_complaint_id: None,
                is_common: false,
            },
        )
        .await
        .unwrap();
        drop(tx);
        assert!(mem.state().tasks.is_empty());
    }

    #[tokio::test]
    async fn staff_updates_complaint_status() {
        let mem = Mem::new();
        let mut store = mem.store();
        let session = resident_session("A-101");
        let today = Local::now().date_naive();
        let id = raise_complaint(&mut store, &session, "A-101", "plumbing", "leaking tap", today)
            .await
            .unwrap();

        let staff = Session::Staff {
            username: "maintenance1".into(),
            role: StaffRole::Maintenance,
        };
        update_status(&mut store, &staff, id, Status::Resolved).await.unwrap();
        let state = mem.state();
        assert_eq!(state.complaints[0].status, Status::Resolved.as_str());
        assert!(state.complaints[0].updated_at.is_some());

        // residents may not drive the lifecycle
        assert!(matches!(
            update_status(&mut store, &session, id, Status::InProgress).await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            update_status(&mut store, &staff, 999, Status::Resolved).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
