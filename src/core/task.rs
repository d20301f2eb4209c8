use crate::context::Session;
use crate::core::db::{Storer, TaskCommon};
use crate::core::required;
use crate::error::Error;
use crate::models::task::{Insert as TaskInsert, Status, Task};

/// Society-wide task without a source complaint or flat.
pub async fn create_common_task<S>(store: &mut S, session: &Session, issue: &str, assigned_to: &str) -> Result<i32, Error>
where
    S: Storer,
{
    session.require_admin()?;
    let issue = required("task description", issue)?;
    let assigned_to = required("assignee", assigned_to)?;
    TaskCommon::insert(
        store,
        TaskInsert {
            flat_no: None,
            issue,
            assigned_to,
            due_date: None,
            source_complaint_id: None,
            is_common: true,
        },
    )
    .await
}

pub async fn assigned_tasks<S>(store: &mut S, session: &Session) -> Result<Vec<Task>, Error>
where
    S: Storer,
{
    let username = session.staff_username()?;
    TaskCommon::assigned_to(store, username).await
}

pub async fn common_tasks<S>(store: &mut S, session: &Session) -> Result<Vec<Task>, Error>
where
    S: Storer,
{
    session.require_staff_or_admin()?;
    TaskCommon::common(store).await
}

pub async fn update_status<S>(store: &mut S, session: &Session, task_id: i32, status: Status) -> Result<(), Error>
where
    S: Storer,
{
    session.require_staff_or_admin()?;
    let n = TaskCommon::set_status(store, task_id, status.as_str()).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("task {}", task_id)));
    }
    Ok(())
}

pub async fn remove_task<S>(store: &mut S, session: &Session, task_id: i32) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = TaskCommon::delete(store, task_id).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("task {}", task_id)));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::StaffRole;
    use crate::core::mock::Mem;

    fn admin() -> Session {
        Session::Admin { username: "admin".into() }
    }

    fn maintenance() -> Session {
        Session::Staff {
            username: "maintenance1".into(),
            role: StaffRole::Maintenance,
        }
    }

    #[tokio::test]
    async fn common_task_lifecycle() {
        let mem = Mem::new();
        let mut store = mem.store();
        let id = create_common_task(&mut store, &admin(), "repaint lobby", "maintenance1")
            .await
            .unwrap();

        let listed = common_tasks(&mut store, &maintenance()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_common);
        assert_eq!(listed[0].flat_no, None);

        let mine = assigned_tasks(&mut store, &maintenance()).await.unwrap();
        assert_eq!(mine.len(), 1);

        update_status(&mut store, &maintenance(), id, Status::Completed).await.unwrap();
        assert_eq!(mem.state().tasks[0].status, Status::Completed.as_str());

        remove_task(&mut store, &admin(), id).await.unwrap();
        assert!(mem.state().tasks.is_empty());
    }

    #[tokio::test]
    async fn task_operations_are_role_gated() {
        let mem = Mem::new();
        let mut store = mem.store();
        assert!(matches!(
            create_common_task(&mut store, &maintenance(), "repaint lobby", "maintenance1")
                .await
                .unwrap_err(),
            Error::Unauthorized(_)
        ));
        let id = create_common_task(&mut store, &admin(), "repaint lobby", "maintenance1")
            .await
            .unwrap();
        // only the admin removes tasks
        assert!(matches!(
            remove_task(&mut store, &maintenance(), id).await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            update_status(&mut store, &maintenance(), 999, Status::InProgress)
                .await
                .unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
