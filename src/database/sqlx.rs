use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, PgPool, Postgres, Transaction};

use crate::core::db::{
    AdminCommon, AmenityCommon, AnnouncementCommon, BookingCommon, Common, ComplaintCommon, PollCommon, ResidentCommon,
    SkipCommon, StaffCommon, Storer, TaskCommon, TxStorer,
};
use crate::error::Error;
use crate::models::announcement::Announcement;
use crate::models::booking::{self, Amenity, Booking, Insert as BookingInsert};
use crate::models::complaint::{Complaint, Insert as ComplaintInsert};
use crate::models::poll::{self, Insert as PollInsert, Poll};
use crate::models::resident::{Insert as ResidentInsert, Resident};
use crate::models::skip::{Insert as SkipInsert, Skip};
use crate::models::staff::{Admin, Insert as StaffInsert, Staff};
use crate::models::task::{Insert as TaskInsert, Task};

pub struct PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    executor: E,
}

impl<E> PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E> ResidentCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, resident_id: &str, data: ResidentInsert) -> Result<(), Error> {
        query(
            "INSERT INTO residents (resident_id, name, flat_no, phone, age, number_of_members, gender, designation, approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)",
        )
        .bind(resident_id)
        .bind(data.name)
        .bind(data.flat_no)
        .bind(data.phone)
        .bind(data.age)
        .bind(data.number_of_members)
        .bind(data.gender)
        .bind(data.designation)
        .execute(&mut self.executor)
        .await?;
        Ok(())
    }

    async fn get_by_flat(&mut self, flat_no: &str, resident_id: &str) -> Result<Option<Resident>, Error> {
        let resident = query_as("SELECT * FROM residents WHERE flat_no = $1 AND resident_id = $2")
            .bind(flat_no)
            .bind(resident_id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(resident)
    }

    async fn approve(&mut self, resident_id: &str) -> Result<u64, Error> {
        let res = query("UPDATE residents SET approved = TRUE WHERE resident_id = $1")
            .bind(resident_id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }

    async fn pending(&mut self) -> Result<Vec<Resident>, Error> {
        let residents = query_as("SELECT * FROM residents WHERE approved IS NOT TRUE ORDER BY flat_no")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(residents)
    }

    async fn approved(&mut self) -> Result<Vec<Resident>, Error> {
        let residents = query_as("SELECT * FROM residents WHERE approved = TRUE ORDER BY flat_no")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(residents)
    }
}

impl<E> StaffCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: StaffInsert) -> Result<(), Error> {
        query("INSERT INTO staff (username, password, salt, role, approved) VALUES ($1, $2, $3, $4, FALSE)")
            .bind(data.username)
            .bind(data.password)
            .bind(data.salt)
            .bind(data.role)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, username: &str) -> Result<Option<Staff>, Error> {
        let staff = query_as("SELECT * FROM staff WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(staff)
    }

    async fn approve(&mut self, username: &str) -> Result<u64, Error> {
        let res = query("UPDATE staff SET approved = TRUE WHERE username = $1")
            .bind(username)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }

    async fn pending(&mut self) -> Result<Vec<Staff>, Error> {
        let staff = query_as("SELECT * FROM staff WHERE approved IS NOT TRUE ORDER BY username")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(staff)
    }
}

impl<E> AdminCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn upsert(&mut self, username: &str, password: &str, salt: &str) -> Result<(), Error> {
        query(
            "INSERT INTO admins (username, password, salt) VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET password = EXCLUDED.password, salt = EXCLUDED.salt",
        )
        .bind(username)
        .bind(password)
        .bind(salt)
        .execute(&mut self.executor)
        .await?;
        Ok(())
    }

    async fn get(&mut self, username: &str) -> Result<Option<Admin>, Error> {
        let admin = query_as("SELECT * FROM admins WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(admin)
    }
}

impl<E> ComplaintCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: ComplaintInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO complaints (flat_no, category, description, date, status) VALUES ($1, $2, $3, $4, 'Pending') RETURNING id")
            .bind(data.flat_no)
            .bind(data.category)
            .bind(data.description)
            .bind(data.date)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Complaint>, Error> {
        let complaint = query_as("SELECT * FROM complaints WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(complaint)
    }

    async fn by_flat(&mut self, flat_no: &str) -> Result<Vec<Complaint>, Error> {
        let complaints = query_as("SELECT * FROM complaints WHERE flat_no = $1 ORDER BY date DESC, id DESC")
            .bind(flat_no)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(complaints)
    }

    async fn on_date(&mut self, date: NaiveDate) -> Result<Vec<Complaint>, Error> {
        let complaints = query_as("SELECT * FROM complaints WHERE date = $1 ORDER BY id")
            .bind(date)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(complaints)
    }

    async fn all(&mut self) -> Result<Vec<Complaint>, Error> {
        let complaints = query_as("SELECT * FROM complaints ORDER BY date DESC, id DESC")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(complaints)
    }

    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        let res = query("UPDATE complaints SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }
}

impl<E> TaskCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: TaskInsert) -> Result<i32, Error> {
        let id = query_scalar(
            "INSERT INTO maintenance_tasks (flat_no, issue, assigned_to, status, due_date, source_complaint_id, is_common)
            VALUES ($1, $2, $3, 'Pending', $4, $5, $6) RETURNING id",
        )
        .bind(data.flat_no)
        .bind(data.issue)
        .bind(data.assigned_to)
        .bind(data.due_date)
        .bind(data.source_complaint_id)
        .bind(data.is_common)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn assigned_to(&mut self, username: &str) -> Result<Vec<Task>, Error> {
        let tasks = query_as("SELECT * FROM maintenance_tasks WHERE assigned_to = $1 ORDER BY created_at DESC")
            .bind(username)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(tasks)
    }

    async fn common(&mut self) -> Result<Vec<Task>, Error> {
        let tasks = query_as("SELECT * FROM maintenance_tasks WHERE is_common = TRUE ORDER BY created_at DESC")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(tasks)
    }

    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        let res = query("UPDATE maintenance_tasks SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        let res = query("DELETE FROM maintenance_tasks WHERE id = $1")
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }
}

impl<E> AmenityCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn upsert(&mut self, name: &str) -> Result<(), Error> {
        query("INSERT INTO amenities (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn list(&mut self) -> Result<Vec<Amenity>, Error> {
        let amenities = query_as("SELECT * FROM amenities ORDER BY id")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(amenities)
    }
}

impl<E> BookingCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: BookingInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO amenity_bookings (resident_id, amenity, date, time, status) VALUES ($1, $2, $3, $4, 'pending') RETURNING id")
            .bind(data.resident_id)
            .bind(data.amenity)
            .bind(data.date)
            .bind(data.time)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Booking>, Error> {
        let booking = query_as("SELECT * FROM amenity_bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(booking)
    }

    async fn pending(&mut self) -> Result<Vec<Booking>, Error> {
        let bookings = query_as("SELECT * FROM amenity_bookings WHERE status = $1 ORDER BY date, id")
            .bind(booking::PENDING)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(bookings)
    }

    async fn by_resident(&mut self, resident_id: &str) -> Result<Vec<Booking>, Error> {
        let bookings = query_as("SELECT * FROM amenity_bookings WHERE resident_id = $1 ORDER BY date DESC, id DESC")
            .bind(resident_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(bookings)
    }

    async fn decide(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        // only ever moves a booking out of 'pending'; deciding twice matches 0 rows
        let res = query("UPDATE amenity_bookings SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(status)
            .bind(booking::PENDING)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }
}

impl<E> SkipCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: SkipInsert) -> Result<(), Error> {
        query("INSERT INTO skip_delivery (flat_no, item, skip_date) VALUES ($1, $2, $3)")
            .bind(data.flat_no)
            .bind(data.item)
            .bind(data.skip_date)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn on_date(&mut self, date: NaiveDate, item: &str) -> Result<Vec<Skip>, Error> {
        let skips = query_as("SELECT * FROM skip_delivery WHERE skip_date = $1 AND item = $2 ORDER BY flat_no")
            .bind(date)
            .bind(item)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(skips)
    }
}

impl<E> PollCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: PollInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO polls (question, options, status, votes) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(data.question)
            .bind(data.options)
            .bind(poll::OPEN)
            .bind(data.votes)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        let poll = query_as("SELECT * FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(poll)
    }

    async fn open(&mut self) -> Result<Vec<Poll>, Error> {
        let polls = query_as("SELECT * FROM polls WHERE status = $1 ORDER BY created_at DESC")
            .bind(poll::OPEN)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(polls)
    }

    async fn all(&mut self) -> Result<Vec<Poll>, Error> {
        let polls = query_as("SELECT * FROM polls ORDER BY created_at DESC")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(polls)
    }

    async fn close(&mut self, id: i32) -> Result<u64, Error> {
        let res = query("UPDATE polls SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(poll::CLOSED)
            .bind(poll::OPEN)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete_all(&mut self) -> Result<u64, Error> {
        let res = query("DELETE FROM polls").execute(&mut self.executor).await?;
        Ok(res.rows_affected())
    }

    async fn has_voted(&mut self, flat_no: &str, poll_id: i32) -> Result<bool, Error> {
        let voted = query_scalar("SELECT EXISTS(SELECT id FROM votes WHERE flat_no = $1 AND poll_id = $2)")
            .bind(flat_no)
            .bind(poll_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(voted)
    }

    async fn record_vote(&mut self, flat_no: &str, poll_id: i32) -> Result<(), Error> {
        query("INSERT INTO votes (flat_no, poll_id) VALUES ($1, $2)")
            .bind(flat_no)
            .bind(poll_id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn increment_tally(&mut self, poll_id: i32, option: &str) -> Result<u64, Error> {
        // the option lands in the statement as a bound parameter, both as the
        // jsonb path and as the lookup key
        let res = query(
            "UPDATE polls
            SET votes = jsonb_set(votes, ARRAY[$2], (COALESCE(votes ->> $2, '0')::int + 1)::text::jsonb)
            WHERE id = $1 AND status = $3",
        )
        .bind(poll_id)
        .bind(option)
        .bind(poll::OPEN)
        .execute(&mut self.executor)
        .await?;
        Ok(res.rows_affected())
    }

    async fn count_votes(&mut self, poll_id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM votes WHERE poll_id = $1")
            .bind(poll_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(n)
    }
}

impl<E> AnnouncementCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, message: &str) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO announcements (message) VALUES ($1) RETURNING id")
            .bind(message)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn list(&mut self) -> Result<Vec<Announcement>, Error> {
        let announcements = query_as("SELECT * FROM announcements ORDER BY created_at DESC, id DESC")
            .fetch_all(&mut self.executor)
            .await?;
        Ok(announcements)
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        let res = query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }
}

impl Common for PgStore<PoolConnection<Postgres>> {}
impl Common for PgStore<Transaction<'static, Postgres>> {}
impl Storer for PgStore<PoolConnection<Postgres>> {}
impl Storer for PgStore<Transaction<'static, Postgres>> {}

impl TxStorer for PgStore<Transaction<'static, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}

/// One connection per logical operation: `store` for single statements,
/// `tx` where several writes must land together.
pub struct PgStoreManager {
    pool: PgPool,
}

impl PgStoreManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn store(&self) -> Result<PgStore<PoolConnection<Postgres>>, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgStore::new(conn))
    }

    pub async fn tx(&self) -> Result<PgStore<Transaction<'static, Postgres>>, Error> {
        let tx = self.pool.begin().await?;
        Ok(PgStore::new(tx))
    }

    pub async fn init_schema(&self) -> Result<(), Error> {
        self.pool.execute(include_str!("../../schema.sql")).await?;
        Ok(())
    }
}
