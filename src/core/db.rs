use chrono::NaiveDate;

use crate::error::Error;
use crate::models::announcement::Announcement;
use crate::models::booking::{Amenity, Booking, Insert as BookingInsert};
use crate::models::complaint::{Complaint, Insert as ComplaintInsert};
use crate::models::poll::{Insert as PollInsert, Poll};
use crate::models::resident::{Insert as ResidentInsert, Resident};
use crate::models::skip::{Insert as SkipInsert, Skip};
use crate::models::staff::{Admin, Insert as StaffInsert, Staff};
use crate::models::task::{Insert as TaskInsert, Task};

pub trait ResidentCommon {
    async fn insert(&mut self, resident_id: &str, data: ResidentInsert) -> Result<(), Error>;
    async fn get_by_flat(&mut self, flat_no: &str, resident_id: &str) -> Result<Option<Resident>, Error>;
    async fn approve(&mut self, resident_id: &str) -> Result<u64, Error>;
    async fn pending(&mut self) -> Result<Vec<Resident>, Error>;
    async fn approved(&mut self) -> Result<Vec<Resident>, Error>;
}

pub trait StaffCommon {
    async fn insert(&mut self, data: StaffInsert) -> Result<(), Error>;
    async fn get(&mut self, username: &str) -> Result<Option<Staff>, Error>;
    async fn approve(&mut self, username: &str) -> Result<u64, Error>;
    async fn pending(&mut self) -> Result<Vec<Staff>, Error>;
}

pub trait AdminCommon {
    async fn upsert(&mut self, username: &str, password: &str, salt: &str) -> Result<(), Error>;
    async fn get(&mut self, username: &str) -> Result<Option<Admin>, Error>;
}

pub trait ComplaintCommon {
    async fn insert(&mut self, data: ComplaintInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Complaint>, Error>;
    async fn by_flat(&mut self, flat_no: &str) -> Result<Vec<Complaint>, Error>;
    async fn on_date(&mut self, date: NaiveDate) -> Result<Vec<Complaint>, Error>;
    async fn all(&mut self) -> Result<Vec<Complaint>, Error>;
    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error>;
}

pub trait TaskCommon {
    async fn insert(&mut self, data: TaskInsert) -> Result<i32, Error>;
    async fn assigned_to(&mut self, username: &str) -> Result<Vec<Task>, Error>;
    async fn common(&mut self) -> Result<Vec<Task>, Error>;
    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error>;
    async fn delete(&mut self, id: i32) -> Result<u64, Error>;
}

pub trait AmenityCommon {
    async fn upsert(&mut self, name: &str) -> Result<(), Error>;
    async fn list(&mut self) -> Result<Vec<Amenity>, Error>;
}

pub trait BookingCommon {
    async fn insert(&mut self, data: BookingInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Booking>, Error>;
    async fn pending(&mut self) -> Result<Vec<Booking>, Error>;
    async fn by_resident(&mut self, resident_id: &str) -> Result<Vec<Booking>, Error>;
    /// Guarded transition out of `pending`; 0 rows means the booking is
    /// missing or already decided.
    async fn decide(&mut self, id: i32, status: &str) -> Result<u64, Error>;
}

pub trait SkipCommon {
    async fn insert(&mut self, data: SkipInsert) -> Result<(), Error>;
    async fn on_date(&mut self, date: NaiveDate, item: &str) -> Result<Vec<Skip>, Error>;
}

pub trait PollCommon {
    async fn insert(&mut self, data: PollInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error>;
    async fn open(&mut self) -> Result<Vec<Poll>, Error>;
    async fn all(&mut self) -> Result<Vec<Poll>, Error>;
    /// Guarded open -> closed transition; 0 rows means missing or already closed.
    async fn close(&mut self, id: i32) -> Result<u64, Error>;
    async fn delete_all(&mut self) -> Result<u64, Error>;
    async fn has_voted(&mut self, flat_no: &str, poll_id: i32) -> Result<bool, Error>;
    /// Backed by the UNIQUE (flat_no, poll_id) constraint; a duplicate
    /// surfaces as `Error::Conflict` even under concurrent callers.
    async fn record_vote(&mut self, flat_no: &str, poll_id: i32) -> Result<(), Error>;
    async fn increment_tally(&mut self, poll_id: i32, option: &str) -> Result<u64, Error>;
    async fn count_votes(&mut self, poll_id: i32) -> Result<i64, Error>;
}

pub trait AnnouncementCommon {
    async fn insert(&mut self, message: &str) -> Result<i32, Error>;
    async fn list(&mut self) -> Result<Vec<Announcement>, Error>;
    async fn delete(&mut self, id: i32) -> Result<u64, Error>;
}

pub trait Common:
    ResidentCommon
    + StaffCommon
    + AdminCommon
    + ComplaintCommon
    + TaskCommon
    + AmenityCommon
    + BookingCommon
    + SkipCommon
    + PollCommon
    + AnnouncementCommon
{
}

/// One storer per logical operation; dropped (and its connection released)
/// when the operation ends.
pub trait Storer: Common {}

/// Transactional storer: nothing is visible until `commit`, dropping without
/// commit rolls back.
pub trait TxStorer: Storer {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}
