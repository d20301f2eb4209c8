//! In-memory stand-in for the Postgres store used by the core tests. A
//! write-through storer mirrors autocommit statements; a staged storer
//! mirrors a transaction: nothing reaches the shared state until `commit`,
//! and dropping it discards the staged writes.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{NaiveDate, Utc};

use crate::context::Session;
use crate::core::db::{
    AdminCommon, AmenityCommon, AnnouncementCommon, BookingCommon, Common, ComplaintCommon, PollCommon, ResidentCommon,
    SkipCommon, StaffCommon, Storer, TaskCommon, TxStorer,
};
use crate::error::Error;
use crate::models::announcement::Announcement;
use crate::models::booking::{self, Amenity, Booking, Insert as BookingInsert};
use crate::models::complaint::{Complaint, Insert as ComplaintInsert};
use crate::models::poll::{self, Insert as PollInsert, Poll, Vote};
use crate::models::resident::{Insert as ResidentInsert, Resident};
use crate::models::skip::{Insert as SkipInsert, Skip};
use crate::models::staff::{Admin, Insert as StaffInsert, Staff};
use crate::models::task::{Insert as TaskInsert, Task};

pub fn resident_session(flat_no: &str) -> Session {
    Session::Resident {
        resident_id: format!("token-{}", flat_no),
        flat_no: flat_no.into(),
        name: format!("resident {}", flat_no),
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemState {
    pub residents: Vec<Resident>,
    pub staff: Vec<Staff>,
    pub admins: Vec<Admin>,
    pub complaints: Vec<Complaint>,
    pub tasks: Vec<Task>,
    pub amenities: Vec<Amenity>,
    pub bookings: Vec<Booking>,
    pub skips: Vec<Skip>,
    pub polls: Vec<Poll>,
    pub votes: Vec<Vote>,
    pub announcements: Vec<Announcement>,
    next_id: i32,
}

impl MemState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct Mem {
    shared: Rc<RefCell<MemState>>,
}

impl Mem {
    pub fn new() -> Self {
        Mem {
            shared: Rc::new(RefCell::new(MemState::default())),
        }
    }

    /// Committed view of the store.
    pub fn state(&self) -> MemState {
        self.shared.borrow().clone()
    }

    pub fn store(&self) -> MemStore {
        MemStore {
            shared: Rc::clone(&self.shared),
            staged: None,
        }
    }

    pub fn tx(&self) -> MemStore {
        let work = self.shared.borrow().clone();
        MemStore {
            shared: Rc::clone(&self.shared),
            staged: Some(work),
        }
    }
}

pub struct MemStore {
    shared: Rc<RefCell<MemState>>,
    staged: Option<MemState>,
}

impl MemStore {
    fn with<R>(&mut self, f: impl FnOnce(&mut MemState) -> R) -> R {
        match &mut self.staged {
            Some(work) => f(work),
            None => f(&mut self.shared.borrow_mut()),
        }
    }
}

impl ResidentCommon for MemStore {
    async fn insert(&mut self, resident_id: &str, data: ResidentInsert) -> Result<(), Error> {
        self.with(|s| {
            if s.residents.iter().any(|r| r.resident_id == resident_id) {
                return Err(Error::Conflict("record already exists".into()));
            }
            s.residents.push(Resident {
                resident_id: resident_id.to_owned(),
                name: data.name,
                flat_no: data.flat_no,
                phone: data.phone,
                age: data.age,
                number_of_members: data.number_of_members,
                gender: data.gender,
                designation: data.designation,
                approved: false,
            });
            Ok(())
        })
    }

    async fn get_by_flat(&mut self, flat_no: &str, resident_id: &str) -> Result<Option<Resident>, Error> {
        Ok(self.with(|s| {
            s.residents
                .iter()
                .find(|r| r.flat_no == flat_no && r.resident_id == resident_id)
                .cloned()
        }))
    }

    async fn approve(&mut self, resident_id: &str) -> Result<u64, Error> {
        Ok(self.with(|s| match s.residents.iter_mut().find(|r| r.resident_id == resident_id) {
            Some(r) => {
                r.approved = true;
                1
            }
            None => 0,
        }))
    }

    async fn pending(&mut self) -> Result<Vec<Resident>, Error> {
        Ok(self.with(|s| s.residents.iter().filter(|r| !r.approved).cloned().collect()))
    }

    async fn approved(&mut self) -> Result<Vec<Resident>, Error> {
        Ok(self.with(|s| s.residents.iter().filter(|r| r.approved).cloned().collect()))
    }
}

impl StaffCommon for MemStore {
    async fn insert(&mut self, data: StaffInsert) -> Result<(), Error> {
        self.with(|s| {
            if s.staff.iter().any(|m| m.username == data.username) {
                return Err(Error::Conflict("record already exists".into()));
            }
            s.staff.push(Staff {
                username: data.username,
                password: data.password,
                salt: data.salt,
                role: data.role,
                approved: false,
            });
            Ok(())
        })
    }

    async fn get(&mut self, username: &str) -> Result<Option<Staff>, Error> {
        Ok(self.with(|s| s.staff.iter().find(|m| m.username == username).cloned()))
    }

    async fn approve(&mut self, username: &str) -> Result<u64, Error> {
        Ok(self.with(|s| match s.staff.iter_mut().find(|m| m.username == username) {
            Some(m) => {
                m.approved = true;
                1
            }
            None => 0,
        }))
    }

    async fn pending(&mut self) -> Result<Vec<Staff>, Error> {
        Ok(self.with(|s| s.staff.iter().filter(|m| !m.approved).cloned().collect()))
    }
}

impl AdminCommon for MemStore {
    async fn upsert(&mut self, username: &str, password: &str, salt: &str) -> Result<(), Error> {
        self.with(|s| {
            match s.admins.iter_mut().find(|a| a.username == username) {
                Some(a) => {
                    a.password = password.to_owned();
                    a.salt = salt.to_owned();
                }
                None => s.admins.push(Admin {
                    username: username.to_owned(),
                    password: password.to_owned(),
                    salt: salt.to_owned(),
                }),
            }
            Ok(())
        })
    }

    async fn get(&mut self, username: &str) -> Result<Option<Admin>, Error> {
        Ok(self.with(|s| s.admins.iter().find(|a| a.username == username).cloned()))
    }
}

impl ComplaintCommon for MemStore {
    async fn insert(&mut self, data: ComplaintInsert) -> Result<i32, Error> {
        Ok(self.with(|s| {
            let id = s.next_id();
            s.complaints.push(Complaint {
                id,
                flat_no: data.flat_no,
                category: data.category,
                description: data.description,
                date: data.date,
                status: crate::models::complaint::Status::Pending.as_str().to_owned(),
                updated_at: None,
            });
            id
        }))
    }

    async fn get(&mut self, id: i32) -> Result<Option<Complaint>, Error> {
        Ok(self.with(|s| s.complaints.iter().find(|c| c.id == id).cloned()))
    }

    async fn by_flat(&mut self, flat_no: &str) -> Result<Vec<Complaint>, Error> {
        Ok(self.with(|s| s.complaints.iter().filter(|c| c.flat_no == flat_no).cloned().collect()))
    }

    async fn on_date(&mut self, date: NaiveDate) -> Result<Vec<Complaint>, Error> {
        Ok(self.with(|s| s.complaints.iter().filter(|c| c.date == date).cloned().collect()))
    }

    async fn all(&mut self) -> Result<Vec<Complaint>, Error> {
        Ok(self.with(|s| s.complaints.clone()))
    }

    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        Ok(self.with(|s| match s.complaints.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.status = status.to_owned();
                c.updated_at = Some(Utc::now());
                1
            }
            None => 0,
        }))
    }
}

impl TaskCommon for MemStore {
    async fn insert(&mut self, data: TaskInsert) -> Result<i32, Error> {
        Ok(self.with(|s| {
            let id = s.next_id();
            s.tasks.push(Task {
                id,
                flat_no: data.flat_no,
                issue: data.issue,
                assigned_to: data.assigned_to,
                status: crate::models::task::Status::Pending.as_str().to_owned(),
                created_at: Utc::now(),
                due_date: data.due_date,
                source_complaint_id: data.source_complaint_id,
                is_common: data.is_common,
            });
            id
        }))
    }

    async fn assigned_to(&mut self, username: &str) -> Result<Vec<Task>, Error> {
        Ok(self.with(|s| s.tasks.iter().filter(|t| t.assigned_to == username).cloned().collect()))
    }

    async fn common(&mut self) -> Result<Vec<Task>, Error> {
        Ok(self.with(|s| s.tasks.iter().filter(|t| t.is_common).cloned().collect()))
    }

    async fn set_status(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        Ok(self.with(|s| match s.tasks.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.status = status.to_owned();
                1
            }
            None => 0,
        }))
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        Ok(self.with(|s| {
            let before = s.tasks.len();
            s.tasks.retain(|t| t.id != id);
            (before - s.tasks.len()) as u64
        }))
    }
}

impl AmenityCommon for MemStore {
    async fn upsert(&mut self, name: &str) -> Result<(), Error> {
        self.with(|s| {
            if !s.amenities.iter().any(|a| a.name == name) {
                let id = s.next_id();
                s.amenities.push(Amenity { id, name: name.to_owned() });
            }
            Ok(())
        })
    }

    async fn list(&mut self) -> Result<Vec<Amenity>, Error> {
        Ok(self.with(|s| s.amenities.clone()))
    }
}

impl BookingCommon for MemStore {
    async fn insert(&mut self, data: BookingInsert) -> Result<i32, Error> {
        Ok(self.with(|s| {
            let id = s.next_id();
            s.bookings.push(Booking {
                id,
                resident_id: data.resident_id,
                amenity: data.amenity,
                date: data.date,
                time: data.time,
                status: booking::PENDING.to_owned(),
            });
            id
        }))
    }

    async fn get(&mut self, id: i32) -> Result<Option<Booking>, Error> {
        Ok(self.with(|s| s.bookings.iter().find(|b| b.id == id).cloned()))
    }

    async fn pending(&mut self) -> Result<Vec<Booking>, Error> {
        Ok(self.with(|s| s.bookings.iter().filter(|b| b.status == booking::PENDING).cloned().collect()))
    }

    async fn by_resident(&mut self, resident_id: &str) -> Result<Vec<Booking>, Error> {
        Ok(self.with(|s| s.bookings.iter().filter(|b| b.resident_id == resident_id).cloned().collect()))
    }

    async fn decide(&mut self, id: i32, status: &str) -> Result<u64, Error> {
        Ok(self.with(|s| {
            match s.bookings.iter_mut().find(|b| b.id == id && b.status == booking::PENDING) {
                Some(b) => {
                    b.status = status.to_owned();
                    1
                }
                None => 0,
            }
        }))
    }
}

impl SkipCommon for MemStore {
    async fn insert(&mut self, data: SkipInsert) -> Result<(), Error> {
        self.with(|s| {
            let id = s.next_id();
            s.skips.push(Skip {
                id,
                flat_no: data.flat_no,
                item: data.item,
                skip_date: data.skip_date,
            });
            Ok(())
        })
    }

    async fn on_date(&mut self, date: NaiveDate, item: &str) -> Result<Vec<Skip>, Error> {
        Ok(self.with(|s| {
            s.skips
                .iter()
                .filter(|k| k.skip_date == date && k.item == item)
                .cloned()
                .collect()
        }))
    }
}

impl PollCommon for MemStore {
    async fn insert(&mut self, data: PollInsert) -> Result<i32, Error> {
        Ok(self.with(|s| {
            let id = s.next_id();
            s.polls.push(Poll {
                id,
                question: data.question,
                options: data.options,
                status: poll::OPEN.to_owned(),
                votes: data.votes,
                created_at: Utc::now(),
            });
            id
        }))
    }

    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        Ok(self.with(|s| s.polls.iter().find(|p| p.id == id).cloned()))
    }

    async fn open(&mut self) -> Result<Vec<Poll>, Error> {
        Ok(self.with(|s| s.polls.iter().filter(|p| p.status == poll::OPEN).cloned().collect()))
    }

    async fn all(&mut self) -> Result<Vec<Poll>, Error> {
        Ok(self.with(|s| s.polls.clone()))
    }

    async fn close(&mut self, id: i32) -> Result<u64, Error> {
        Ok(self.with(|s| {
            match s.polls.iter_mut().find(|p| p.id == id && p.status == poll::OPEN) {
                Some(p) => {
                    p.status = poll::CLOSED.to_owned();
                    1
                }
                None => 0,
            }
        }))
    }

    async fn delete_all(&mut self) -> Result<u64, Error> {
        Ok(self.with(|s| {
            let n = s.polls.len() as u64;
            s.polls.clear();
            // votes reference polls with ON DELETE CASCADE
            s.votes.clear();
            n
        }))
    }

    async fn has_voted(&mut self, flat_no: &str, poll_id: i32) -> Result<bool, Error> {
        Ok(self.with(|s| s.votes.iter().any(|v| v.flat_no == flat_no && v.poll_id == poll_id)))
    }

    async fn record_vote(&mut self, flat_no: &str, poll_id: i32) -> Result<(), Error> {
        self.with(|s| {
            // mirrors the UNIQUE (flat_no, poll_id) constraint
            if s.votes.iter().any(|v| v.flat_no == flat_no && v.poll_id == poll_id) {
                return Err(Error::Conflict("record already exists".into()));
            }
            let id = s.next_id();
            s.votes.push(Vote {
                id,
                flat_no: flat_no.to_owned(),
                poll_id,
            });
            Ok(())
        })
    }

    async fn increment_tally(&mut self, poll_id: i32, option: &str) -> Result<u64, Error> {
        Ok(self.with(|s| {
            match s.polls.iter_mut().find(|p| p.id == poll_id && p.status == poll::OPEN) {
                Some(p) => {
                    *p.votes.0.entry(option.to_owned()).or_insert(0) += 1;
                    1
                }
                None => 0,
            }
        }))
    }

    async fn count_votes(&mut self, poll_id: i32) -> Result<i64, Error> {
        Ok(self.with(|s| s.votes.iter().filter(|v| v.poll_id == poll_id).count() as i64))
    }
}

impl AnnouncementCommon for MemStore {
    async fn insert(&mut self, message: &str) -> Result<i32, Error> {
        Ok(self.with(|s| {
            let id = s.next_id();
            s.announcements.push(Announcement {
                id,
                message: message.to_owned(),
                created_at: Utc::now(),
            });
            id
        }))
    }

    async fn list(&mut self) -> Result<Vec<Announcement>, Error> {
        Ok(self.with(|s| {
            let mut out = s.announcements.clone();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            out
        }))
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        Ok(self.with(|s| {
            let before = s.announcements.len();
            s.announcements.retain(|a| a.id != id);
            (before - s.announcements.len()) as u64
        }))
    }
}

impl Common for MemStore {}
impl Storer for MemStore {}

impl TxStorer for MemStore {
    async fn commit(self) -> Result<(), Error> {
        if let Some(work) = self.staged {
            *self.shared.borrow_mut() = work;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}
