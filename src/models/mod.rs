pub mod announcement;
pub mod booking;
pub mod complaint;
pub mod poll;
pub mod resident;
pub mod skip;
pub mod staff;
pub mod task;
