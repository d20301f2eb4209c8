use std::collections::{HashMap, HashSet};

use sqlx::types::Json;

use crate::context::Session;
use crate::core::db::{PollCommon, Storer, TxStorer};
use crate::core::required;
use crate::error::Error;
use crate::models::poll::{self, Insert as PollInsert, Poll};

pub async fn create_poll<S>(store: &mut S, session: &Session, question: &str, options: Vec<String>) -> Result<i32, Error>
where
    S: Storer,
{
    session.require_admin()?;
    let question = required("question", question)?;
    let options: Vec<String> = options.iter().map(|o| o.trim().to_owned()).filter(|o| !o.is_empty()).collect();
    if options.len() < 2 {
        return Err(Error::Validation("a poll needs at least two options".into()));
    }
    let mut seen = HashSet::new();
    for o in &options {
        // duplicate options would share one tally counter
        if !seen.insert(o.as_str()) {
            return Err(Error::Validation(format!("duplicate option: {}", o)));
        }
    }
    let votes: HashMap<String, i64> = options.iter().map(|o| (o.clone(), 0)).collect();
    PollCommon::insert(
        store,
        PollInsert {
            question,
            options,
            votes: Json(votes),
        },
    )
    .await
}

/// Several polls may be open at once; voting always names an explicit poll.
pub async fn open_polls<S>(store: &mut S) -> Result<Vec<Poll>, Error>
where
    S: Storer,
{
    PollCommon::open(store).await
}

/// Records one vote for the session's flat and bumps the option tally in the
/// same transaction. The vote row and the counter can never drift apart: a
/// crash before commit rolls both back, and the unique (flat_no, poll_id)
/// constraint rejects a concurrent duplicate that slipped past the pre-check.
///
/// Returns the option the vote was counted for.
pub async fn cast_vote<T>(mut tx: T, session: &Session, poll_id: i32, choice: usize) -> Result<String, Error>
where
    T: TxStorer,
{
    let flat_no = session.flat_no()?.to_owned();
    let poll = PollCommon::get(&mut tx, poll_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("poll {}", poll_id)))?;
    if poll.status != poll::OPEN {
        return Err(Error::Conflict(format!("poll {} is closed", poll_id)));
    }
    if choice < 1 || choice > poll.options.len() {
        return Err(Error::Validation(format!(
            "choice must be between 1 and {}",
            poll.options.len()
        )));
    }
    if PollCommon::has_voted(&mut tx, &flat_no, poll_id).await? {
        return Err(Error::Conflict(format!("flat {} has already voted in this poll", flat_no)));
    }
    let option = poll.options[choice - 1].clone();
    PollCommon::record_vote(&mut tx, &flat_no, poll_id).await?;
    PollCommon::increment_tally(&mut tx, poll_id, &option).await?;
    tx.commit().await?;
    Ok(option)
}

/// All polls with their tallies and vote totals.
pub async fn summary<S>(store: &mut S, session: &Session) -> Result<Vec<(Poll, i64)>, Error>
where
    S: Storer,
{
    session.require_admin()?;
    let polls = PollCommon::all(store).await?;
    let mut out = Vec::with_capacity(polls.len());
    for poll in polls {
        let total = PollCommon::count_votes(store, poll.id).await?;
        out.push((poll, total));
    }
    Ok(out)
}

pub async fn close_poll<S>(store: &mut S, session: &Session, poll_id: i32) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = PollCommon::close(store, poll_id).await?;
    if n == 0 {
        return match PollCommon::get(store, poll_id).await? {
            Some(_) => Err(Error::Conflict(format!("poll {} is already closed", poll_id))),
            None => Err(Error::NotFound(format!("poll {}", poll_id))),
        };
    }
    Ok(())
}

/// Drops every poll; vote records go with them.
pub async fn delete_polls<S>(store: &mut S, session: &Session) -> Result<u64, Error>
where
    S: Storer,
{
    session.require_admin()?;
    PollCommon::delete_all(store).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::mock::{resident_session, Mem};

    fn admin() -> Session {
        Session::Admin { username: "admin".into() }
    }

    async fn open_poll(mem: &Mem) -> i32 {
        let mut store = mem.store();
        create_poll(
            &mut store,
            &admin(),
            "Repaint the clubhouse?",
            vec!["yes".into(), "no".into(), "abstain".into()],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn poll_needs_two_distinct_options() {
        let mem = Mem::new();
        let mut store = mem.store();
        assert!(matches!(
            create_poll(&mut store, &admin(), "q", vec!["yes".into()]).await.unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            create_poll(&mut store, &admin(), "q", vec!["yes".into(), "yes".into()])
                .await
                .unwrap_err(),
            Error::Validation(_)
        ));
        let session = resident_session("A-101");
        assert!(matches!(
            create_poll(&mut store, &session, "q", vec!["yes".into(), "no".into()])
                .await
                .unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(mem.state().polls.is_empty());
    }

    #[tokio::test]
    async fn tally_starts_at_zero_for_every_option() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        let state = mem.state();
        let poll = state.polls.iter().find(|p| p.id == id).unwrap();
        assert_eq!(poll.status, poll::OPEN);
        assert_eq!(poll.votes.0.len(), 3);
        assert!(poll.votes.0.values().all(|&n| n == 0));
    }

    #[tokio::test]
    async fn votes_from_distinct_flats_all_count() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        for (i, flat) in ["A-101", "B-202", "C-303"].iter().enumerate() {
            let session = resident_session(flat);
            cast_vote(mem.tx(), &session, id, (i % 2) + 1).await.unwrap();
        }
        let state = mem.state();
        assert_eq!(state.votes.len(), 3);
        let poll = &state.polls[0];
        let total: i64 = poll.votes.0.values().sum();
        assert_eq!(total, 3);
        assert_eq!(poll.votes.0["yes"], 2);
        assert_eq!(poll.votes.0["no"], 1);
    }

    #[tokio::test]
    async fn second_vote_from_same_flat_changes_nothing() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        let session = resident_session("A-101");
        cast_vote(mem.tx(), &session, id, 1).await.unwrap();

        let err = cast_vote(mem.tx(), &session, id, 2).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let state = mem.state();
        assert_eq!(state.votes.len(), 1);
        let poll = &state.polls[0];
        assert_eq!(poll.votes.0["yes"], 1);
        assert_eq!(poll.votes.0["no"], 0);
    }

    #[tokio::test]
    async fn out_of_range_choice_is_rejected_before_any_write() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        let session = resident_session("A-101");
        for choice in [0, 4] {
            let err = cast_vote(mem.tx(), &session, id, choice).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        let state = mem.state();
        assert!(state.votes.is_empty());
        assert!(state.polls[0].votes.0.values().all(|&n| n == 0));
    }

    #[tokio::test]
    async fn closed_polls_reject_votes() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        let mut store = mem.store();
        close_poll(&mut store, &admin(), id).await.unwrap();
        assert!(matches!(
            close_poll(&mut store, &admin(), id).await.unwrap_err(),
            Error::Conflict(_)
        ));

        let session = resident_session("A-101");
        let err = cast_vote(mem.tx(), &session, id, 1).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(mem.state().votes.is_empty());
    }

    #[tokio::test]
    async fn voting_names_an_explicit_poll() {
        let mem = Mem::new();
        let first = open_poll(&mem).await;
        let second = {
            let mut store = mem.store();
            create_poll(&mut store, &admin(), "Second question?", vec!["yes".into(), "no".into()])
                .await
                .unwrap()
        };
        assert_ne!(first, second);
        let mut store = mem.store();
        assert_eq!(open_polls(&mut store).await.unwrap().len(), 2);

        // one flat may vote once in each open poll
        let session = resident_session("A-101");
        cast_vote(mem.tx(), &session, first, 1).await.unwrap();
        cast_vote(mem.tx(), &session, second, 2).await.unwrap();
        assert_eq!(mem.state().votes.len(), 2);
    }

    #[tokio::test]
    async fn summary_reports_totals_matching_vote_rows() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        for flat in ["A-101", "B-202"] {
            cast_vote(mem.tx(), &resident_session(flat), id, 1).await.unwrap();
        }
        let mut store = mem.store();
        let summary = summary(&mut store, &admin()).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].1, 2);
        let tally_sum: i64 = summary[0].0.votes.0.values().sum();
        assert_eq!(tally_sum, summary[0].1);
    }

    #[tokio::test]
    async fn deleting_polls_removes_votes() {
        let mem = Mem::new();
        let id = open_poll(&mem).await;
        cast_vote(mem.tx(), &resident_session("A-101"), id, 1).await.unwrap();
        let mut store = mem.store();
        let n = delete_polls(&mut store, &admin()).await.unwrap();
        assert_eq!(n, 1);
        let state = mem.state();
        assert!(state.polls.is_empty());
        assert!(state.votes.is_empty());
    }
}
