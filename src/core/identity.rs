use hex::ToHex;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::context::{Session, StaffRole};
use crate::core::db::{AdminCommon, ResidentCommon, StaffCommon, Storer};
use crate::core::required;
use crate::error::Error;
use crate::models::resident::{Insert as ResidentInsert, Resident};
use crate::models::staff::{Insert as StaffInsert, Staff};

fn hash_password(pass: &str, slt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(slt);
    hasher.finalize().encode_hex()
}

fn random_salt() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

fn verify_password(pass: &str, slt: &str, digest: &str) -> bool {
    hash_password(pass, slt) == digest
}

#[derive(Debug, Clone)]
pub struct ResidentProfile {
    pub name: String,
    pub flat_no: String,
    pub phone: String,
    pub age: i32,
    pub number_of_members: i32,
    pub gender: String,
    pub designation: String,
}

/// Registers an unapproved resident and returns the generated resident id.
/// The id is a 128-bit random token, long enough that collisions are
/// negligible at any realistic society size.
pub async fn register_resident<S>(store: &mut S, profile: ResidentProfile) -> Result<String, Error>
where
    S: Storer,
{
    let name = required("name", &profile.name)?;
    let flat_no = required("flat number", &profile.flat_no)?;
    let phone = required("phone", &profile.phone)?;
    let gender = required("gender", &profile.gender)?;
    let designation = required("designation", &profile.designation)?;
    if profile.age <= 0 {
        return Err(Error::Validation("age must be a positive number".into()));
    }
    if profile.number_of_members <= 0 {
        return Err(Error::Validation("number of members must be a positive number".into()));
    }
    let resident_id = Uuid::new_v4().simple().to_string();
    ResidentCommon::insert(
        store,
        &resident_id,
        ResidentInsert {
            name,
            flat_no,
            phone,
            age: profile.age,
            number_of_members: profile.number_of_members,
            gender,
            designation,
        },
    )
    .await?;
    Ok(resident_id)
}

pub async fn login_resident<S>(store: &mut S, flat_no: &str, resident_id: &str) -> Result<Session, Error>
where
    S: Storer,
{
    let resident = ResidentCommon::get_by_flat(store, flat_no.trim(), resident_id.trim())
        .await?
        .ok_or_else(|| Error::Unauthorized("unknown flat number or resident id".into()))?;
    if !resident.approved {
        return Err(Error::PendingApproval);
    }
    Ok(Session::Resident {
        resident_id: resident.resident_id,
        flat_no: resident.flat_no,
        name: resident.name,
    })
}

pub async fn register_staff<S>(store: &mut S, username: &str, password: &str, role: StaffRole) -> Result<(), Error>
where
    S: Storer,
{
    let username = required("username", username)?;
    let password = required("password", password)?;
    if StaffCommon::get(store, &username).await?.is_some() {
        return Err(Error::Conflict(format!("staff username {} is already taken", username)));
    }
    let slt = random_salt();
    // the primary key on username backs this up against concurrent registrations
    StaffCommon::insert(
        store,
        StaffInsert {
            password: hash_password(&password, &slt),
            salt: slt,
            username,
            role: role.to_string(),
        },
    )
    .await
}

pub async fn login_staff<S>(store: &mut S, username: &str, password: &str) -> Result<Session, Error>
where
    S: Storer,
{
    let staff = StaffCommon::get(store, username.trim())
        .await?
        .ok_or_else(|| Error::Unauthorized("invalid staff credentials".into()))?;
    if !verify_password(password, &staff.salt, &staff.password) {
        return Err(Error::Unauthorized("invalid staff credentials".into()));
    }
    if !staff.approved {
        return Err(Error::PendingApproval);
    }
    let role = staff.role.parse()?;
    Ok(Session::Staff {
        username: staff.username,
        role,
    })
}

pub async fn login_admin<S>(store: &mut S, username: &str, password: &str) -> Result<Session, Error>
where
    S: Storer,
{
    let admin = AdminCommon::get(store, username.trim())
        .await?
        .ok_or_else(|| Error::Unauthorized("invalid admin credentials".into()))?;
    if !verify_password(password, &admin.salt, &admin.password) {
        return Err(Error::Unauthorized("invalid admin credentials".into()));
    }
    Ok(Session::Admin { username: admin.username })
}

pub async fn approve_resident<S>(store: &mut S, session: &Session, resident_id: &str) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = ResidentCommon::approve(store, resident_id.trim()).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("resident {}", resident_id.trim())));
    }
    Ok(())
}

pub async fn approve_staff<S>(store: &mut S, session: &Session, username: &str) -> Result<(), Error>
where
    S: Storer,
{
    session.require_admin()?;
    let n = StaffCommon::approve(store, username.trim()).await?;
    if n == 0 {
        return Err(Error::NotFound(format!("staff {}", username.trim())));
    }
    Ok(())
}

pub async fn pending_residents<S>(store: &mut S, session: &Session) -> Result<Vec<Resident>, Error>
where
    S: Storer,
{
    session.require_admin()?;
    ResidentCommon::pending(store).await
}

pub async fn pending_staff<S>(store: &mut S, session: &Session) -> Result<Vec<Staff>, Error>
where
    S: Storer,
{
    session.require_admin()?;
    StaffCommon::pending(store).await
}

/// Bootstrap upsert for the admin account; re-running rotates the salt.
pub async fn seed_admin<S>(store: &mut S, username: &str, password: &str) -> Result<(), Error>
where
    S: Storer,
{
    let username = required("admin username", username)?;
    let password = required("admin password", password)?;
    let slt = random_salt();
    AdminCommon::upsert(store, &username, &hash_password(&password, &slt), &slt).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::mock::Mem;

    fn profile(flat_no: &str) -> ResidentProfile {
        ResidentProfile {
            name: "Asha Rao".into(),
            flat_no: flat_no.into(),
            phone: "9900112233".into(),
            age: 41,
            number_of_members: 3,
            gender: "female".into(),
            designation: "owner".into(),
        }
    }

    #[tokio::test]
    async fn resident_lifecycle_register_approve_login() {
        let mem = Mem::new();
        let mut store = mem.store();
        let rid = register_resident(&mut store, profile("A-101")).await.unwrap();
        assert_eq!(rid.len(), 32);

        // unapproved yet: login reports pending, not invalid
        let err = login_resident(&mut store, "A-101", &rid).await.unwrap_err();
        assert!(matches!(err, Error::PendingApproval));

        let admin = Session::Admin { username: "admin".into() };
        approve_resident(&mut store, &admin, &rid).await.unwrap();
        let session = login_resident(&mut store, "A-101", &rid).await.unwrap();
        assert_eq!(session.flat_no().unwrap(), "A-101");

        // wrong token is an authorization failure
        let err = login_resident(&mut store, "A-101", "deadbeef").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn resident_registration_requires_fields() {
        let mem = Mem::new();
        let mut store = mem.store();
        let mut p = profile("B-202");
        p.name = "  ".into();
        assert!(matches!(
            register_resident(&mut store, p).await.unwrap_err(),
            Error::Validation(_)
        ));
        let mut p = profile("B-202");
        p.age = 0;
        assert!(matches!(
            register_resident(&mut store, p).await.unwrap_err(),
            Error::Validation(_)
        ));
        assert!(mem.state().residents.is_empty());
    }

    #[tokio::test]
    async fn only_admin_approves() {
        let mem = Mem::new();
        let mut store = mem.store();
        let rid = register_resident(&mut store, profile("C-303")).await.unwrap();
        let session = Session::Staff {
            username: "maintenance1".into(),
            role: StaffRole::Maintenance,
        };
        assert!(matches!(
            approve_resident(&mut store, &session, &rid).await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        assert!(!mem.state().residents[0].approved);
    }

    #[tokio::test]
    async fn approving_unknown_resident_is_not_found() {
        let mem = Mem::new();
        let mut store = mem.store();
        let admin = Session::Admin { username: "admin".into() };
        assert!(matches!(
            approve_resident(&mut store, &admin, "missing").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn staff_lifecycle_and_duplicate_username() {
        let mem = Mem::new();
        let mut store = mem.store();
        register_staff(&mut store, "delivery1", "pass123", StaffRole::Delivery)
            .await
            .unwrap();
        // password is stored hashed, never plaintext
        let stored = mem.state().staff[0].clone();
        assert_ne!(stored.password, "pass123");
        assert_eq!(stored.password.len(), 64);

        assert!(matches!(
            register_staff(&mut store, "delivery1", "other", StaffRole::Delivery)
                .await
                .unwrap_err(),
            Error::Conflict(_)
        ));

        assert!(matches!(
            login_staff(&mut store, "delivery1", "pass123").await.unwrap_err(),
            Error::PendingApproval
        ));
        let admin = Session::Admin { username: "admin".into() };
        approve_staff(&mut store, &admin, "delivery1").await.unwrap();

        let session = login_staff(&mut store, "delivery1", "pass123").await.unwrap();
        assert_eq!(session.staff_username().unwrap(), "delivery1");
        assert!(matches!(
            login_staff(&mut store, "delivery1", "wrong").await.unwrap_err(),
            Error::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn admin_login_verifies_digest() {
        let mem = Mem::new();
        let mut store = mem.store();
        seed_admin(&mut store, "admin", "admin123").await.unwrap();
        login_admin(&mut store, "admin", "admin123").await.unwrap();
        assert!(matches!(
            login_admin(&mut store, "admin", "admin124").await.unwrap_err(),
            Error::Unauthorized(_)
        ));
        // reseeding rotates credentials in place
        seed_admin(&mut store, "admin", "rotated").await.unwrap();
        assert_eq!(mem.state().admins.len(), 1);
        login_admin(&mut store, "admin", "rotated").await.unwrap();
    }
}
