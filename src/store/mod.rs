//! Persistence for members, payments and attendance.
//!
//! Every backend upholds the same rules: unique member emails, unique
//! payment transaction IDs, one attendance record per member per day, and
//! deleting a member deletes their payments and attendance. Listings come
//! back in a fixed order: members by last then first name, payments and
//! attendance newest first.
//!
//! Writes that touch a member's expiry or status happen inside the store,
//! against the member as currently stored, so a settlement and the expiry
//! sweep never overwrite each other.

use std::sync::Arc;

use anyhow::Context as _;
use async_graphql::Context;
use time::Date;
use tracing::info;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::attendance::{Attendance, AttendanceRecord};
use crate::models::member::{Member, MemberRecord, MemberStatus};
use crate::models::payment::{Payment, PaymentRecord, PaymentStatus};

pub mod json;
pub mod postgres;

pub type SharedStore = Arc<dyn Store>;

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn members(&self) -> StoreResult<Vec<Member>>;
    async fn member(&self, id: i64) -> StoreResult<Option<Member>>;
    async fn member_with_email(&self, email: &str) -> StoreResult<Option<Member>>;
    async fn insert_member(&self, record: MemberRecord) -> StoreResult<Member>;
    /// Saves the member's details, leaving their expiry date, status and
    /// photo as stored.
    async fn update_member(&self, member: &Member) -> StoreResult<()>;
    /// Returns whether the member exists.
    async fn set_member_status(&self, id: i64, status: MemberStatus) -> StoreResult<bool>;
    /// Returns whether the member exists.
    async fn set_member_expiry(&self, id: i64, expiry_date: Date) -> StoreResult<bool>;
    /// Returns whether the member exists.
    async fn set_member_photo(&self, id: i64, photo: Option<String>) -> StoreResult<bool>;
    /// Marks active members whose expiry is before `today` as expired,
    /// returning how many changed.
    async fn expire_lapsed(&self, today: Date) -> StoreResult<u64>;
    /// Returns whether a member was deleted.
    async fn delete_member(&self, id: i64) -> StoreResult<bool>;

    async fn payments(&self) -> StoreResult<Vec<Payment>>;
    async fn payment(&self, id: i64) -> StoreResult<Option<Payment>>;
    async fn payment_with_transaction_id(&self, transaction_id: &str) -> StoreResult<Option<Payment>>;
    async fn payments_for_member(&self, member_id: i64) -> StoreResult<Vec<Payment>>;
    /// Inserts the payment, extending the member's membership in the same
    /// write if it is already settled.
    async fn insert_payment(&self, record: PaymentRecord, today: Date) -> StoreResult<Payment>;
    /// Moves the payment from `from` to `to`, extending the membership if it
    /// settles. Returns `None` when the payment is no longer `from`.
    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        today: Date,
    ) -> StoreResult<Option<Payment>>;
    async fn delete_payment(&self, id: i64) -> StoreResult<bool>;

    async fn attendance(&self) -> StoreResult<Vec<Attendance>>;
    async fn attendance_with_id(&self, id: i64) -> StoreResult<Option<Attendance>>;
    async fn attendance_for_member(&self, member_id: i64) -> StoreResult<Vec<Attendance>>;
    async fn attendance_for_member_on(&self, member_id: i64, date: Date) -> StoreResult<Option<Attendance>>;
    async fn attendance_on(&self, date: Date) -> StoreResult<Vec<Attendance>>;
    async fn insert_attendance(&self, record: AttendanceRecord) -> StoreResult<Attendance>;
    async fn update_attendance(&self, attendance: &Attendance) -> StoreResult<()>;
    async fn delete_attendance(&self, id: i64) -> StoreResult<bool>;
}

/// Opens PostgreSQL when a database URL is configured, and the JSON data
/// file otherwise.
pub async fn connect(config: &Config) -> anyhow::Result<SharedStore> {
    if let Some(url) = &config.database_url {
        let store = postgres::PgStore::connect(url)
            .await
            .context("Failed to connect to the database")?;
        info!("using PostgreSQL store");

        Ok(Arc::new(store))
    } else {
        let store = json::JsonStore::open(&config.data_file)
            .await
            .with_context(|| format!("Failed to open data file {}", config.data_file.display()))?;
        info!(path = %config.data_file.display(), "using JSON file store");

        Ok(Arc::new(store))
    }
}

pub fn from_ctx<'c>(ctx: &Context<'c>) -> &'c dyn Store {
    &**ctx.data_unchecked::<SharedStore>()
}

pub(crate) fn member_order(member: &Member) -> (String, String, i64) {
    (
        member.last_name.to_lowercase(),
        member.first_name.to_lowercase(),
        member.id,
    )
}

/// Extends `member` for a payment settling `months`.
pub(crate) fn extend_member(member: &mut Member, months: i32, today: Date) -> StoreResult<()> {
    member
        .extend(months, today)
        .map_err(|error| StoreError::Invalid(error.to_string()))
}
