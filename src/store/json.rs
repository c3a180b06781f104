//! A flat JSON-file store.
//!
//! The whole dataset lives in memory; with a backing file, every write
//! rewrites the file. Meant for a single front desk machine, and for tests
//! (see [`JsonStore::in_memory`]).
//!
//! Writes are made to a copy of the dataset under the write lock, and the
//! copy only replaces the in-memory data once it has been saved.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::Date;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::attendance::{Attendance, AttendanceRecord};
use crate::models::member::{Member, MemberRecord, MemberStatus};
use crate::models::payment::{Payment, PaymentRecord, PaymentStatus};
use crate::store::{extend_member, member_order, Store};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Dataset {
    last_member_id: i64,
    last_payment_id: i64,
    last_attendance_id: i64,
    members: Vec<Member>,
    payments: Vec<Payment>,
    attendance: Vec<Attendance>,
}

impl Dataset {
    fn member_mut(&mut self, id: i64) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id == id)
    }

    fn settle(&mut self, member_id: i64, months: i32, today: Date) -> StoreResult<()> {
        let member = self
            .member_mut(member_id)
            .ok_or_else(|| no_member(member_id))?;

        extend_member(member, months, today)
    }
}

pub struct JsonStore {
    path: Option<PathBuf>,
    data: RwLock<Dataset>,
}

impl JsonStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(Dataset::default()),
        }
    }

    /// Loads the data file, starting empty if it doesn't exist yet.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Dataset::default(),
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Applies `change` to a copy of the dataset and keeps the copy if it
    /// was saved. Nothing changes when `change` or the save fails.
    async fn write<T, F>(&self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Dataset) -> StoreResult<T> + Send,
        T: Send,
    {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let value = change(&mut next)?;
        self.persist(&next).await?;
        *data = next;

        Ok(value)
    }

    async fn persist(&self, data: &Dataset) -> StoreResult<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(data)?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }
}

fn sorted_payments(mut payments: Vec<Payment>) -> Vec<Payment> {
    payments.sort_by(|a, b| b.paid_on.cmp(&a.paid_on).then(b.id.cmp(&a.id)));
    payments
}

fn sorted_attendance(mut records: Vec<Attendance>) -> Vec<Attendance> {
    records.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(b.check_in.cmp(&a.check_in))
            .then(b.id.cmp(&a.id))
    });
    records
}

fn email_taken(email: &str) -> StoreError {
    StoreError::Conflict(format!("Another member already has the email {}", email))
}

fn no_member(id: i64) -> StoreError {
    StoreError::Conflict(format!("No member with id {}", id))
}

#[async_trait::async_trait]
impl Store for JsonStore {
    async fn members(&self) -> StoreResult<Vec<Member>> {
        let mut members = self.data.read().await.members.clone();
        members.sort_by_key(member_order);

        Ok(members)
    }

    async fn member(&self, id: i64) -> StoreResult<Option<Member>> {
        let data = self.data.read().await;

        Ok(data.members.iter().find(|member| member.id == id).cloned())
    }

    async fn member_with_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let data = self.data.read().await;

        Ok(data
            .members
            .iter()
            .find(|member| member.email == email)
            .cloned())
    }

    async fn insert_member(&self, record: MemberRecord) -> StoreResult<Member> {
        self.write(|data| {
            if data.members.iter().any(|member| member.email == record.email) {
                return Err(email_taken(&record.email));
            }

            data.last_member_id += 1;
            let member = record.into_member(data.last_member_id);
            data.members.push(member.clone());

            Ok(member)
        })
        .await
    }

    async fn update_member(&self, member: &Member) -> StoreResult<()> {
        self.write(|data| {
            if data
                .members
                .iter()
                .any(|other| other.id != member.id && other.email == member.email)
            {
                return Err(email_taken(&member.email));
            }

            if let Some(existing) = data.member_mut(member.id) {
                *existing = Member {
                    expiry_date: existing.expiry_date,
                    status: existing.status,
                    photo: existing.photo.take(),
                    created_at: existing.created_at,
                    ..member.clone()
                };
            }

            Ok(())
        })
        .await
    }

    async fn set_member_status(&self, id: i64, status: MemberStatus) -> StoreResult<bool> {
        self.write(|data| {
            Ok(data
                .member_mut(id)
                .map(|member| member.status = status)
                .is_some())
        })
        .await
    }

    async fn set_member_expiry(&self, id: i64, expiry_date: Date) -> StoreResult<bool> {
        self.write(|data| {
            Ok(data
                .member_mut(id)
                .map(|member| member.expiry_date = expiry_date.into())
                .is_some())
        })
        .await
    }

    async fn set_member_photo(&self, id: i64, photo: Option<String>) -> StoreResult<bool> {
        self.write(|data| {
            Ok(data
                .member_mut(id)
                .map(|member| member.photo = photo)
                .is_some())
        })
        .await
    }

    async fn expire_lapsed(&self, today: Date) -> StoreResult<u64> {
        self.write(|data| {
            let mut expired = 0;
            for member in &mut data.members {
                if member.status == MemberStatus::Active && member.expiry_date.0 < today {
                    member.status = MemberStatus::Expired;
                    expired += 1;
                }
            }

            Ok(expired)
        })
        .await
    }

    async fn delete_member(&self, id: i64) -> StoreResult<bool> {
        self.write(|data| {
            let before = data.members.len();
            data.members.retain(|member| member.id != id);
            if data.members.len() == before {
                return Ok(false);
            }

            data.payments.retain(|payment| payment.member_id != id);
            data.attendance.retain(|record| record.member_id != id);

            Ok(true)
        })
        .await
    }

    async fn payments(&self) -> StoreResult<Vec<Payment>> {
        Ok(sorted_payments(self.data.read().await.payments.clone()))
    }

    async fn payment(&self, id: i64) -> StoreResult<Option<Payment>> {
        let data = self.data.read().await;

        Ok(data.payments.iter().find(|payment| payment.id == id).cloned())
    }

    async fn payment_with_transaction_id(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        let data = self.data.read().await;

        Ok(data
            .payments
            .iter()
            .find(|payment| payment.transaction_id == transaction_id)
            .cloned())
    }

    async fn payments_for_member(&self, member_id: i64) -> StoreResult<Vec<Payment>> {
        let data = self.data.read().await;

        Ok(sorted_payments(
            data.payments
                .iter()
                .filter(|payment| payment.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_payment(&self, record: PaymentRecord, today: Date) -> StoreResult<Payment> {
        self.write(|data| {
            if !data.members.iter().any(|member| member.id == record.member_id) {
                return Err(no_member(record.member_id));
            }
            if data
                .payments
                .iter()
                .any(|payment| payment.transaction_id == record.transaction_id)
            {
                return Err(StoreError::Conflict(format!(
                    "A payment with transaction id {} already exists",
                    record.transaction_id
                )));
            }

            data.last_payment_id += 1;
            let payment = record.into_payment(data.last_payment_id);
            if payment.status.is_settled() {
                data.settle(payment.member_id, payment.months, today)?;
            }
            data.payments.push(payment.clone());

            Ok(payment)
        })
        .await
    }

    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        today: Date,
    ) -> StoreResult<Option<Payment>> {
        self.write(|data| {
            let payment = match data.payments.iter_mut().find(|payment| payment.id == id) {
                Some(payment) if payment.status == from => {
                    payment.status = to;
                    payment.clone()
                }
                _ => return Ok(None),
            };

            if !from.is_settled() && to.is_settled() {
                data.settle(payment.member_id, payment.months, today)?;
            }

            Ok(Some(payment))
        })
        .await
    }

    async fn delete_payment(&self, id: i64) -> StoreResult<bool> {
        self.write(|data| {
            let before = data.payments.len();
            data.payments.retain(|payment| payment.id != id);

            Ok(data.payments.len() != before)
        })
        .await
    }

    async fn attendance(&self) -> StoreResult<Vec<Attendance>> {
        Ok(sorted_attendance(self.data.read().await.attendance.clone()))
    }

    async fn attendance_with_id(&self, id: i64) -> StoreResult<Option<Attendance>> {
        let data = self.data.read().await;

        Ok(data.attendance.iter().find(|record| record.id == id).cloned())
    }

    async fn attendance_for_member(&self, member_id: i64) -> StoreResult<Vec<Attendance>> {
        let data = self.data.read().await;

        Ok(sorted_attendance(
            data.attendance
                .iter()
                .filter(|record| record.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    async fn attendance_for_member_on(&self, member_id: i64, date: Date) -> StoreResult<Option<Attendance>> {
        let data = self.data.read().await;

        Ok(data
            .attendance
            .iter()
            .find(|record| record.member_id == member_id && record.date.0 == date)
            .cloned())
    }

    async fn attendance_on(&self, date: Date) -> StoreResult<Vec<Attendance>> {
        let data = self.data.read().await;

        Ok(sorted_attendance(
            data.attendance
                .iter()
                .filter(|record| record.date.0 == date)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_attendance(&self, record: AttendanceRecord) -> StoreResult<Attendance> {
        self.write(|data| {
            if !data.members.iter().any(|member| member.id == record.member_id) {
                return Err(no_member(record.member_id));
            }
            if data
                .attendance
                .iter()
                .any(|other| other.member_id == record.member_id && other.date == record.date)
            {
                return Err(StoreError::Conflict(format!(
                    "Member {} already checked in on {}",
                    record.member_id, record.date.0
                )));
            }

            data.last_attendance_id += 1;
            let attendance = record.into_attendance(data.last_attendance_id);
            data.attendance.push(attendance.clone());

            Ok(attendance)
        })
        .await
    }

    async fn update_attendance(&self, attendance: &Attendance) -> StoreResult<()> {
        self.write(|data| {
            if let Some(existing) = data.attendance.iter_mut().find(|r| r.id == attendance.id) {
                *existing = attendance.clone();
            }

            Ok(())
        })
        .await
    }

    async fn delete_attendance(&self, id: i64) -> StoreResult<bool> {
        self.write(|data| {
            let before = data.attendance.len();
            data.attendance.retain(|record| record.id != id);

            Ok(data.attendance.len() != before)
        })
        .await
    }
}
