use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject};
use serde::{Deserialize, Serialize};
use time::{Date, Time};
use tracing::info;

use crate::error::{BarbellError, BarbellResult};
use crate::models::member::{Member, MemberStatus};
use crate::models::{DateScalar, TimeScalar};
use crate::store::{self, Store};

/// Whether the member is still in the building
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Checked in, not yet checked out
    Active,
    /// Checked in and out
    Completed,
}

#[derive(Clone, Debug, SimpleObject, Serialize, Deserialize, sqlx::FromRow)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// The ID of the attendance record
    pub id: i64,
    /// The ID of the member who came in
    pub member_id: i64,
    /// The day of the visit
    pub date: DateScalar,
    /// When the member checked in
    #[graphql(skip)]
    pub check_in: TimeScalar,
    /// When the member checked out, if they have
    #[graphql(skip)]
    pub check_out: Option<TimeScalar>,
    /// Whether the member is still in the building
    pub status: AttendanceStatus,
}

#[ComplexObject]
impl Attendance {
    /// The member who came in
    pub async fn member(&self, ctx: &Context<'_>) -> Result<Member> {
        Ok(Member::with_id(self.member_id, store::from_ctx(ctx)).await?)
    }

    /// When the member checked in
    #[graphql(name = "checkIn")]
    pub async fn check_in_field(&self) -> TimeScalar {
        self.check_in
    }

    /// When the member checked out, if they have
    #[graphql(name = "checkOut")]
    pub async fn check_out_field(&self) -> Option<TimeScalar> {
        self.check_out
    }

    /// How long the visit lasted, once the member has checked out
    pub async fn duration_minutes(&self) -> Option<i64> {
        self.minutes_stayed()
    }
}

impl Attendance {
    pub async fn with_id(id: i64, store: &dyn Store) -> BarbellResult<Self> {
        store
            .attendance_with_id(id)
            .await?
            .ok_or_else(|| BarbellError::NotFound(format!("No attendance with id {}", id)))
    }

    pub async fn for_member(member_id: i64, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        // verify exists
        Member::with_id(member_id, store).await?;

        store.attendance_for_member(member_id).await.map_err(Into::into)
    }

    pub async fn on_date(date: Date, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        store.attendance_on(date).await.map_err(Into::into)
    }

    pub async fn all(filter: AttendanceFilter, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(BarbellError::Invalid(
                    "The start of the range must not be after its end".to_owned(),
                ));
            }
        }

        let records = match filter.member_id {
            Some(member_id) => Self::for_member(member_id, store).await?,
            None => store.attendance().await?,
        };

        Ok(records
            .into_iter()
            .filter(|record| filter.from.map_or(true, |from| record.date >= from))
            .filter(|record| filter.to.map_or(true, |to| record.date <= to))
            .collect())
    }

    /// Checks a member in. Only members with a running membership get in, and
    /// only once per day.
    pub async fn check_in(
        member_id: i64,
        date: Date,
        time: Time,
        today: Date,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let member = Member::with_id(member_id, store).await?;
        match member.effective_status(today) {
            MemberStatus::Active => {}
            MemberStatus::Expired => {
                return Err(BarbellError::Conflict(format!(
                    "The membership of {} {} expired on {}",
                    member.first_name, member.last_name, member.expiry_date.0
                )))
            }
            MemberStatus::Suspended => {
                return Err(BarbellError::Conflict(format!(
                    "{} {} is suspended",
                    member.first_name, member.last_name
                )))
            }
            MemberStatus::Inactive => {
                return Err(BarbellError::Conflict(format!(
                    "{} {} has no running membership",
                    member.first_name, member.last_name
                )))
            }
        }

        if store
            .attendance_for_member_on(member_id, date)
            .await?
            .is_some()
        {
            return Err(BarbellError::Conflict(format!(
                "{} {} already checked in on {}",
                member.first_name, member.last_name, date
            )));
        }

        let record = store
            .insert_attendance(AttendanceRecord {
                member_id,
                date: date.into(),
                check_in: time.into(),
            })
            .await?;
        info!(member = member_id, attendance = record.id, "checked in");

        Ok(record)
    }

    pub async fn check_out(member_id: i64, date: Date, time: Time, store: &dyn Store) -> BarbellResult<Self> {
        Member::with_id(member_id, store).await?;

        let mut record = store
            .attendance_for_member_on(member_id, date)
            .await?
            .ok_or_else(|| {
                BarbellError::NotFound(format!(
                    "Member {} did not check in on {}",
                    member_id, date
                ))
            })?;
        if record.status == AttendanceStatus::Completed {
            return Err(BarbellError::Conflict(format!(
                "Member {} already checked out on {}",
                member_id, date
            )));
        }
        if time < record.check_in.0 {
            return Err(BarbellError::Invalid(
                "Check-out cannot be before check-in".to_owned(),
            ));
        }

        record.check_out = Some(time.into());
        record.status = AttendanceStatus::Completed;
        store.update_attendance(&record).await?;
        info!(member = member_id, attendance = record.id, "checked out");

        Ok(record)
    }

    pub async fn delete(id: i64, store: &dyn Store) -> BarbellResult<()> {
        if store.delete_attendance(id).await? {
            info!(attendance = id, "deleted attendance");
            Ok(())
        } else {
            Err(BarbellError::NotFound(format!("No attendance with id {}", id)))
        }
    }

    pub fn minutes_stayed(&self) -> Option<i64> {
        self.check_out
            .map(|check_out| (check_out.0 - self.check_in.0).whole_minutes())
    }
}

/// A check-in as it is handed to a store for insertion, before it has an ID.
#[derive(Clone, Debug)]
pub struct AttendanceRecord {
    pub member_id: i64,
    pub date: DateScalar,
    pub check_in: TimeScalar,
}

impl AttendanceRecord {
    pub fn into_attendance(self, id: i64) -> Attendance {
        Attendance {
            id,
            member_id: self.member_id,
            date: self.date,
            check_in: self.check_in,
            check_out: None,
            status: AttendanceStatus::Active,
        }
    }
}

#[derive(InputObject, Default)]
pub struct AttendanceFilter {
    pub member_id: Option<i64>,
    /// The first day to include
    pub from: Option<DateScalar>,
    /// The last day to include
    pub to: Option<DateScalar>,
}
