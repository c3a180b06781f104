use async_graphql::{Context, Object, Result};

use crate::config::Config;
use crate::graphql::guards::StaffOnly;
use crate::models::attendance::{Attendance, AttendanceFilter};
use crate::models::dashboard::{DashboardStats, DateRange, StatsRange};
use crate::models::member::{Member, MemberFilter, MemberStatus};
use crate::models::package::Package;
use crate::models::payment::{Payment, PaymentFilter};
use crate::models::DateScalar;
use crate::store;
use crate::util::today;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The packages the gym sells
    pub async fn packages(&self) -> Vec<Package> {
        Package::all()
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn member(&self, ctx: &Context<'_>, id: i64) -> Result<Member> {
        Ok(Member::with_id(id, store::from_ctx(ctx)).await?)
    }

    /// Members ordered by last name, optionally filtered
    #[graphql(guard = "StaffOnly")]
    pub async fn members(
        &self,
        ctx: &Context<'_>,
        status: Option<MemberStatus>,
        search: Option<String>,
    ) -> Result<Vec<Member>> {
        let filter = MemberFilter { status, search };
        Ok(Member::all(filter, today(), store::from_ctx(ctx)).await?)
    }

    /// Active members whose membership ends soon, soonest first
    #[graphql(guard = "StaffOnly")]
    pub async fn expiring_members(
        &self,
        ctx: &Context<'_>,
        #[graphql(desc = "Defaults to the configured expiry window")] within_days: Option<i64>,
    ) -> Result<Vec<Member>> {
        let days = match within_days {
            Some(days) if days < 0 => return Err("The window cannot be negative".into()),
            Some(days) => days,
            None => ctx.data_unchecked::<Config>().expiring_window_days,
        };

        Ok(Member::expiring_within(days, today(), store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn payment(&self, ctx: &Context<'_>, id: i64) -> Result<Payment> {
        Ok(Payment::with_id(id, store::from_ctx(ctx)).await?)
    }

    /// Payments newest first
    #[graphql(guard = "StaffOnly")]
    pub async fn payments(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: PaymentFilter,
    ) -> Result<Vec<Payment>> {
        Ok(Payment::all(filter, store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn attendance(&self, ctx: &Context<'_>, id: i64) -> Result<Attendance> {
        Ok(Attendance::with_id(id, store::from_ctx(ctx)).await?)
    }

    /// Check-ins newest first
    #[graphql(guard = "StaffOnly")]
    pub async fn attendance_records(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: AttendanceFilter,
    ) -> Result<Vec<Attendance>> {
        Ok(Attendance::all(filter, store::from_ctx(ctx)).await?)
    }

    /// Everyone who checked in on a day, today by default
    #[graphql(guard = "StaffOnly")]
    pub async fn attendance_on(&self, ctx: &Context<'_>, date: Option<DateScalar>) -> Result<Vec<Attendance>> {
        let date = date.map_or_else(today, |date| date.0);
        Ok(Attendance::on_date(date, store::from_ctx(ctx)).await?)
    }

    /// Statistics for the dashboard. An explicit `from` or `to` replaces the
    /// preset range.
    #[graphql(guard = "StaffOnly")]
    pub async fn dashboard(
        &self,
        ctx: &Context<'_>,
        #[graphql(default_with = "StatsRange::Month")] range: StatsRange,
        from: Option<DateScalar>,
        to: Option<DateScalar>,
    ) -> Result<DashboardStats> {
        let today = today();
        let range = DateRange::resolve(range, from.map(|d| d.0), to.map(|d| d.0), today)?;
        let window_days = ctx.data_unchecked::<Config>().expiring_window_days;

        Ok(DashboardStats::load(range, today, window_days, store::from_ctx(ctx)).await?)
    }
}
