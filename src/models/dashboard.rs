//! Front desk statistics: member counts, revenue and attendance over a
//! date range.

use async_graphql::{Enum, SimpleObject};
use time::Date;

use crate::error::{BarbellError, BarbellResult};
use crate::models::attendance::{Attendance, AttendanceStatus};
use crate::models::member::{Member, MemberStatus};
use crate::models::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::models::DateScalar;
use crate::store::Store;
use crate::util::{add_days, first_of_month, first_of_year};

/// Preset ranges for the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum StatsRange {
    Today,
    /// The last seven days, including today
    Week,
    /// The current calendar month up to today
    Month,
    /// The current calendar year up to today
    Year,
    All,
}

/// An inclusive range of days, open on either end when a bound is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn preset(range: StatsRange, today: Date) -> Self {
        let start = match range {
            StatsRange::Today => Some(today),
            StatsRange::Week => Some(add_days(today, -6)),
            StatsRange::Month => Some(first_of_month(today)),
            StatsRange::Year => Some(first_of_year(today)),
            StatsRange::All => None,
        };
        let end = match range {
            StatsRange::All => None,
            _ => Some(today),
        };

        Self { start, end }
    }

    /// Resolves the range the dashboard was asked for; explicit bounds win
    /// over the preset.
    pub fn resolve(
        range: StatsRange,
        from: Option<Date>,
        to: Option<Date>,
        today: Date,
    ) -> BarbellResult<Self> {
        if from.is_none() && to.is_none() {
            return Ok(Self::preset(range, today));
        }

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(BarbellError::Invalid(
                    "The start of the range must not be after its end".to_owned(),
                ));
            }
        }

        Ok(Self { start: from, end: to })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct MethodRevenue {
    /// How the payments were made
    pub method: PaymentMethod,
    /// How many settled payments used this method
    pub count: i32,
    /// The total of those payments
    pub amount: i64,
}

#[derive(SimpleObject, Clone, Debug, PartialEq)]
pub struct DashboardStats {
    /// The first day counted, if the range is bounded
    pub range_start: Option<DateScalar>,
    /// The last day counted, if the range is bounded
    pub range_end: Option<DateScalar>,

    pub total_members: i32,
    pub active_members: i32,
    pub expired_members: i32,
    pub inactive_members: i32,
    pub suspended_members: i32,
    /// Members who joined within the range
    pub new_members: i32,
    /// Active members whose membership ends within the expiry window
    pub expiring_soon: i32,

    /// Every settled payment ever recorded
    pub total_revenue: i64,
    /// Settled payments made within the range
    pub revenue: i64,
    /// Payments still waiting on staff review
    pub pending_payments: i32,
    pub pending_amount: i64,
    /// Settled revenue within the range, split by payment method
    pub revenue_by_method: Vec<MethodRevenue>,

    /// Check-ins within the range
    pub attendance_count: i32,
    pub today_attendance: i32,
    /// Members checked in today who haven't checked out
    pub checked_in_now: i32,
}

impl DashboardStats {
    pub async fn load(
        range: DateRange,
        today: Date,
        window_days: i64,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let members = store.members().await?;
        let payments = store.payments().await?;
        let attendance = store.attendance().await?;

        Ok(Self::compute(
            &members,
            &payments,
            &attendance,
            today,
            range,
            window_days,
        ))
    }

    pub fn compute(
        members: &[Member],
        payments: &[Payment],
        attendance: &[Attendance],
        today: Date,
        range: DateRange,
        window_days: i64,
    ) -> Self {
        let count_status = |status: MemberStatus| {
            count(members.iter().filter(|m| m.effective_status(today) == status))
        };

        let settled = || payments.iter().filter(|p| p.status.is_settled());
        let settled_in_range = || settled().filter(|p| range.contains(p.paid_on.0));
        let pending = || payments.iter().filter(|p| p.status == PaymentStatus::Pending);

        let revenue_by_method = PaymentMethod::ALL
            .iter()
            .filter_map(|&method| {
                let (payment_count, amount) = settled_in_range()
                    .filter(|p| p.method == method)
                    .fold((0i32, 0i64), |(n, total), p| {
                        (n.saturating_add(1), total.saturating_add(p.amount))
                    });

                (payment_count > 0).then(|| MethodRevenue {
                    method,
                    count: payment_count,
                    amount,
                })
            })
            .collect();

        let todays_visits = || attendance.iter().filter(|a| a.date.0 == today);

        Self {
            range_start: range.start.map(DateScalar),
            range_end: range.end.map(DateScalar),

            total_members: count(members.iter()),
            active_members: count_status(MemberStatus::Active),
            expired_members: count_status(MemberStatus::Expired),
            inactive_members: count_status(MemberStatus::Inactive),
            suspended_members: count_status(MemberStatus::Suspended),
            new_members: count(members.iter().filter(|m| range.contains(m.joining_date.0))),
            expiring_soon: count(members.iter().filter(|m| m.expires_within(window_days, today))),

            total_revenue: sum(settled()),
            revenue: sum(settled_in_range()),
            pending_payments: count(pending()),
            pending_amount: sum(pending()),
            revenue_by_method,

            attendance_count: count(attendance.iter().filter(|a| range.contains(a.date.0))),
            today_attendance: count(todays_visits()),
            checked_in_now: count(todays_visits().filter(|a| a.status == AttendanceStatus::Active)),
        }
    }
}

fn count<T>(items: impl Iterator<Item = T>) -> i32 {
    i32::try_from(items.count()).unwrap_or(i32::MAX)
}

/// Adds up payment amounts, stopping at `i64::MAX` instead of overflowing.
fn sum<'a>(payments: impl Iterator<Item = &'a Payment>) -> i64 {
    payments.fold(0, |total, p| total.saturating_add(p.amount))
}
