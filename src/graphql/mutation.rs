use async_graphql::{Context, Object, Result};

use crate::graphql::guards::StaffOnly;
use crate::graphql::SUCCESS_MESSAGE;
use crate::models::attendance::Attendance;
use crate::models::member::{Member, MemberStatus, MemberUpdate, NewMember};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};
use crate::models::photo::{PhotoStorage, PhotoUpload};
use crate::models::{DateScalar, TimeScalar};
use crate::store;
use crate::util::{time_of_day, today};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Registers a new member
    #[graphql(guard = "StaffOnly")]
    pub async fn register_member(&self, ctx: &Context<'_>, new_member: NewMember) -> Result<Member> {
        let photos: &PhotoStorage = ctx.data_unchecked();
        Ok(Member::register(new_member, today(), photos, store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn update_member(&self, ctx: &Context<'_>, id: i64, update: MemberUpdate) -> Result<Member> {
        Ok(Member::update(id, update, store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn set_member_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: MemberStatus,
    ) -> Result<Member> {
        Ok(Member::set_status(id, status, store::from_ctx(ctx)).await?)
    }

    /// Deletes a member with all of their payments and attendance
    #[graphql(guard = "StaffOnly")]
    pub async fn delete_member(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let photos: &PhotoStorage = ctx.data_unchecked();
        Member::delete(id, photos, store::from_ctx(ctx)).await?;

        Ok(SUCCESS_MESSAGE)
    }

    /// Replaces the member's photo
    #[graphql(guard = "StaffOnly")]
    pub async fn upload_member_photo(
        &self,
        ctx: &Context<'_>,
        id: i64,
        photo: PhotoUpload,
    ) -> Result<Member> {
        let photos: &PhotoStorage = ctx.data_unchecked();
        Ok(Member::set_photo(id, photo, photos, store::from_ctx(ctx)).await?)
    }

    /// Records a payment; settled payments extend the membership right away
    #[graphql(guard = "StaffOnly")]
    pub async fn record_payment(&self, ctx: &Context<'_>, new_payment: NewPayment) -> Result<Payment> {
        Ok(Payment::record(new_payment, today(), store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn set_payment_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Payment> {
        Ok(Payment::set_status(id, status, today(), store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn delete_payment(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        Payment::delete(id, store::from_ctx(ctx)).await?;

        Ok(SUCCESS_MESSAGE)
    }

    /// Checks a member in, defaulting to now
    #[graphql(guard = "StaffOnly")]
    pub async fn check_in(
        &self,
        ctx: &Context<'_>,
        member_id: i64,
        date: Option<DateScalar>,
        time: Option<TimeScalar>,
    ) -> Result<Attendance> {
        let today = today();
        let date = date.map_or(today, |date| date.0);
        let time = time.map_or_else(time_of_day, |time| time.0);

        Ok(Attendance::check_in(member_id, date, time, today, store::from_ctx(ctx)).await?)
    }

    /// Checks a member out, defaulting to now
    #[graphql(guard = "StaffOnly")]
    pub async fn check_out(
        &self,
        ctx: &Context<'_>,
        member_id: i64,
        date: Option<DateScalar>,
        time: Option<TimeScalar>,
    ) -> Result<Attendance> {
        let date = date.map_or_else(today, |date| date.0);
        let time = time.map_or_else(time_of_day, |time| time.0);

        Ok(Attendance::check_out(member_id, date, time, store::from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn delete_attendance(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        Attendance::delete(id, store::from_ctx(ctx)).await?;

        Ok(SUCCESS_MESSAGE)
    }

    /// Marks every lapsed membership as expired now instead of waiting for
    /// the background sweep, returning how many changed
    #[graphql(guard = "StaffOnly")]
    pub async fn expire_lapsed_memberships(&self, ctx: &Context<'_>) -> Result<i32> {
        let expired = Member::expire_lapsed(today(), store::from_ctx(ctx)).await?;

        Ok(i32::try_from(expired).unwrap_or(i32::MAX))
    }
}
