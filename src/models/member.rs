use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, warn};

use crate::error::{BarbellError, BarbellResult};
use crate::models::attendance::Attendance;
use crate::models::package::{PackageTier, MAX_MONTHS};
use crate::models::payment::Payment;
use crate::models::photo::{PhotoStorage, PhotoUpload};
use crate::models::{DateScalar, DateTimeScalar};
use crate::store::{self, Store};
use crate::util::{add_days, add_months, current_time, today};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()\-]+$").expect("phone pattern is valid"));

/// Where a member's subscription stands
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "member_status", rename_all = "snake_case")]
pub enum MemberStatus {
    /// Paid up and allowed in
    Active,
    /// Taking a break, no membership running
    Inactive,
    /// The membership ran out
    Expired,
    /// Barred by staff until further notice
    Suspended,
}

#[derive(Clone, Debug, SimpleObject, Serialize, Deserialize, sqlx::FromRow)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// The member's ID, assigned on registration
    pub id: i64,
    /// The member's first name
    pub first_name: String,
    /// The member's last name
    pub last_name: String,
    /// The member's email, which must be unique
    pub email: String,
    /// The member's phone number
    pub phone: String,
    /// Where the member lives
    pub address: Option<String>,
    /// The member's birthday
    pub date_of_birth: Option<DateScalar>,
    /// The member's gender, as they gave it
    pub gender: Option<String>,
    /// Who to call if something goes wrong
    pub emergency_contact: Option<String>,
    /// The package the member is subscribed to
    pub package: PackageTier,
    /// How many months the current term runs for
    pub months: i32,
    /// The undiscounted price of the current term
    pub price: i64,
    /// The discount given on the current term
    pub discount: i64,
    /// What the member actually pays for the current term
    pub final_price: i64,
    /// When the member joined
    pub joining_date: DateScalar,
    /// The last day of the membership
    pub expiry_date: DateScalar,
    /// The stored status (see `effectiveStatus` for expiry-aware status)
    pub status: MemberStatus,
    /// The file name of the member's photo, served under `/photos/`
    pub photo: Option<String>,
    /// When the member was registered
    pub created_at: DateTimeScalar,
}

#[ComplexObject]
impl Member {
    /// The member's full name
    pub async fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The member's status, counting lapsed active memberships as expired
    #[graphql(name = "effectiveStatus")]
    pub async fn current_status(&self) -> MemberStatus {
        self.effective_status(today())
    }

    /// Days left until the membership expires, negative once it has lapsed
    pub async fn days_until_expiry(&self) -> i64 {
        self.days_left(today())
    }

    /// Every payment the member has made, newest first
    pub async fn payments(&self, ctx: &Context<'_>) -> Result<Vec<Payment>> {
        Ok(Payment::for_member(self.id, store::from_ctx(ctx)).await?)
    }

    /// Every check-in the member has made, newest first
    pub async fn attendance(&self, ctx: &Context<'_>) -> Result<Vec<Attendance>> {
        Ok(Attendance::for_member(self.id, store::from_ctx(ctx)).await?)
    }
}

impl Member {
    pub async fn with_id(id: i64, store: &dyn Store) -> BarbellResult<Self> {
        Self::with_id_opt(id, store)
            .await?
            .ok_or_else(|| BarbellError::NotFound(format!("No member with id {}", id)))
    }

    pub async fn with_id_opt(id: i64, store: &dyn Store) -> BarbellResult<Option<Self>> {
        store.member(id).await.map_err(Into::into)
    }

    pub async fn all(filter: MemberFilter, today: Date, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
            .map(str::to_lowercase);

        Ok(store
            .members()
            .await?
            .into_iter()
            .filter(|member| {
                filter
                    .status
                    .map_or(true, |status| member.effective_status(today) == status)
            })
            .filter(|member| search.as_deref().map_or(true, |search| member.matches(search)))
            .collect())
    }

    /// Active members whose membership ends within the next `days` days.
    pub async fn expiring_within(days: i64, today: Date, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        let mut members: Vec<Self> = store
            .members()
            .await?
            .into_iter()
            .filter(|member| member.expires_within(days, today))
            .collect();
        members.sort_by_key(|member| (member.expiry_date, member.id));

        Ok(members)
    }

    pub async fn register(
        new_member: NewMember,
        today: Date,
        photos: &PhotoStorage,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let email = normalize_email(&new_member.email)?;
        if store.member_with_email(&email).await?.is_some() {
            return Err(BarbellError::Conflict(format!(
                "Another member already has the email {}",
                email
            )));
        }

        let first_name = required("first name", &new_member.first_name)?;
        let last_name = required("last name", &new_member.last_name)?;
        let phone = normalize_phone(&new_member.phone)?;
        let (price, final_price) = pricing(new_member.package, new_member.months, new_member.discount)?;

        let joining_date = new_member.joining_date.map(|d| d.0).unwrap_or(today);
        let expiry_date = add_months(joining_date, new_member.months)
            .ok_or_else(|| BarbellError::Invalid("Membership term is out of range".to_owned()))?;
        let status = if expiry_date < today {
            MemberStatus::Expired
        } else {
            MemberStatus::Active
        };

        let photo = match &new_member.photo {
            Some(upload) => Some(photos.save(upload).await?),
            None => None,
        };

        let record = MemberRecord {
            first_name,
            last_name,
            email,
            phone,
            address: optional(new_member.address),
            date_of_birth: new_member.date_of_birth,
            gender: optional(new_member.gender),
            emergency_contact: optional(new_member.emergency_contact),
            package: new_member.package,
            months: new_member.months,
            price,
            discount: new_member.discount,
            final_price,
            joining_date: joining_date.into(),
            expiry_date: expiry_date.into(),
            status,
            photo: photo.clone(),
        };
        let member = match store.insert_member(record).await {
            Ok(member) => member,
            Err(error) => {
                if let Some(photo) = &photo {
                    discard_photo(photos, photo).await;
                }
                return Err(error.into());
            }
        };
        info!(member = member.id, email = %member.email, "registered member");

        Ok(member)
    }

    pub async fn update(
        id: i64,
        update: MemberUpdate,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let mut member = Self::with_id(id, store).await?;

        if let Some(email) = &update.email {
            let email = normalize_email(email)?;
            if email != member.email && store.member_with_email(&email).await?.is_some() {
                return Err(BarbellError::Conflict(format!(
                    "Cannot change email to {}, as another member has that email",
                    email
                )));
            }
            member.email = email;
        }
        if let Some(first_name) = &update.first_name {
            member.first_name = required("first name", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            member.last_name = required("last name", last_name)?;
        }
        if let Some(phone) = &update.phone {
            member.phone = normalize_phone(phone)?;
        }
        if let Some(address) = update.address {
            member.address = optional(Some(address));
        }
        if let Some(date_of_birth) = update.date_of_birth {
            member.date_of_birth = Some(date_of_birth);
        }
        if let Some(gender) = update.gender {
            member.gender = optional(Some(gender));
        }
        if let Some(emergency_contact) = update.emergency_contact {
            member.emergency_contact = optional(Some(emergency_contact));
        }

        if update.package.is_some() || update.months.is_some() || update.discount.is_some() {
            let package = update.package.unwrap_or(member.package);
            let months = update.months.unwrap_or(member.months);
            let discount = update.discount.unwrap_or(member.discount);
            let (price, final_price) = pricing(package, months, discount)?;

            member.package = package;
            member.months = months;
            member.discount = discount;
            member.price = price;
            member.final_price = final_price;
        }

        if let Some(joining_date) = update.joining_date {
            member.joining_date = joining_date;
        }
        if let Some(expiry_date) = update.expiry_date {
            member.expiry_date = expiry_date;
        }
        if member.expiry_date < member.joining_date {
            return Err(BarbellError::Invalid(
                "Expiry date cannot be before the joining date".to_owned(),
            ));
        }

        store.update_member(&member).await?;
        if let Some(expiry_date) = update.expiry_date {
            store.set_member_expiry(id, expiry_date.0).await?;
        }
        info!(member = member.id, "updated member");

        Self::with_id(id, store).await
    }

    pub async fn set_status(id: i64, status: MemberStatus, store: &dyn Store) -> BarbellResult<Self> {
        if !store.set_member_status(id, status).await? {
            return Err(BarbellError::NotFound(format!("No member with id {}", id)));
        }
        info!(member = id, status = ?status, "changed member status");

        Self::with_id(id, store).await
    }

    pub async fn set_photo(
        id: i64,
        upload: PhotoUpload,
        photos: &PhotoStorage,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let mut member = Self::with_id(id, store).await?;
        let photo = photos.save(&upload).await?;
        match store.set_member_photo(id, Some(photo.clone())).await {
            Ok(true) => {}
            Ok(false) => {
                discard_photo(photos, &photo).await;
                return Err(BarbellError::NotFound(format!("No member with id {}", id)));
            }
            Err(error) => {
                discard_photo(photos, &photo).await;
                return Err(error.into());
            }
        }

        let old_photo = member.photo.replace(photo);
        if let Some(old_photo) = old_photo {
            if let Err(error) = photos.remove(&old_photo).await {
                warn!(member = id, photo = %old_photo, %error, "failed to remove replaced photo");
            }
        }

        Ok(member)
    }

    /// Deletes the member along with their payments and attendance.
    pub async fn delete(id: i64, photos: &PhotoStorage, store: &dyn Store) -> BarbellResult<()> {
        let member = Self::with_id(id, store).await?;
        store.delete_member(id).await?;
        info!(member = id, "deleted member");

        if let Some(photo) = &member.photo {
            if let Err(error) = photos.remove(photo).await {
                warn!(member = id, %photo, %error, "failed to remove photo of deleted member");
            }
        }

        Ok(())
    }

    /// Marks every active member whose membership has lapsed as expired,
    /// returning how many were changed.
    pub async fn expire_lapsed(today: Date, store: &dyn Store) -> BarbellResult<u64> {
        store.expire_lapsed(today).await.map_err(Into::into)
    }

    pub fn effective_status(&self, today: Date) -> MemberStatus {
        if self.status == MemberStatus::Active && self.expiry_date.0 < today {
            MemberStatus::Expired
        } else {
            self.status
        }
    }

    pub fn days_left(&self, today: Date) -> i64 {
        (self.expiry_date.0 - today).whole_days()
    }

    pub fn expires_within(&self, days: i64, today: Date) -> bool {
        self.status == MemberStatus::Active
            && self.expiry_date.0 >= today
            && self.expiry_date.0 <= add_days(today, days)
    }

    /// Pushes the expiry date out by `months`, counting from today if the
    /// membership already lapsed. Lapsed and inactive memberships come back
    /// to life; suspensions stay in place.
    pub fn extend(&mut self, months: i32, today: Date) -> BarbellResult<()> {
        let base = self.expiry_date.0.max(today);
        let expiry_date = add_months(base, months)
            .ok_or_else(|| BarbellError::Invalid("Membership term is out of range".to_owned()))?;

        self.expiry_date = expiry_date.into();
        if matches!(self.status, MemberStatus::Expired | MemberStatus::Inactive) {
            self.status = MemberStatus::Active;
        }

        Ok(())
    }

    fn matches(&self, search: &str) -> bool {
        self.first_name.to_lowercase().contains(search)
            || self.last_name.to_lowercase().contains(search)
            || self.full_name_lowercase().contains(search)
            || self.email.contains(search)
            || self.phone.contains(search)
    }

    fn full_name_lowercase(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).to_lowercase()
    }
}

/// A member as it is handed to a store for insertion, before it has an ID.
#[derive(Clone, Debug)]
pub struct MemberRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub date_of_birth: Option<DateScalar>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
    pub package: PackageTier,
    pub months: i32,
    pub price: i64,
    pub discount: i64,
    pub final_price: i64,
    pub joining_date: DateScalar,
    pub expiry_date: DateScalar,
    pub status: MemberStatus,
    pub photo: Option<String>,
}

impl MemberRecord {
    pub fn into_member(self, id: i64) -> Member {
        Member {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            emergency_contact: self.emergency_contact,
            package: self.package,
            months: self.months,
            price: self.price,
            discount: self.discount,
            final_price: self.final_price,
            joining_date: self.joining_date,
            expiry_date: self.expiry_date,
            status: self.status,
            photo: self.photo,
            created_at: current_time().into(),
        }
    }
}

#[derive(InputObject)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub date_of_birth: Option<DateScalar>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
    pub package: PackageTier,
    #[graphql(default = 1)]
    pub months: i32,
    #[graphql(default = 0)]
    pub discount: i64,
    /// Defaults to today
    pub joining_date: Option<DateScalar>,
    pub photo: Option<PhotoUpload>,
}

/// A partial update; omitted fields are left alone and empty strings clear
/// optional text fields.
#[derive(InputObject, Default)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<DateScalar>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
    pub package: Option<PackageTier>,
    pub months: Option<i32>,
    pub discount: Option<i64>,
    pub joining_date: Option<DateScalar>,
    pub expiry_date: Option<DateScalar>,
}

#[derive(InputObject, Default)]
pub struct MemberFilter {
    /// Only members with this (expiry-aware) status
    pub status: Option<MemberStatus>,
    /// Case-insensitive match against name, email or phone
    pub search: Option<String>,
}

/// Computes `(price, final_price)` for a term.
pub fn pricing(package: PackageTier, months: i32, discount: i64) -> BarbellResult<(i64, i64)> {
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(BarbellError::Invalid(format!(
            "A membership must run for between 1 and {} months",
            MAX_MONTHS
        )));
    }

    let price = package.price_for(months);
    if discount < 0 || discount > price {
        return Err(BarbellError::Invalid(format!(
            "Discount must be between 0 and the package price of {}",
            price
        )));
    }

    Ok((price, price - discount))
}

/// Removes a photo that was saved for a change that didn't go through.
async fn discard_photo(photos: &PhotoStorage, photo: &str) {
    if let Err(error) = photos.remove(photo).await {
        warn!(%photo, %error, "failed to remove unused photo");
    }
}

fn normalize_email(email: &str) -> BarbellResult<String> {
    let email = email.trim().to_lowercase();
    if EMAIL_REGEX.is_match(&email) {
        Ok(email)
    } else {
        Err(BarbellError::Invalid(format!("{} is not a valid email", email)))
    }
}

fn normalize_phone(phone: &str) -> BarbellResult<String> {
    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if PHONE_REGEX.is_match(phone) && (7..=15).contains(&digits) {
        Ok(phone.to_owned())
    } else {
        Err(BarbellError::Invalid(format!("{} is not a valid phone number", phone)))
    }
}

fn required(field: &str, value: &str) -> BarbellResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(BarbellError::Invalid(format!("The {} cannot be empty", field)))
    } else {
        Ok(value.to_owned())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::store::json::JsonStore;
    use crate::tests::mock::{mock_member, mock_new_member, mock_photos};

    #[test]
    fn pricing_applies_discount() {
        assert_eq!(pricing(PackageTier::Standard, 3, 20).unwrap(), (150, 130));
        assert_eq!(pricing(PackageTier::Basic, 1, 30).unwrap(), (30, 0));
    }

    #[test]
    fn pricing_rejects_bad_terms() {
        assert!(pricing(PackageTier::Basic, 0, 0).is_err());
        assert!(pricing(PackageTier::Basic, MAX_MONTHS + 1, 0).is_err());
        assert!(pricing(PackageTier::Elite, MAX_MONTHS, 0).is_ok());
        assert!(pricing(PackageTier::Basic, 1, 31).is_err());
        assert!(pricing(PackageTier::Basic, 1, -5).is_err());
    }

    #[test]
    fn active_member_past_expiry_reads_as_expired() {
        let member = mock_member(1, date!(2024 - 01 - 01), date!(2024 - 02 - 01));

        assert_eq!(member.effective_status(date!(2024 - 02 - 01)), MemberStatus::Active);
        assert_eq!(member.effective_status(date!(2024 - 02 - 02)), MemberStatus::Expired);
        assert_eq!(member.days_left(date!(2024 - 01 - 25)), 7);
        assert_eq!(member.days_left(date!(2024 - 02 - 03)), -2);
    }

    #[test]
    fn suspended_member_stays_suspended() {
        let mut member = mock_member(1, date!(2024 - 01 - 01), date!(2024 - 02 - 01));
        member.status = MemberStatus::Suspended;

        assert_eq!(member.effective_status(date!(2024 - 03 - 01)), MemberStatus::Suspended);
        member.extend(1, date!(2024 - 03 - 01)).unwrap();
        assert_eq!(member.status, MemberStatus::Suspended);
        assert_eq!(member.expiry_date.0, date!(2024 - 04 - 01));
    }

    #[test]
    fn extend_counts_from_expiry_when_still_running() {
        let mut member = mock_member(1, date!(2024 - 01 - 01), date!(2024 - 02 - 01));
        member.extend(2, date!(2024 - 01 - 20)).unwrap();

        assert_eq!(member.expiry_date.0, date!(2024 - 04 - 01));
    }

    #[test]
    fn extend_counts_from_today_and_revives_lapsed_membership() {
        let mut member = mock_member(1, date!(2024 - 01 - 01), date!(2024 - 02 - 01));
        member.status = MemberStatus::Expired;
        member.extend(1, date!(2024 - 03 - 10)).unwrap();

        assert_eq!(member.expiry_date.0, date!(2024 - 04 - 10));
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[test]
    fn expiry_window_is_inclusive() {
        let member = mock_member(1, date!(2024 - 01 - 01), date!(2024 - 02 - 01));

        assert!(member.expires_within(7, date!(2024 - 01 - 25)));
        assert!(member.expires_within(0, date!(2024 - 02 - 01)));
        assert!(!member.expires_within(6, date!(2024 - 01 - 25)));
        assert!(!member.expires_within(7, date!(2024 - 02 - 02)));
    }

    #[tokio::test]
    async fn register_computes_price_and_expiry() {
        let store = JsonStore::in_memory();
        let mut new_member = mock_new_member("ada@example.com");
        new_member.package = PackageTier::Premium;
        new_member.months = 3;
        new_member.discount = 40;
        new_member.email = "  Ada@Example.com ".to_owned();

        let member = Member::register(new_member, date!(2024 - 01 - 31), &mock_photos(), &store)
            .await
            .unwrap();

        assert_eq!(member.email, "ada@example.com");
        assert_eq!(member.price, 240);
        assert_eq!(member.final_price, 200);
        assert_eq!(member.joining_date.0, date!(2024 - 01 - 31));
        assert_eq!(member.expiry_date.0, date!(2024 - 04 - 30));
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_and_bad_input() {
        let store = JsonStore::in_memory();
        let today = date!(2024 - 01 - 01);
        Member::register(mock_new_member("ada@example.com"), today, &mock_photos(), &store)
            .await
            .unwrap();

        let duplicate =
            Member::register(mock_new_member("ADA@example.com"), today, &mock_photos(), &store).await;
        assert!(matches!(duplicate, Err(BarbellError::Conflict(_))));

        let mut bad_phone = mock_new_member("grace@example.com");
        bad_phone.phone = "12ab".to_owned();
        let result = Member::register(bad_phone, today, &mock_photos(), &store).await;
        assert!(matches!(result, Err(BarbellError::Invalid(_))));

        let result =
            Member::register(mock_new_member("not-an-email"), today, &mock_photos(), &store).await;
        assert!(matches!(result, Err(BarbellError::Invalid(_))));
    }

    #[tokio::test]
    async fn backdated_registration_starts_expired() {
        let store = JsonStore::in_memory();
        let mut new_member = mock_new_member("old@example.com");
        new_member.joining_date = Some(date!(2023 - 01 - 01).into());

        let member = Member::register(new_member, date!(2024 - 01 - 01), &mock_photos(), &store)
            .await
            .unwrap();

        assert_eq!(member.status, MemberStatus::Expired);
    }

    #[tokio::test]
    async fn update_recomputes_pricing_and_checks_email() {
        let store = JsonStore::in_memory();
        let today = date!(2024 - 01 - 01);
        let ada = Member::register(mock_new_member("ada@example.com"), today, &mock_photos(), &store)
            .await
            .unwrap();
        Member::register(mock_new_member("grace@example.com"), today, &mock_photos(), &store)
            .await
            .unwrap();

        let taken = Member::update(
            ada.id,
            MemberUpdate {
                email: Some("grace@example.com".to_owned()),
                ..Default::default()
            },
            &store,
        )
        .await;
        assert!(matches!(taken, Err(BarbellError::Conflict(_))));

        let updated = Member::update(
            ada.id,
            MemberUpdate {
                package: Some(PackageTier::Elite),
                months: Some(2),
                address: Some("  ".to_owned()),
                ..Default::default()
            },
            &store,
        )
        .await
        .unwrap();
        assert_eq!(updated.price, 240);
        assert_eq!(updated.final_price, 240);
        assert_eq!(updated.address, None);
    }

    #[tokio::test]
    async fn search_and_status_filters() {
        let store = JsonStore::in_memory();
        let today = date!(2024 - 06 - 01);
        let mut lapsed = mock_new_member("lapsed@example.com");
        lapsed.first_name = "Linus".to_owned();
        lapsed.joining_date = Some(date!(2024 - 01 - 01).into());
        Member::register(lapsed, today, &mock_photos(), &store).await.unwrap();
        Member::register(mock_new_member("ada@example.com"), today, &mock_photos(), &store)
            .await
            .unwrap();

        let expired = Member::all(
            MemberFilter {
                status: Some(MemberStatus::Expired),
                search: None,
            },
            today,
            &store,
        )
        .await
        .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].email, "lapsed@example.com");

        let found = Member::all(
            MemberFilter {
                status: None,
                search: Some("ADA@".to_owned()),
            },
            today,
            &store,
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "ada@example.com");
    }

    #[tokio::test]
    async fn expire_lapsed_persists_status() {
        let store = JsonStore::in_memory();
        Member::register(
            mock_new_member("ada@example.com"),
            date!(2024 - 01 - 01),
            &mock_photos(),
            &store,
        )
        .await
        .unwrap();

        assert_eq!(Member::expire_lapsed(date!(2024 - 02 - 01), &store).await.unwrap(), 0);
        assert_eq!(Member::expire_lapsed(date!(2024 - 02 - 02), &store).await.unwrap(), 1);

        let members = store.members().await.unwrap();
        assert_eq!(members[0].status, MemberStatus::Expired);
    }

    #[tokio::test]
    async fn register_refuses_absurd_terms() {
        let store = JsonStore::in_memory();
        let mut new_member = mock_new_member("ada@example.com");
        new_member.months = i32::MAX;

        let result = Member::register(new_member, date!(2024 - 01 - 01), &mock_photos(), &store).await;
        assert!(matches!(result, Err(BarbellError::Invalid(_))));
        assert!(store.members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_checks_expiry_against_joining_date() {
        let store = JsonStore::in_memory();
        let ada = Member::register(
            mock_new_member("ada@example.com"),
            date!(2024 - 01 - 01),
            &mock_photos(),
            &store,
        )
        .await
        .unwrap();

        let backwards = Member::update(
            ada.id,
            MemberUpdate {
                expiry_date: Some(date!(2023 - 12 - 31).into()),
                ..Default::default()
            },
            &store,
        )
        .await;
        assert!(matches!(backwards, Err(BarbellError::Invalid(_))));

        let moved = Member::update(
            ada.id,
            MemberUpdate {
                expiry_date: Some(date!(2024 - 06 - 30).into()),
                ..Default::default()
            },
            &store,
        )
        .await
        .unwrap();
        assert_eq!(moved.expiry_date.0, date!(2024 - 06 - 30));
        assert_eq!(
            Member::with_id(ada.id, &store).await.unwrap().expiry_date.0,
            date!(2024 - 06 - 30)
        );
    }

    #[tokio::test]
    async fn set_status_needs_an_existing_member() {
        let store = JsonStore::in_memory();
        let ada = Member::register(
            mock_new_member("ada@example.com"),
            date!(2024 - 01 - 01),
            &mock_photos(),
            &store,
        )
        .await
        .unwrap();

        let suspended = Member::set_status(ada.id, MemberStatus::Suspended, &store)
            .await
            .unwrap();
        assert_eq!(suspended.status, MemberStatus::Suspended);

        let missing = Member::set_status(404, MemberStatus::Active, &store).await;
        assert!(matches!(missing, Err(BarbellError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_registration_leaves_no_photo_behind() {
        let data_dir = tempfile::tempdir().unwrap();
        let photo_dir = tempfile::tempdir().unwrap();
        let path = data_dir.path().join("gym.json");
        let store = JsonStore::open(&path).await.unwrap();
        // saving fails while a directory sits where the temp file goes
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        let mut new_member = mock_new_member("ada@example.com");
        new_member.photo = Some(PhotoUpload {
            file_name: "ada.png".to_owned(),
            content: base64::encode(b"png bytes"),
        });
        let photos = PhotoStorage::new(photo_dir.path());

        let result = Member::register(new_member, date!(2024 - 01 - 01), &photos, &store).await;
        assert!(matches!(result, Err(BarbellError::Store(_))));
        assert_eq!(std::fs::read_dir(photo_dir.path()).unwrap().count(), 0);
    }
}
