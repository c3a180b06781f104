use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::error::{BarbellError, BarbellResult};
use crate::models::member::Member;
use crate::models::package::MAX_MONTHS;
use crate::models::{DateScalar, DateTimeScalar};
use crate::store::{self, Store};
use crate::util::current_time;

/// How a payment was made
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Mobile,
    Online,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::Mobile,
        PaymentMethod::Online,
    ];
}

/// Where a payment is in its review
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Recorded but not yet checked by staff
    Pending,
    /// Checked and accepted
    Approved,
    /// Checked and refused, the membership is not extended
    Rejected,
    /// The money is in hand
    Completed,
}

impl PaymentStatus {
    /// Whether the payment counts as revenue and extends the membership.
    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Completed)
    }

    pub fn can_become(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        match (self, next) {
            (current, next) if current == next => true,
            (Pending, Approved | Rejected | Completed) => true,
            (Approved, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize, Deserialize, sqlx::FromRow)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// The ID of the payment
    pub id: i64,
    /// The ID of the member who paid
    pub member_id: i64,
    /// How much was paid
    pub amount: i64,
    /// How many months of membership this pays for
    pub months: i32,
    /// How it was paid
    pub method: PaymentMethod,
    /// Where the payment is in its review
    pub status: PaymentStatus,
    /// The unique reference for this payment
    pub transaction_id: String,
    /// The day the payment was made
    pub paid_on: DateScalar,
    /// Anything staff noted about the payment
    pub notes: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTimeScalar,
}

#[ComplexObject]
impl Payment {
    /// The member who made this payment
    pub async fn member(&self, ctx: &Context<'_>) -> Result<Member> {
        Ok(Member::with_id(self.member_id, store::from_ctx(ctx)).await?)
    }
}

impl Payment {
    pub async fn with_id(id: i64, store: &dyn Store) -> BarbellResult<Self> {
        store
            .payment(id)
            .await?
            .ok_or_else(|| BarbellError::NotFound(format!("No payment with id {}", id)))
    }

    pub async fn for_member(member_id: i64, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        // verify exists
        Member::with_id(member_id, store).await?;

        store.payments_for_member(member_id).await.map_err(Into::into)
    }

    pub async fn all(filter: PaymentFilter, store: &dyn Store) -> BarbellResult<Vec<Self>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(BarbellError::Invalid(
                    "The start of the range must not be after its end".to_owned(),
                ));
            }
        }

        let payments = match filter.member_id {
            Some(member_id) => Self::for_member(member_id, store).await?,
            None => store.payments().await?,
        };

        Ok(payments
            .into_iter()
            .filter(|payment| filter.status.map_or(true, |status| payment.status == status))
            .filter(|payment| filter.method.map_or(true, |method| payment.method == method))
            .filter(|payment| filter.from.map_or(true, |from| payment.paid_on >= from))
            .filter(|payment| filter.to.map_or(true, |to| payment.paid_on <= to))
            .collect())
    }

    pub async fn record(new_payment: NewPayment, today: Date, store: &dyn Store) -> BarbellResult<Self> {
        let member = Member::with_id(new_payment.member_id, store).await?;

        let months = new_payment.months;
        if !(1..=MAX_MONTHS).contains(&months) {
            return Err(BarbellError::Invalid(format!(
                "A payment must cover between 1 and {} months",
                MAX_MONTHS
            )));
        }

        let amount = new_payment
            .amount
            .unwrap_or_else(|| member.package.price_for(months));
        if amount <= 0 {
            return Err(BarbellError::Invalid("The amount must be positive".to_owned()));
        }

        let transaction_id = match new_payment.transaction_id.as_deref().map(str::trim) {
            Some("") | None => generate_transaction_id(),
            Some(transaction_id) => transaction_id.to_owned(),
        };
        if store
            .payment_with_transaction_id(&transaction_id)
            .await?
            .is_some()
        {
            return Err(BarbellError::Conflict(format!(
                "A payment with transaction id {} already exists",
                transaction_id
            )));
        }

        let status = new_payment.status.unwrap_or(PaymentStatus::Pending);
        let record = PaymentRecord {
            member_id: member.id,
            amount,
            months,
            method: new_payment.method,
            status,
            transaction_id,
            paid_on: new_payment.paid_on.unwrap_or(DateScalar(today)),
            notes: new_payment
                .notes
                .map(|notes| notes.trim().to_owned())
                .filter(|notes| !notes.is_empty()),
        };
        let payment = store.insert_payment(record, today).await?;
        info!(
            payment = payment.id,
            member = member.id,
            amount,
            status = ?status,
            "recorded payment"
        );

        Ok(payment)
    }

    /// Moves the payment to a new status. The first time a payment settles,
    /// the member's membership is extended by the months it paid for.
    ///
    /// Fails with a conflict if the payment changed status since it was read.
    pub async fn set_status(
        id: i64,
        status: PaymentStatus,
        today: Date,
        store: &dyn Store,
    ) -> BarbellResult<Self> {
        let payment = Self::with_id(id, store).await?;
        if payment.status == status {
            return Ok(payment);
        }
        if !payment.status.can_become(status) {
            return Err(BarbellError::Conflict(format!(
                "A {:?} payment cannot become {:?}",
                payment.status, status
            )));
        }

        let updated = store
            .transition_payment(id, payment.status, status, today)
            .await?
            .ok_or_else(|| {
                BarbellError::Conflict(format!(
                    "Payment {} was changed by someone else, try again",
                    id
                ))
            })?;
        info!(payment = id, from = ?payment.status, to = ?status, "changed payment status");

        Ok(updated)
    }

    pub async fn delete(id: i64, store: &dyn Store) -> BarbellResult<()> {
        if store.delete_payment(id).await? {
            info!(payment = id, "deleted payment");
            Ok(())
        } else {
            Err(BarbellError::NotFound(format!("No payment with id {}", id)))
        }
    }
}

fn generate_transaction_id() -> String {
    let id = Uuid::new_v4().to_simple().to_string().to_uppercase();
    format!("TXN-{}", &id[..12])
}

/// A payment as it is handed to a store for insertion, before it has an ID.
#[derive(Clone, Debug)]
pub struct PaymentRecord {
    pub member_id: i64,
    pub amount: i64,
    pub months: i32,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub paid_on: DateScalar,
    pub notes: Option<String>,
}

impl PaymentRecord {
    pub fn into_payment(self, id: i64) -> Payment {
        Payment {
            id,
            member_id: self.member_id,
            amount: self.amount,
            months: self.months,
            method: self.method,
            status: self.status,
            transaction_id: self.transaction_id,
            paid_on: self.paid_on,
            notes: self.notes,
            created_at: current_time().into(),
        }
    }
}

#[derive(InputObject)]
pub struct NewPayment {
    pub member_id: i64,
    /// Defaults to the member's package price for the given months
    pub amount: Option<i64>,
    #[graphql(default = 1)]
    pub months: i32,
    pub method: PaymentMethod,
    /// Defaults to pending
    pub status: Option<PaymentStatus>,
    /// Generated when not given
    pub transaction_id: Option<String>,
    /// Defaults to today
    pub paid_on: Option<DateScalar>,
    pub notes: Option<String>,
}

#[derive(InputObject, Default)]
pub struct PaymentFilter {
    pub member_id: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    /// The first day to include
    pub from: Option<DateScalar>,
    /// The last day to include
    pub to: Option<DateScalar>,
}
