use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use time::Date;

use crate::error::{StoreError, StoreResult};
use crate::models::attendance::{Attendance, AttendanceRecord};
use crate::models::member::{Member, MemberRecord, MemberStatus};
use crate::models::payment::{Payment, PaymentRecord, PaymentStatus};
use crate::store::{extend_member, Store};

const SCHEMA: &str = include_str!("../../schema.sql");

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and creates any missing types and tables.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        pool.execute(SCHEMA).await?;

        Ok(Self { pool })
    }
}

/// Turns constraint violations into conflicts carrying `message`.
fn constraint(error: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    let violated = match &error {
        sqlx::Error::Database(db_error) => matches!(
            db_error.code().as_deref(),
            Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION)
        ),
        _ => false,
    };

    if violated {
        StoreError::Conflict(message())
    } else {
        StoreError::Database(error)
    }
}

/// Extends the member a settling payment belongs to, holding their row
/// locked until the transaction ends.
async fn settle(
    tx: &mut Transaction<'_, Postgres>,
    member_id: i64,
    months: i32,
    today: Date,
) -> StoreResult<()> {
    let mut member: Member = sqlx::query_as("SELECT * FROM members WHERE id = $1 FOR UPDATE")
        .bind(member_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Conflict(format!("No member with id {}", member_id)))?;
    extend_member(&mut member, months, today)?;

    sqlx::query("UPDATE members SET expiry_date = $1, status = $2 WHERE id = $3")
        .bind(member.expiry_date)
        .bind(member.status)
        .bind(member.id)
        .execute(&mut *tx)
        .await?;

    Ok(())
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn members(&self) -> StoreResult<Vec<Member>> {
        sqlx::query_as("SELECT * FROM members ORDER BY lower(last_name), lower(first_name), id")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn member(&self, id: i64) -> StoreResult<Option<Member>> {
        sqlx::query_as("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn member_with_email(&self, email: &str) -> StoreResult<Option<Member>> {
        sqlx::query_as("SELECT * FROM members WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn insert_member(&self, record: MemberRecord) -> StoreResult<Member> {
        let email = record.email.clone();

        sqlx::query_as(
            "INSERT INTO members
             (first_name, last_name, email, phone, address, date_of_birth, gender,
              emergency_contact, package, months, price, discount, final_price,
              joining_date, expiry_date, status, photo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING *",
        )
        .bind(record.first_name)
        .bind(record.last_name)
        .bind(record.email)
        .bind(record.phone)
        .bind(record.address)
        .bind(record.date_of_birth)
        .bind(record.gender)
        .bind(record.emergency_contact)
        .bind(record.package)
        .bind(record.months)
        .bind(record.price)
        .bind(record.discount)
        .bind(record.final_price)
        .bind(record.joining_date)
        .bind(record.expiry_date)
        .bind(record.status)
        .bind(record.photo)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| constraint(err, || format!("Another member already has the email {}", email)))
    }

    async fn update_member(&self, member: &Member) -> StoreResult<()> {
        sqlx::query(
            "UPDATE members SET
             first_name = $1, last_name = $2, email = $3, phone = $4, address = $5,
             date_of_birth = $6, gender = $7, emergency_contact = $8, package = $9,
             months = $10, price = $11, discount = $12, final_price = $13,
             joining_date = $14
             WHERE id = $15",
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.date_of_birth)
        .bind(&member.gender)
        .bind(&member.emergency_contact)
        .bind(member.package)
        .bind(member.months)
        .bind(member.price)
        .bind(member.discount)
        .bind(member.final_price)
        .bind(member.joining_date)
        .bind(member.id)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            constraint(err, || {
                format!("Another member already has the email {}", member.email)
            })
        })?;

        Ok(())
    }

    async fn set_member_status(&self, id: i64, status: MemberStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE members SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_member_expiry(&self, id: i64, expiry_date: Date) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE members SET expiry_date = $1 WHERE id = $2")
            .bind(expiry_date)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_member_photo(&self, id: i64, photo: Option<String>) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE members SET photo = $1 WHERE id = $2")
            .bind(photo)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_lapsed(&self, today: Date) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE members SET status = 'expired' WHERE status = 'active' AND expiry_date < $1",
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_member(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn payments(&self) -> StoreResult<Vec<Payment>> {
        sqlx::query_as("SELECT * FROM payments ORDER BY paid_on DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn payment(&self, id: i64) -> StoreResult<Option<Payment>> {
        sqlx::query_as("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn payment_with_transaction_id(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn payments_for_member(&self, member_id: i64) -> StoreResult<Vec<Payment>> {
        sqlx::query_as(
            "SELECT * FROM payments WHERE member_id = $1 ORDER BY paid_on DESC, id DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn insert_payment(&self, record: PaymentRecord, today: Date) -> StoreResult<Payment> {
        let transaction_id = record.transaction_id.clone();
        let member_id = record.member_id;
        let (months, settled) = (record.months, record.status.is_settled());

        let mut tx = self.pool.begin().await?;
        let payment: Payment = sqlx::query_as(
            "INSERT INTO payments
             (member_id, amount, months, method, status, transaction_id, paid_on, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(record.member_id)
        .bind(record.amount)
        .bind(record.months)
        .bind(record.method)
        .bind(record.status)
        .bind(record.transaction_id)
        .bind(record.paid_on)
        .bind(record.notes)
        .fetch_one(&mut tx)
        .await
        .map_err(|err| {
            constraint(err, || {
                format!(
                    "Payment {} for member {} conflicts with an existing record",
                    transaction_id, member_id
                )
            })
        })?;

        if settled {
            settle(&mut tx, member_id, months, today).await?;
        }
        tx.commit().await?;

        Ok(payment)
    }

    async fn transition_payment(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        today: Date,
    ) -> StoreResult<Option<Payment>> {
        let mut tx = self.pool.begin().await?;
        let payment: Option<Payment> =
            sqlx::query_as("UPDATE payments SET status = $1 WHERE id = $2 AND status = $3 RETURNING *")
                .bind(to)
                .bind(id)
                .bind(from)
                .fetch_optional(&mut tx)
                .await?;

        let payment = match payment {
            Some(payment) => payment,
            None => return Ok(None),
        };
        if !from.is_settled() && to.is_settled() {
            settle(&mut tx, payment.member_id, payment.months, today).await?;
        }
        tx.commit().await?;

        Ok(Some(payment))
    }

    async fn delete_payment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn attendance(&self) -> StoreResult<Vec<Attendance>> {
        sqlx::query_as("SELECT * FROM attendance ORDER BY date DESC, check_in DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn attendance_with_id(&self, id: i64) -> StoreResult<Option<Attendance>> {
        sqlx::query_as("SELECT * FROM attendance WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn attendance_for_member(&self, member_id: i64) -> StoreResult<Vec<Attendance>> {
        sqlx::query_as(
            "SELECT * FROM attendance WHERE member_id = $1
             ORDER BY date DESC, check_in DESC, id DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn attendance_for_member_on(&self, member_id: i64, date: Date) -> StoreResult<Option<Attendance>> {
        sqlx::query_as("SELECT * FROM attendance WHERE member_id = $1 AND date = $2")
            .bind(member_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn attendance_on(&self, date: Date) -> StoreResult<Vec<Attendance>> {
        sqlx::query_as("SELECT * FROM attendance WHERE date = $1 ORDER BY check_in DESC, id DESC")
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn insert_attendance(&self, record: AttendanceRecord) -> StoreResult<Attendance> {
        let member_id = record.member_id;
        let date = record.date;

        sqlx::query_as(
            "INSERT INTO attendance (member_id, date, check_in, status)
             VALUES ($1, $2, $3, 'active')
             RETURNING *",
        )
        .bind(record.member_id)
        .bind(record.date)
        .bind(record.check_in)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            constraint(err, || {
                format!("Member {} already checked in on {}", member_id, date.0)
            })
        })
    }

    async fn update_attendance(&self, attendance: &Attendance) -> StoreResult<()> {
        sqlx::query(
            "UPDATE attendance SET date = $1, check_in = $2, check_out = $3, status = $4
             WHERE id = $5",
        )
        .bind(attendance.date)
        .bind(attendance.check_in)
        .bind(attendance.check_out)
        .bind(attendance.status)
        .bind(attendance.id)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            constraint(err, || {
                format!(
                    "Member {} already checked in on {}",
                    attendance.member_id, attendance.date.0
                )
            })
        })?;

        Ok(())
    }

    async fn delete_attendance(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
